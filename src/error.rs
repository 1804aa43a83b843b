// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KernelError {
    #[error("Invalid contract hash: {0:?}")]
    InvalidContractHash(String),

    #[error("Malformed record JSON: {0}")]
    MalformedRecord(String),

    /// Neither `activity_id` nor `admin_did` is present and no discriminator was declared.
    #[error("Unrecognized record shape: {0}")]
    UnrecognizedRecord(String),

    #[error("Record carries both activity_id and admin_did")]
    AmbiguousRecord,

    #[error("Unknown record discriminator: {0}")]
    UnknownDiscriminator(String),

    #[error("Invalid {category} record: {reason}")]
    InvalidRecord { category: &'static str, reason: String },

    #[error("Invalid contract payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;

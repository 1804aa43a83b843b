// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Store file {path} is not a JSON array: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Content identifier the ledger assigns to a generated contract.
///
/// Also used as a directory name under a node's contract storage, so path
/// separators and dot segments are rejected at construction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractHash(String);

impl ContractHash {
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
        {
            return Err(KernelError::InvalidContractHash(value));
        }
        Ok(ContractHash(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContractHash {
    type Error = KernelError;

    fn try_from(value: String) -> Result<Self> {
        ContractHash::parse(value)
    }
}

impl From<ContractHash> for String {
    fn from(hash: ContractHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContractHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger identity of a node operator (deployer, executor, admin).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Did(pub String);

impl Did {
    pub fn new(value: impl Into<String>) -> Self {
        Did(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pending-transaction handle returned by deploy/execute.
///
/// Not `Clone`: confirming a signature consumes the id, so a single request id
/// cannot be redeemed twice through the typed API.
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureRequestId(String);

impl SignatureRequestId {
    pub fn new(value: impl Into<String>) -> Self {
        SignatureRequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SignatureRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

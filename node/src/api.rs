// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};

use crate::config::PortValue;
use crate::errors::DappError;

/// JSON body extractor whose rejections render as `{"error": ...}` with 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DappError))]
pub struct ApiJson<T>(pub T);

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeployContractRequest {
    #[serde(alias = "module_path")]
    pub wasm_path: String,
    #[serde(alias = "source_path")]
    pub lib_path: String,
    #[serde(alias = "schema_path")]
    pub state_path: String,
    pub deployer_did: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteContractRequest {
    pub contract_hash: String,
    pub executor_did: String,
    pub contract_input: String,
}

#[derive(Debug, Deserialize)]
pub struct AddActivityRequest {
    pub activity_id: String,
    pub reward_points: u64,
    pub admin_did: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRewardRequest {
    pub activity_id: String,
    pub user_did: String,
    pub admin_did: String,
}

#[derive(Debug, Deserialize)]
pub struct AddAdminRequest {
    pub new_admin_did: String,
    pub existing_admin_did: String,
}

/// What the ledger posts to a registered callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackNotification {
    pub port: PortValue,
    pub smart_contract_hash: String,
}

impl CallbackNotification {
    pub fn port(&self) -> Result<u16, DappError> {
        self.port.parse().map_err(DappError::InvalidInput)
    }
}

/// Reject blank identifiers before any ledger call is made.
pub fn require(field: &str, value: &str) -> Result<(), DappError> {
    if value.trim().is_empty() {
        Err(DappError::InvalidInput(format!("`{field}` must not be empty")))
    } else {
        Ok(())
    }
}

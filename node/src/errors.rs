// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dapp_kernel::error::KernelError;
use dapp_kernel::types::ContractHash;
use dapp_persistence::PersistenceError;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::DeployStage;
use crate::sandbox::SandboxError;

#[derive(Error, Debug)]
pub enum DappError {
    /// Unknown identity/port or a missing contract setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Ledger call {endpoint} failed: {message}")]
    RemoteCall {
        endpoint: &'static str,
        message: String,
    },

    #[error("No .wasm artifact for contract {contract_hash} in {dir:?}")]
    ArtifactNotFound {
        contract_hash: String,
        dir: PathBuf,
    },

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Store error: {0}")]
    Store(#[from] PersistenceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Deployment stopped part-way. Nothing is rolled back, so a contract
    /// generated before the failure stays orphaned on the ledger.
    #[error("Deployment failed after {stage}{}: {source}", orphan_note(.contract_hash))]
    Deployment {
        stage: DeployStage,
        contract_hash: Option<ContractHash>,
        #[source]
        source: Box<DappError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn orphan_note(hash: &Option<ContractHash>) -> String {
    match hash {
        Some(hash) => format!(" (contract {hash} left without callback)"),
        None => String::new(),
    }
}

impl DappError {
    pub fn remote(endpoint: &'static str, message: impl Into<String>) -> Self {
        DappError::RemoteCall {
            endpoint,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DappError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DappError::Configuration(_) => StatusCode::NOT_FOUND,
            DappError::ArtifactNotFound { .. } => StatusCode::NOT_FOUND,
            DappError::RemoteCall { .. } => StatusCode::BAD_GATEWAY,
            DappError::Sandbox(SandboxError::Guest { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            DappError::Sandbox(SandboxError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            DappError::Sandbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DappError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DappError::Deployment { source, .. } => source.status_code(),
            DappError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short outcome label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DappError::Configuration(_) => "configuration",
            DappError::RemoteCall { .. } => "remote_call",
            DappError::ArtifactNotFound { .. } => "artifact_not_found",
            DappError::Sandbox(_) => "sandbox",
            DappError::Store(_) => "store",
            DappError::InvalidInput(_) => "invalid_input",
            DappError::Deployment { source, .. } => source.kind(),
            DappError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for DappError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<KernelError> for DappError {
    fn from(e: KernelError) -> Self {
        DappError::InvalidInput(e.to_string())
    }
}

impl From<JsonRejection> for DappError {
    fn from(rejection: JsonRejection) -> Self {
        DappError::InvalidInput(rejection.body_text())
    }
}

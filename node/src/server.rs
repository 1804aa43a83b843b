// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use dapp_kernel::directory::NodeDirectory;
use dapp_kernel::payload::{add_admin_call, transfer_reward_call, ActivitySubmission};
use dapp_kernel::types::{ChainBlock, ContractHash, Did};
use dapp_persistence::RecordStore;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::callback::{CallbackIngestion, CallbackOutcome, PayloadMode};
use crate::config::Settings;
use crate::errors::DappError;
use crate::network::wire::Envelope;
use crate::network::LedgerClient;
use crate::orchestrator::{
    resolve_identity, DeploymentOrchestrator, DeploymentReceipt, ExecutionOrchestrator,
    ExecutionReceipt, ExecutionRequest, DeploymentRequest,
};
use crate::sandbox::{SandboxError, SandboxInvoker};

/// Contract output meaning the transfer went through without further detail.
pub const FT_SUCCESS_OUTPUT: &str = "success";
pub const FT_SUCCESS_MESSAGE: &str = "FT Transferred Succesfully";

pub struct AppState {
    pub settings: Arc<Settings>,
    pub directory: NodeDirectory,
    pub ledger: LedgerClient,
    pub sandbox: SandboxInvoker,
    pub store: RecordStore,
    pub callback_url: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, DappError> {
        let directory = settings
            .directory()
            .map_err(|e| DappError::Configuration(e.to_string()))?;
        let ledger = LedgerClient::new(&settings.ledger, settings.env.signature_password.clone())?;
        let store = RecordStore::new(settings.store_paths());
        let sandbox = SandboxInvoker::new(&settings.sandbox, store.clone())?;
        let callback_url = settings.callback_url();

        tracing::info!(
            nodes = directory.len(),
            callback_url = %callback_url,
            "Relay state initialized"
        );

        Ok(Self {
            settings: Arc::new(settings),
            directory,
            ledger,
            sandbox,
            store,
            callback_url,
        })
    }

    fn deployments(&self) -> DeploymentOrchestrator<'_> {
        DeploymentOrchestrator {
            ledger: &self.ledger,
            directory: &self.directory,
            callback_url: &self.callback_url,
        }
    }

    fn executions(&self) -> ExecutionOrchestrator<'_> {
        ExecutionOrchestrator {
            ledger: &self.ledger,
            directory: &self.directory,
        }
    }

    fn callbacks(&self) -> CallbackIngestion<'_> {
        CallbackIngestion {
            ledger: &self.ledger,
            directory: &self.directory,
            sandbox: &self.sandbox,
        }
    }

    fn contract(&self, hash: &Option<ContractHash>, var: &str) -> Result<ContractHash, DappError> {
        hash.clone()
            .ok_or_else(|| DappError::Configuration(format!("{var} is not set")))
    }
}

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/deploy-contract", post(deploy_contract))
        .route("/api/execute-contract", post(execute_contract))
        .route("/api/activity/add", post(add_activity))
        .route("/api/rewards/transfer", post(transfer_reward))
        .route("/api/admin/add", post(add_admin))
        .route("/api/callback/trigger", post(activity_callback))
        .route("/api/callback/add-admin", post(add_admin_callback))
        .route("/api/call-back-trigger", post(dapp_callback))
        // Observability
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn deploy_contract(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<DeployContractRequest>,
) -> Result<Json<ApiResponse<DeploymentReceipt>>, DappError> {
    require("deployer_did", &req.deployer_did)?;
    require("wasm_path", &req.wasm_path)?;

    let receipt = state
        .deployments()
        .deploy(DeploymentRequest {
            module_path: PathBuf::from(req.wasm_path),
            source_path: PathBuf::from(req.lib_path),
            schema_path: PathBuf::from(req.state_path),
            deployer: Did::new(req.deployer_did.trim()),
        })
        .await?;

    Ok(Json(ApiResponse::new("Contract Deployed Successfully", receipt)))
}

async fn execute_contract(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<ExecuteContractRequest>,
) -> Result<Json<ApiResponse<ExecutionReceipt>>, DappError> {
    require("executor_did", &req.executor_did)?;
    let receipt = state
        .executions()
        .execute(ExecutionRequest {
            contract_hash: ContractHash::parse(req.contract_hash)?,
            executor: Did::new(req.executor_did.trim()),
            payload: req.contract_input,
        })
        .await?;

    Ok(Json(ApiResponse::new("DApp executed successfully", receipt)))
}

async fn add_activity(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<AddActivityRequest>,
) -> Result<Json<ApiResponse<Value>>, DappError> {
    require("activity_id", &req.activity_id)?;
    require("admin_did", &req.admin_did)?;
    let contract = state.contract(&state.settings.env.add_activity_contract, "ADD_ACTIVITY_CONTRACT")?;
    let admin = Did::new(req.admin_did.trim());

    let payload = ActivitySubmission {
        activity_id: req.activity_id,
        reward_points: req.reward_points,
    }
    .to_json()?;

    let receipt = state
        .executions()
        .execute(ExecutionRequest {
            contract_hash: contract,
            executor: admin.clone(),
            payload,
        })
        .await?;
    let blocks = committed_blocks(&state, &admin, &receipt).await;

    Ok(Json(ApiResponse::new(
        "Activity added to smart contract tokenchain",
        json!({ "receipt": receipt, "blocks": blocks }),
    )))
}

async fn transfer_reward(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<TransferRewardRequest>,
) -> Result<Json<ApiResponse<ExecutionReceipt>>, DappError> {
    require("activity_id", &req.activity_id)?;
    require("user_did", &req.user_did)?;
    require("admin_did", &req.admin_did)?;
    let contract = state.contract(&state.settings.env.transfer_contract, "TRANSFER_CONTRACT")?;

    let store = state.store.clone();
    let activity_id = req.activity_id.clone();
    let points = tokio::task::spawn_blocking(move || store.reward_points_for(&activity_id))
        .await
        .map_err(|e| DappError::Internal(format!("store task failed: {e}")))??
        .ok_or_else(|| DappError::InvalidInput(format!("unknown activity {}", req.activity_id)))?;

    let transfer = &state.settings.transfer;
    let call = transfer_reward_call(
        &transfer.whitelist_name,
        &transfer.token_name,
        points,
        req.admin_did.trim(),
        req.user_did.trim(),
    )?;

    let receipt = state
        .executions()
        .execute(ExecutionRequest {
            contract_hash: contract,
            executor: Did::new(req.admin_did.trim()),
            payload: call.to_json(),
        })
        .await?;

    Ok(Json(ApiResponse::new("Reward Transferred successfully", receipt)))
}

async fn add_admin(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<AddAdminRequest>,
) -> Result<Json<ApiResponse<Value>>, DappError> {
    require("new_admin_did", &req.new_admin_did)?;
    require("existing_admin_did", &req.existing_admin_did)?;
    let contract = state.contract(&state.settings.env.add_admin_contract, "ADD_ADMIN_CONTRACT")?;
    let existing = Did::new(req.existing_admin_did.trim());

    let call = add_admin_call(req.new_admin_did.trim())?;
    let receipt = state
        .executions()
        .execute(ExecutionRequest {
            contract_hash: contract,
            executor: existing.clone(),
            payload: call.to_json(),
        })
        .await?;
    let blocks = committed_blocks(&state, &existing, &receipt).await;

    Ok(Json(ApiResponse::new(
        "Admin added to smart contract tokenchain",
        json!({ "receipt": receipt, "blocks": blocks }),
    )))
}

/// Latest blocks after a confirmed execution. The transaction is already
/// committed at this point, so a failed read is logged and reported as `null`.
async fn committed_blocks(
    state: &AppState,
    identity: &Did,
    receipt: &ExecutionReceipt,
) -> Option<Vec<ChainBlock>> {
    match latest_blocks(state, identity, &receipt.contract_hash).await {
        Ok(blocks) => Some(blocks),
        Err(e) => {
            tracing::warn!(
                contract = %receipt.contract_hash,
                request = %receipt.signature_request,
                "Execution committed but latest chain data unavailable: {}",
                e
            );
            None
        }
    }
}

/// Latest chain entry of `contract` as seen by `identity`'s node.
async fn latest_blocks(
    state: &AppState,
    identity: &Did,
    contract: &ContractHash,
) -> Result<Vec<ChainBlock>, DappError> {
    let node = resolve_identity(&state.directory, identity)?;
    state
        .ledger
        .fetch_chain_data(&node.base_url(), contract, true)
        .await
}

async fn activity_callback(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CallbackNotification>,
) -> Result<Json<ApiResponse<CallbackOutcome>>, DappError> {
    let port = req.port()?;
    let hash = ContractHash::parse(req.smart_contract_hash)?;
    let outcome = state
        .callbacks()
        .ingest(port, hash, PayloadMode::ActivityReshape)
        .await?;
    Ok(Json(ApiResponse::new("Callback processed", outcome)))
}

/// The notification is acknowledged whether or not the invocation succeeds.
async fn add_admin_callback(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CallbackNotification>,
) -> Result<Json<ApiResponse<Value>>, DappError> {
    let port = req.port()?;
    let hash = ContractHash::parse(req.smart_contract_hash)?;
    if let Err(e) = state.callbacks().ingest(port, hash, PayloadMode::Direct).await {
        tracing::warn!("Add-admin callback discarded: {}", e);
    }
    Ok(Json(ApiResponse::new("Callback acknowledged", Value::Null)))
}

async fn dapp_callback(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CallbackNotification>,
) -> Result<Json<ApiResponse<Value>>, DappError> {
    let port = req.port()?;
    let hash = ContractHash::parse(req.smart_contract_hash)?;
    let outcome = state.callbacks().ingest(port, hash, PayloadMode::Direct).await?;

    let data = match outcome.output() {
        Some(output) => serde_json::to_value(contract_envelope(output)?)
            .map_err(|e| DappError::Internal(e.to_string()))?,
        None => serde_json::to_value(&outcome).map_err(|e| DappError::Internal(e.to_string()))?,
    };
    Ok(Json(ApiResponse::new("DApp executed successfully", data)))
}

/// Interpret a contract's output as a ledger-style envelope.
pub fn contract_envelope(output: &str) -> Result<Envelope<Value>, DappError> {
    if output == FT_SUCCESS_OUTPUT {
        return Ok(Envelope {
            status: true,
            message: FT_SUCCESS_MESSAGE.to_string(),
            result: None,
        });
    }
    serde_json::from_str(output).map_err(|e| {
        DappError::Sandbox(SandboxError::InvalidOutput(format!(
            "contract output is neither \"{FT_SUCCESS_OUTPUT}\" nor an envelope: {e}"
        )))
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_output_becomes_envelope() {
        let env = contract_envelope("success").unwrap();
        assert!(env.status);
        assert_eq!(env.message, FT_SUCCESS_MESSAGE);
    }

    #[test]
    fn test_envelope_output_is_passed_through() {
        let env = contract_envelope(r#"{"status":false,"message":"insufficient tokens"}"#).unwrap();
        assert!(!env.status);
        assert_eq!(env.message, "insufficient tokens");
    }

    #[test]
    fn test_garbage_output_is_sandbox_error() {
        assert!(matches!(
            contract_envelope("ok!"),
            Err(DappError::Sandbox(SandboxError::InvalidOutput(_)))
        ));
    }
}

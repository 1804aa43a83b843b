// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deployment and execution pipelines.
//!
//! Both are strictly sequential chains of ledger calls that stop at the first
//! failure. Nothing is compensated: a deployment that fails after the
//! contract was generated reports the hash so an operator can clean up.

use core::fmt;
use dapp_kernel::directory::{NodeDirectory, NodeEntry};
use dapp_kernel::types::{ContractHash, Did};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::errors::DappError;
use crate::network::LedgerClient;
use crate::telemetry::{DEPLOYMENTS, EXECUTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    Init,
    ArtifactGenerated,
    TransactionSubmitted,
    SignatureConfirmed,
    CallbackRegistered,
    Done,
}

impl DeployStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStage::Init => "init",
            DeployStage::ArtifactGenerated => "artifact_generated",
            DeployStage::TransactionSubmitted => "transaction_submitted",
            DeployStage::SignatureConfirmed => "signature_confirmed",
            DeployStage::CallbackRegistered => "callback_registered",
            DeployStage::Done => "done",
        }
    }
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteStage {
    Init,
    TransactionSubmitted,
    SignatureConfirmed,
    Done,
}

impl ExecuteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecuteStage::Init => "init",
            ExecuteStage::TransactionSubmitted => "transaction_submitted",
            ExecuteStage::SignatureConfirmed => "signature_confirmed",
            ExecuteStage::Done => "done",
        }
    }
}

impl fmt::Display for ExecuteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub module_path: PathBuf,
    pub source_path: PathBuf,
    pub schema_path: PathBuf,
    pub deployer: Did,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeploymentReceipt {
    pub contract_hash: ContractHash,
    pub node: String,
    pub callback_url: String,
    pub stage: DeployStage,
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub contract_hash: ContractHash,
    pub executor: Did,
    /// Opaque `smartContractData` handed to the ledger.
    pub payload: String,
}

/// Outcome of a confirmed transaction. Module output arrives later through
/// the callback path.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutionReceipt {
    pub contract_hash: ContractHash,
    pub node: String,
    pub signature_request: String,
    pub stage: ExecuteStage,
}

pub fn resolve_identity<'a>(directory: &'a NodeDirectory, identity: &Did) -> Result<&'a NodeEntry, DappError> {
    directory
        .by_identity(identity)
        .ok_or_else(|| DappError::Configuration(format!("no node configured for identity {identity}")))
}

pub struct DeploymentOrchestrator<'a> {
    pub ledger: &'a LedgerClient,
    pub directory: &'a NodeDirectory,
    pub callback_url: &'a str,
}

impl DeploymentOrchestrator<'_> {
    pub async fn deploy(&self, req: DeploymentRequest) -> Result<DeploymentReceipt, DappError> {
        let result = self.run(req).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::increment_counter!(DEPLOYMENTS, "outcome" => outcome);
        result
    }

    async fn run(&self, req: DeploymentRequest) -> Result<DeploymentReceipt, DappError> {
        let node = resolve_identity(self.directory, &req.deployer)?;
        let url = node.base_url();
        info!(stage = %DeployStage::Init, node = %node.name, deployer = %req.deployer, "Deploying contract");

        let hash = self
            .ledger
            .generate_contract(&url, &req.deployer, &req.module_path, &req.source_path, &req.schema_path)
            .await
            .map_err(|e| failed(DeployStage::Init, None, e))?;
        info!(stage = %DeployStage::ArtifactGenerated, contract = %hash);

        let request_id = self
            .ledger
            .deploy_contract(&url, &hash, &req.deployer)
            .await
            .map_err(|e| failed(DeployStage::ArtifactGenerated, Some(&hash), e))?;
        info!(stage = %DeployStage::TransactionSubmitted, contract = %hash, request = %request_id);

        self.ledger
            .confirm_signature(&url, request_id)
            .await
            .map_err(|e| failed(DeployStage::TransactionSubmitted, Some(&hash), e))?;
        info!(stage = %DeployStage::SignatureConfirmed, contract = %hash);

        self.ledger
            .register_callback(&url, &hash, self.callback_url)
            .await
            .map_err(|e| failed(DeployStage::SignatureConfirmed, Some(&hash), e))?;
        info!(stage = %DeployStage::CallbackRegistered, contract = %hash);

        info!(stage = %DeployStage::Done, contract = %hash, node = %node.name, "Contract deployed");
        Ok(DeploymentReceipt {
            contract_hash: hash,
            node: node.name.clone(),
            callback_url: self.callback_url.to_string(),
            stage: DeployStage::Done,
        })
    }
}

fn failed(stage: DeployStage, hash: Option<&ContractHash>, source: DappError) -> DappError {
    warn!(stage = %stage, contract = ?hash.map(ContractHash::as_str), "Deployment stopped: {}", source);
    DappError::Deployment {
        stage,
        contract_hash: hash.cloned(),
        source: Box::new(source),
    }
}

pub struct ExecutionOrchestrator<'a> {
    pub ledger: &'a LedgerClient,
    pub directory: &'a NodeDirectory,
}

impl ExecutionOrchestrator<'_> {
    pub async fn execute(&self, req: ExecutionRequest) -> Result<ExecutionReceipt, DappError> {
        let result = self.run(req).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::increment_counter!(EXECUTIONS, "outcome" => outcome);
        result
    }

    async fn run(&self, req: ExecutionRequest) -> Result<ExecutionReceipt, DappError> {
        let node = resolve_identity(self.directory, &req.executor)?;
        let url = node.base_url();
        info!(stage = %ExecuteStage::Init, node = %node.name, contract = %req.contract_hash, "Executing contract");

        let request_id = self
            .ledger
            .execute_contract(&url, &req.contract_hash, &req.executor, &req.payload)
            .await?;
        let signature_request = request_id.as_str().to_string();
        info!(stage = %ExecuteStage::TransactionSubmitted, request = %signature_request);

        self.ledger.confirm_signature(&url, request_id).await?;
        info!(stage = %ExecuteStage::SignatureConfirmed, request = %signature_request);
        info!(stage = %ExecuteStage::Done, contract = %req.contract_hash, "Contract executed");

        Ok(ExecutionReceipt {
            contract_hash: req.contract_hash,
            node: node.name.clone(),
            signature_request,
            stage: ExecuteStage::Done,
        })
    }
}

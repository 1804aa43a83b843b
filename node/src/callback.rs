// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Callback ingestion: ledger notification to contract invocation.
//!
//! notification → node by port → chain history → last block → payload →
//! module under the node's storage root → sandbox.

use dapp_kernel::directory::NodeDirectory;
use dapp_kernel::payload::{add_activity_call, ContractCall};
use dapp_kernel::record::Category;
use dapp_kernel::selection::{select_relevant_block, BlockSelection};
use dapp_kernel::types::{ChainBlock, ContractHash};
use serde::Serialize;
use tracing::info;

use crate::errors::DappError;
use crate::locator::locate_module;
use crate::network::LedgerClient;
use crate::sandbox::SandboxInvoker;
use crate::telemetry::CALLBACKS;

/// How the selected block's payload becomes the module input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// The block carries `{activity_id, reward_points}`; it is reshaped into an
    /// `add_activity` call that also records the block id.
    ActivityReshape,
    /// The block already carries a `{"<entry>": args}` call.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyHistory,
    Genesis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackOutcome {
    Invoked {
        contract_hash: ContractHash,
        node: String,
        block_id: String,
        sequence_number: u64,
        output: String,
        records: Vec<Category>,
    },
    Skipped {
        contract_hash: ContractHash,
        node: String,
        reason: SkipReason,
    },
}

impl CallbackOutcome {
    pub fn output(&self) -> Option<&str> {
        match self {
            CallbackOutcome::Invoked { output, .. } => Some(output),
            CallbackOutcome::Skipped { .. } => None,
        }
    }
}

/// Build the module input for a selected block.
pub fn contract_input(block: &ChainBlock, mode: PayloadMode) -> Result<String, DappError> {
    let call = match mode {
        PayloadMode::ActivityReshape => add_activity_call(block)?,
        PayloadMode::Direct => ContractCall::parse(&block.payload)?,
    };
    Ok(call.to_json())
}

pub struct CallbackIngestion<'a> {
    pub ledger: &'a LedgerClient,
    pub directory: &'a NodeDirectory,
    pub sandbox: &'a SandboxInvoker,
}

impl CallbackIngestion<'_> {
    pub async fn ingest(
        &self,
        port: u16,
        contract_hash: ContractHash,
        mode: PayloadMode,
    ) -> Result<CallbackOutcome, DappError> {
        let result = self.run(port, contract_hash, mode).await;
        let outcome = match &result {
            Ok(CallbackOutcome::Invoked { .. }) => "invoked",
            Ok(CallbackOutcome::Skipped { .. }) => "skipped",
            Err(e) => e.kind(),
        };
        metrics::increment_counter!(CALLBACKS, "outcome" => outcome);
        result
    }

    async fn run(
        &self,
        port: u16,
        contract_hash: ContractHash,
        mode: PayloadMode,
    ) -> Result<CallbackOutcome, DappError> {
        let node = self
            .directory
            .by_port(port)
            .ok_or_else(|| DappError::Configuration(format!("no node configured on port {port}")))?;
        info!(node = %node.name, contract = %contract_hash, "Callback received");

        let blocks = self
            .ledger
            .fetch_chain_data(&node.base_url(), &contract_hash, false)
            .await?;

        let block = match select_relevant_block(&blocks) {
            BlockSelection::Empty => return Ok(skipped(contract_hash, &node.name, SkipReason::EmptyHistory)),
            BlockSelection::Genesis(_) => return Ok(skipped(contract_hash, &node.name, SkipReason::Genesis)),
            BlockSelection::Relevant(block) => block,
        };

        let input = contract_input(block, mode)?;
        let module = locate_module(&node.storage_root, &contract_hash)?;
        let invocation = self.sandbox.invoke_blocking(module, input).await?;

        info!(
            contract = %contract_hash,
            block = %block.block_id,
            records = invocation.records.len(),
            "Callback processed"
        );
        Ok(CallbackOutcome::Invoked {
            contract_hash,
            node: node.name.clone(),
            block_id: block.block_id.clone(),
            sequence_number: block.sequence_number,
            output: invocation.output,
            records: invocation.records,
        })
    }
}

fn skipped(contract_hash: ContractHash, node: &str, reason: SkipReason) -> CallbackOutcome {
    info!(contract = %contract_hash, ?reason, "Nothing to invoke");
    CallbackOutcome::Skipped {
        contract_hash,
        node: node.to_string(),
        reason,
    }
}

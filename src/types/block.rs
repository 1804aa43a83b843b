// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain blocks as the ledger reports them.

use serde::{Deserialize, Serialize};

/// One entry of a contract's token chain.
///
/// Field names follow the ledger's wire format. `payload` is itself a JSON
/// document (the `smartContractData` submitted by the executor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainBlock {
    #[serde(rename = "BlockNo")]
    pub sequence_number: u64,
    #[serde(rename = "BlockId")]
    pub block_id: String,
    #[serde(rename = "SmartContractData", default)]
    pub payload: String,
    #[serde(rename = "Epoch", default)]
    pub epoch: u64,
    #[serde(flatten)]
    pub signatures: BlockSignatures,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockSignatures {
    #[serde(rename = "InitiatorSignature", default)]
    pub initiator_signature: String,
    #[serde(rename = "ExecutorDID", default)]
    pub executor_did: String,
    #[serde(rename = "InitiatorSignData", default)]
    pub initiator_sign_data: String,
}

impl ChainBlock {
    pub const GENESIS_SEQUENCE: u64 = 0;

    /// Genesis carries the deployment itself, never an invocation payload.
    pub fn is_genesis(&self) -> bool {
        self.sequence_number == Self::GENESIS_SEQUENCE
    }
}

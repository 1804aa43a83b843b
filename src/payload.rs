// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Contract-call payloads.
//!
//! A contract is driven by a JSON object with exactly one key: the name of the
//! exported entry point, mapped to that entry point's arguments, e.g.
//! `{"add_admin": {"admin_did": "bafy..."}}`. Payloads are always built
//! through serde here, never by string formatting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KernelError, Result};
use crate::record::{ActivityRecord, AdminGrant};
use crate::types::block::ChainBlock;

pub const ADD_ACTIVITY_ENTRY: &str = "add_activity";
pub const ADD_ADMIN_ENTRY: &str = "add_admin";
pub const TRANSFER_FT_ENTRY: &str = "transfer_sample_ft";

#[derive(Clone, Debug, PartialEq)]
pub struct ContractCall {
    entry: String,
    args: Value,
}

impl ContractCall {
    pub fn new<A: Serialize>(entry: impl Into<String>, args: &A) -> Result<Self> {
        let entry = entry.into();
        if entry.is_empty() {
            return Err(KernelError::InvalidPayload("empty entry point name".to_string()));
        }
        let args = serde_json::to_value(args)
            .map_err(|e| KernelError::InvalidPayload(e.to_string()))?;
        Ok(Self { entry, args })
    }

    /// Parse a `{"<entry>": <args>}` document.
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| KernelError::InvalidPayload(e.to_string()))?;

        let Value::Object(map) = value else {
            return Err(KernelError::InvalidPayload(
                "contract input must be a JSON object".to_string(),
            ));
        };

        if map.len() != 1 {
            return Err(KernelError::InvalidPayload(format!(
                "contract input must have exactly one entry point, found {}",
                map.len()
            )));
        }

        let Some((entry, args)) = map.into_iter().next() else {
            return Err(KernelError::InvalidPayload("empty contract input".to_string()));
        };
        if entry.is_empty() {
            return Err(KernelError::InvalidPayload("empty entry point name".to_string()));
        }

        Ok(Self { entry, args })
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    pub fn args_json(&self) -> String {
        self.args.to_string()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.entry.clone(), self.args.clone());
        Value::Object(map)
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

/// What the add-activity contract records on chain when an admin submits an activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySubmission {
    pub activity_id: String,
    pub reward_points: u64,
}

impl ActivitySubmission {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| KernelError::InvalidPayload(e.to_string()))
    }
}

/// Reshape a chain block's activity payload into an `add_activity` call.
///
/// The block's own id travels along as `block_hash`, tying the persisted
/// activity to the exact chain entry it came from.
pub fn add_activity_call(block: &ChainBlock) -> Result<ContractCall> {
    let submission: ActivitySubmission = serde_json::from_str(&block.payload).map_err(|e| {
        KernelError::InvalidPayload(format!(
            "block {} does not carry an activity: {e}",
            block.block_id
        ))
    })?;

    let record = ActivityRecord {
        activity_id: submission.activity_id,
        block_hash: block.block_id.clone(),
        reward_points: submission.reward_points,
    };
    ContractCall::new(ADD_ACTIVITY_ENTRY, &record)
}

pub fn add_admin_call(admin_did: &str) -> Result<ContractCall> {
    ContractCall::new(
        ADD_ADMIN_ENTRY,
        &AdminGrant {
            admin_did: admin_did.to_string(),
        },
    )
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FtInfo {
    pub comment: String,
    pub ft_count: f64,
    pub ft_name: String,
    pub sender: String,
    #[serde(rename = "creatorDID")]
    pub creator_did: String,
    pub receiver: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferSampleFt {
    pub name: String,
    pub ft_info: FtInfo,
}

/// Reward transfer from the admin (who also created the token) to a user.
pub fn transfer_reward_call(
    whitelist_name: &str,
    token_name: &str,
    reward_points: u64,
    admin_did: &str,
    user_did: &str,
) -> Result<ContractCall> {
    let args = TransferSampleFt {
        name: whitelist_name.to_string(),
        ft_info: FtInfo {
            comment: "Transfer of reward via contract".to_string(),
            ft_count: reward_points as f64,
            ft_name: token_name.to_string(),
            sender: admin_did.to_string(),
            creator_did: admin_did.to_string(),
            receiver: user_did.to_string(),
        },
    };
    ContractCall::new(TRANSFER_FT_ENTRY, &args)
}

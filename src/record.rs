// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Side-effect records written by contracts through the host function.
//!
//! A record is classified before it is dispatched to a store category:
//!
//! 1. If the object declares `"kind"`, that discriminator decides the variant
//!    and unknown values are rejected.
//! 2. Otherwise exactly one of the well-known keys must be present:
//!    `activity_id` selects [`Category::Activity`], `admin_did` selects
//!    [`Category::AdminGrant`]. Both or neither is an error.
//!
//! The discriminator is stripped before the record body is validated, so the
//! persisted arrays hold plain `{activity_id, block_hash, reward_points}` and
//! `{admin_did}` objects.

use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{KernelError, Result};

pub const KIND_FIELD: &str = "kind";
pub const ACTIVITY_KEY: &str = "activity_id";
pub const ADMIN_KEY: &str = "admin_did";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Activity,
    AdminGrant,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Activity, Category::AdminGrant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Activity => "activity",
            Category::AdminGrant => "admin_grant",
        }
    }

    pub fn from_discriminator(value: &str) -> Result<Self> {
        match value {
            "activity" => Ok(Category::Activity),
            "admin_grant" => Ok(Category::AdminGrant),
            other => Err(KernelError::UnknownDiscriminator(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: String,
    /// Id of the chain block the activity was read from.
    #[serde(default)]
    pub block_hash: String,
    pub reward_points: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminGrant {
    pub admin_did: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffectRecord {
    Activity(ActivityRecord),
    AdminGrant(AdminGrant),
}

impl SideEffectRecord {
    pub fn category(&self) -> Category {
        match self {
            SideEffectRecord::Activity(_) => Category::Activity,
            SideEffectRecord::AdminGrant(_) => Category::AdminGrant,
        }
    }

    /// Classify and validate raw bytes copied out of the sandbox.
    pub fn classify(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| KernelError::MalformedRecord(e.to_string()))?;

        let Value::Object(mut body) = value else {
            return Err(KernelError::UnrecognizedRecord(
                "expected a JSON object".to_string(),
            ));
        };

        let category = match body.remove(KIND_FIELD) {
            Some(Value::String(kind)) => Category::from_discriminator(&kind)?,
            Some(other) => return Err(KernelError::UnknownDiscriminator(other.to_string())),
            None => sniff_category(&body)?,
        };

        let body = Value::Object(body);
        match category {
            Category::Activity => serde_json::from_value(body)
                .map(SideEffectRecord::Activity)
                .map_err(|e| KernelError::InvalidRecord {
                    category: Category::Activity.as_str(),
                    reason: e.to_string(),
                }),
            Category::AdminGrant => serde_json::from_value(body)
                .map(SideEffectRecord::AdminGrant)
                .map_err(|e| KernelError::InvalidRecord {
                    category: Category::AdminGrant.as_str(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Untagged body as it is persisted in the category's array.
    pub fn to_body(&self) -> Value {
        match self {
            SideEffectRecord::Activity(record) => json!({
                "activity_id": record.activity_id,
                "block_hash": record.block_hash,
                "reward_points": record.reward_points,
            }),
            SideEffectRecord::AdminGrant(record) => json!({
                "admin_did": record.admin_did,
            }),
        }
    }
}

fn sniff_category(body: &Map<String, Value>) -> Result<Category> {
    match (body.contains_key(ACTIVITY_KEY), body.contains_key(ADMIN_KEY)) {
        (true, false) => Ok(Category::Activity),
        (false, true) => Ok(Category::AdminGrant),
        (true, true) => Err(KernelError::AmbiguousRecord),
        (false, false) => {
            let keys: Vec<&str> = body.keys().map(String::as_str).collect();
            Err(KernelError::UnrecognizedRecord(format!(
                "no {ACTIVITY_KEY} or {ADMIN_KEY} field (keys: {keys:?})"
            )))
        }
    }
}

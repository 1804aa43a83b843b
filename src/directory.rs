// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node directory: name / port / ledger identity / storage root.
//!
//! Built once from configuration and never mutated afterwards. Three lookup
//! indices share one backing vector. Uniqueness of ports and identities is
//! assumed, not enforced: on a collision the entry whose name sorts first wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::id::Did;

pub const DEFAULT_HOST: &str = "localhost";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub identity: Did,
    pub storage_root: PathBuf,
}

impl NodeEntry {
    /// Base URL of the node's REST API, e.g. `http://localhost:20002`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Directory holding the deployed artifacts of one contract.
    pub fn contract_dir(&self, contract_hash: &str) -> PathBuf {
        contract_dir(&self.storage_root, contract_hash)
    }
}

/// `<storage_root>/SmartContract/<contract_hash>`
pub fn contract_dir(storage_root: &Path, contract_hash: &str) -> PathBuf {
    storage_root.join("SmartContract").join(contract_hash)
}

#[derive(Debug, Default)]
pub struct NodeDirectory {
    entries: Vec<NodeEntry>,
    by_name: HashMap<String, usize>,
    by_port: HashMap<u16, usize>,
    by_identity: HashMap<Did, usize>,
}

impl NodeDirectory {
    pub fn from_entries(mut entries: Vec<NodeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_port = HashMap::with_capacity(entries.len());
        let mut by_identity = HashMap::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            by_name.entry(entry.name.clone()).or_insert(idx);
            by_port.entry(entry.port).or_insert(idx);
            by_identity.entry(entry.identity.clone()).or_insert(idx);
        }

        Self {
            entries,
            by_name,
            by_port,
            by_identity,
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&NodeEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn by_port(&self, port: u16) -> Option<&NodeEntry> {
        self.by_port.get(&port).map(|&idx| &self.entries[idx])
    }

    pub fn by_identity(&self, identity: &Did) -> Option<&NodeEntry> {
        self.by_identity.get(identity).map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

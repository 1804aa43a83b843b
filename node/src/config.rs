// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Service configuration.
//!
//! A TOML file supplies the node table and the service sections; contract
//! hashes, store paths and the signing password come from the environment
//! (optionally seeded from an env file). Everything except `[nodes]` has a
//! default.

use dapp_kernel::directory::{NodeDirectory, NodeEntry, DEFAULT_HOST};
use dapp_kernel::types::{ContractHash, Did};
use dapp_persistence::StorePaths;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = ".config/config.toml";
pub const DEFAULT_ENV_FILE: &str = ".config/.env";
pub const DEFAULT_SIGNATURE_PASSWORD: &str = "mypassword";

pub const ENV_ADD_ACTIVITY_CONTRACT: &str = "ADD_ACTIVITY_CONTRACT";
pub const ENV_ADD_ADMIN_CONTRACT: &str = "ADD_ADMIN_CONTRACT";
pub const ENV_TRANSFER_CONTRACT: &str = "TRANSFER_CONTRACT";
pub const ENV_ACTIVITY_UPDATE_PATH: &str = "ACTIVITY_UPDATE_PATH";
pub const ENV_ADD_ADMIN_PATH: &str = "ADD_ADMIN_PATH";
pub const ENV_SIGNATURE_PASSWORD: &str = "SIGNATURE_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid node `{name}`: {reason}")]
    InvalidNode { name: String, reason: String },
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
    #[error("failed to load env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub callback: CallbackSettings,
    pub ledger: LedgerSettings,
    pub sandbox: SandboxSettings,
    pub transfer: TransferSettings,
    pub store: StoreSettings,
    pub nodes: BTreeMap<String, NodeConfig>,
    #[serde(skip)]
    pub env: ContractEnv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

/// Where the ledger should send contract notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallbackSettings {
    pub base_url: String,
    pub path: String,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            path: "/api/call-back-trigger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub timeout_secs: u64,
    pub fetch_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub quorum_type: u32,
    pub deploy_rbt_amount: f64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            fetch_retries: 2,
            retry_initial_delay_ms: 250,
            retry_max_delay_ms: 4000,
            quorum_type: 2,
            deploy_rbt_amount: 0.001,
        }
    }
}

impl LedgerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Instruction budget per invocation.
    pub fuel: u64,
    pub max_memory_bytes: usize,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            fuel: 5_000_000_000,
            max_memory_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub token_name: String,
    pub whitelist_name: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            token_name: "ytoken".to_string(),
            whitelist_name: "rubix1".to_string(),
        }
    }
}

/// Fallback location of the store files when the env paths are unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub name: String,
    pub port: PortValue,
    pub did: String,
    pub path: PathBuf,
    #[serde(default)]
    pub host: Option<String>,
}

/// Ports are written as strings in existing config files.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    pub fn parse(&self) -> Result<u16, String> {
        match self {
            PortValue::Number(n) => u16::try_from(*n).map_err(|_| format!("port {n} out of range")),
            PortValue::Text(s) => s
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("port {s:?}: {e}")),
        }
    }
}

/// Values taken from the process environment.
#[derive(Debug, Clone)]
pub struct ContractEnv {
    pub add_activity_contract: Option<ContractHash>,
    pub add_admin_contract: Option<ContractHash>,
    pub transfer_contract: Option<ContractHash>,
    pub activity_store_path: Option<PathBuf>,
    pub admin_store_path: Option<PathBuf>,
    pub signature_password: String,
}

impl Default for ContractEnv {
    fn default() -> Self {
        Self {
            add_activity_contract: None,
            add_admin_contract: None,
            transfer_contract: None,
            activity_store_path: None,
            admin_store_path: None,
            signature_password: DEFAULT_SIGNATURE_PASSWORD.to_string(),
        }
    }
}

impl ContractEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let hash = |var: &'static str| -> Result<Option<ContractHash>, ConfigError> {
            non_empty(var)
                .map(|v| {
                    ContractHash::parse(v).map_err(|e| ConfigError::InvalidEnv {
                        var,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        Ok(Self {
            add_activity_contract: hash(ENV_ADD_ACTIVITY_CONTRACT)?,
            add_admin_contract: hash(ENV_ADD_ADMIN_CONTRACT)?,
            transfer_contract: hash(ENV_TRANSFER_CONTRACT)?,
            activity_store_path: non_empty(ENV_ACTIVITY_UPDATE_PATH).map(PathBuf::from),
            admin_store_path: non_empty(ENV_ADD_ADMIN_PATH).map(PathBuf::from),
            signature_password: non_empty(ENV_SIGNATURE_PASSWORD)
                .unwrap_or_else(|| DEFAULT_SIGNATURE_PASSWORD.to_string()),
        })
    }
}

/// Seed the process environment from an env file. A missing file is fine.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No env file at {:?}", path);
            Ok(false)
        }
        Err(e) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::from_toml_str(&content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn with_env(mut self, env: ContractEnv) -> Self {
        self.env = env;
        self
    }

    /// Build the immutable node directory. A missing `name` falls back to the table key.
    pub fn directory(&self) -> Result<NodeDirectory, ConfigError> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        for (key, node) in &self.nodes {
            let name = if node.name.trim().is_empty() {
                key.clone()
            } else {
                node.name.clone()
            };
            let port = node.port.parse().map_err(|reason| ConfigError::InvalidNode {
                name: name.clone(),
                reason,
            })?;
            if node.did.trim().is_empty() {
                return Err(ConfigError::InvalidNode {
                    name,
                    reason: "empty did".to_string(),
                });
            }
            entries.push(NodeEntry {
                name,
                host: node.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
                identity: Did::new(node.did.trim()),
                storage_root: node.path.clone(),
            });
        }
        Ok(NodeDirectory::from_entries(entries))
    }

    pub fn store_paths(&self) -> StorePaths {
        let defaults = StorePaths::under(&self.store.dir);
        StorePaths {
            activity: self
                .env
                .activity_store_path
                .clone()
                .unwrap_or(defaults.activity),
            admin_grant: self
                .env
                .admin_store_path
                .clone()
                .unwrap_or(defaults.admin_grant),
        }
    }

    pub fn callback_url(&self) -> String {
        format!(
            "{}/{}",
            self.callback.base_url.trim_end_matches('/'),
            self.callback.path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [callback]
        base_url = "http://relay:9000/"

        [ledger]
        timeout_secs = 5

        [nodes.node2]
        name = "node2"
        port = "20002"
        did = "bafyDeployer"
        path = "rubix-nodes/node2"

        [nodes.node3]
        port = 20003
        did = "bafyExecutor"
        path = "rubix-nodes/node3"
        host = "10.0.0.3"
    "#;

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.server.bind.port(), 9000);
        assert_eq!(settings.ledger.quorum_type, 2);
        assert_eq!(settings.transfer.token_name, "ytoken");
        assert!(settings.nodes.is_empty());
        assert!(settings.directory().unwrap().is_empty());
    }

    #[test]
    fn test_nodes_accept_string_and_integer_ports() {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();
        let dir = settings.directory().unwrap();

        let node2 = dir.by_identity(&Did::new("bafyDeployer")).unwrap();
        assert_eq!(node2.port, 20002);
        assert_eq!(node2.host, "localhost");

        let node3 = dir.by_port(20003).unwrap();
        assert_eq!(node3.name, "node3");
        assert_eq!(node3.base_url(), "http://10.0.0.3:20003");
        assert_eq!(settings.ledger.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_port_is_reported_per_node() {
        let settings = Settings::from_toml_str(
            r#"
            [nodes.broken]
            port = "twenty"
            did = "x"
            path = "p"
        "#,
        )
        .unwrap();
        match settings.directory() {
            Err(ConfigError::InvalidNode { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected InvalidNode, got {other:?}"),
        }
    }

    #[test]
    fn test_callback_url_joins_cleanly() {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();
        assert_eq!(settings.callback_url(), "http://relay:9000/api/call-back-trigger");
    }

    #[test]
    fn test_env_lookup_and_store_paths() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_ADD_ACTIVITY_CONTRACT, "QmActivity"),
            (ENV_TRANSFER_CONTRACT, "  "),
            (ENV_ACTIVITY_UPDATE_PATH, "/srv/activity.json"),
        ]);
        let env = ContractEnv::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(env.add_activity_contract.as_ref().unwrap().as_str(), "QmActivity");
        assert!(env.transfer_contract.is_none());
        assert_eq!(env.signature_password, DEFAULT_SIGNATURE_PASSWORD);

        let settings = Settings::from_toml_str("").unwrap().with_env(env);
        let paths = settings.store_paths();
        assert_eq!(paths.activity, PathBuf::from("/srv/activity.json"));
        assert_eq!(paths.admin_grant, PathBuf::from(".data/admins.json"));
    }

    #[test]
    fn test_env_rejects_path_like_hash() {
        let err = ContractEnv::from_lookup(|k| {
            (k == ENV_ADD_ADMIN_CONTRACT).then(|| "../escape".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_ADD_ADMIN_CONTRACT, .. }));
    }

    #[test]
    fn test_signature_password_default_is_consistent() {
        let looked_up = ContractEnv::from_lookup(|_| None).unwrap();
        assert_eq!(ContractEnv::default().signature_password, looked_up.signature_password);
        assert_eq!(
            Settings::from_toml_str("").unwrap().env.signature_password,
            DEFAULT_SIGNATURE_PASSWORD
        );
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(&dir.path().join("absent.env")).unwrap());
    }
}

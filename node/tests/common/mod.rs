// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use dapp_kernel::types::ContractHash;
use dapp_node::config::{ContractEnv, Settings};
use dapp_node::server::{build_router, AppState};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

pub const DEPLOYER: &str = "bafyDeployer";
pub const ADMIN: &str = "bafyAdmin";

/// Forwards `add_activity`/`add_admin` to the host store and echoes anything else.
pub const CONTRACT_WAT: &str = r#"
(module
    (import "env" "write_to_json_file" (func $write (param i32 i32 i32 i32) (result i32)))
    (memory (export "memory") 1)
    (global $heap (mut i32) (i32.const 1024))
    (func (export "alloc") (param $len i32) (result i32)
        (local $ptr i32)
        global.get $heap
        local.set $ptr
        global.get $heap
        local.get $len
        i32.add
        global.set $heap
        local.get $ptr)
    (func (export "add_activity") (param i32 i32 i32 i32) (result i32)
        local.get 0
        local.get 1
        local.get 2
        local.get 3
        call $write)
    (func (export "add_admin") (param i32 i32 i32 i32) (result i32)
        local.get 0
        local.get 1
        local.get 2
        local.get 3
        call $write)
    (func (export "echo") (param i32 i32 i32 i32) (result i32)
        local.get 2
        local.get 0
        i32.store
        local.get 3
        local.get 1
        i32.store
        i32.const 0)
)
"#;

pub struct Relay {
    pub dir: TempDir,
    pub app: Router,
    pub state: Arc<AppState>,
    pub port: u16,
}

impl Relay {
    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("node")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Place the fixture module where the locator looks for `hash`.
    pub fn install_module(&self, hash: &str) -> PathBuf {
        let dir = self.storage_root().join("SmartContract").join(hash);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("contract.wasm");
        std::fs::write(&path, wat::parse_str(CONTRACT_WAT).unwrap()).unwrap();
        path
    }

    /// Dummy artifacts for the generate call.
    pub fn artifacts(&self) -> (PathBuf, PathBuf, PathBuf) {
        let dir = self.dir.path().join("artifacts");
        std::fs::create_dir_all(&dir).unwrap();
        let module = write_file(&dir, "contract.wasm", b"\0asm");
        let source = write_file(&dir, "lib.rs", b"// contract");
        let schema = write_file(&dir, "state.json", b"{}");
        (module, source, schema)
    }

    pub async fn post(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let resp = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A relay whose only two nodes (deployer and admin) both point at `ledger`.
pub fn relay(ledger: &MockServer, env: ContractEnv) -> Relay {
    let dir = tempfile::tempdir().unwrap();
    let port = ledger.address().port();
    let root = dir.path().join("node");
    let config = format!(
        r#"
[ledger]
timeout_secs = 5
fetch_retries = 2
retry_initial_delay_ms = 5
retry_max_delay_ms = 20

[callback]
base_url = "http://relay.test"

[store]
dir = "{store}"

[nodes.deployer]
port = "{port}"
did = "{DEPLOYER}"
path = "{root}"
host = "127.0.0.1"

[nodes.admin]
port = {other}
did = "{ADMIN}"
path = "{root}"
host = "127.0.0.1"
"#,
        store = dir.path().join("store").display(),
        root = root.display(),
        // The admin node shares the ledger mock but needs a distinct port.
        other = port.wrapping_add(1),
    );
    let settings = Settings::from_toml_str(&config).unwrap().with_env(env);
    let state = Arc::new(AppState::new(settings).unwrap());
    let app = build_router(state.clone());
    Relay { dir, app, state, port }
}

pub fn hash(value: &str) -> ContractHash {
    ContractHash::parse(value).unwrap()
}

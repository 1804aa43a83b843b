// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Contract module invocation under wasmtime.
//!
//! ## Guest ABI
//!
//! A contract module exports `memory`, `alloc(len) -> ptr` and one function per
//! entry point with the signature
//! `entry(in_ptr, in_len, out_ptr_ptr, out_len_ptr) -> status`.
//!
//! The host copies the entry's JSON arguments into guest memory through
//! `alloc`, then passes two zeroed `u32` slots. On return the slots hold the
//! pointer and length (little endian) of a UTF-8 result string. Status `0` is
//! success; any other status makes the result string the guest's error.
//!
//! ## Host functions
//!
//! `env.write_to_json_file(data_ptr, data_len, resp_ptr_ptr, resp_len_ptr) -> status`
//! persists one side-effect record and answers through the same out-slot
//! convention. Statuses: [`HOST_OK`], [`HOST_REJECTED`] (record shape not
//! recognized, nothing written), [`HOST_STORE_FAILED`].
//!
//! Every invocation gets a fresh `Store`, so no guest state survives between
//! calls. Fuel bounds the instruction count and a store limiter bounds memory.

use anyhow::{anyhow, bail, Context as _};
use dapp_kernel::error::KernelError;
use dapp_kernel::payload::ContractCall;
use dapp_kernel::record::{Category, SideEffectRecord};
use dapp_persistence::RecordStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use wasmtime::{
    AsContext, AsContextMut, Caller, Config, Engine, Extern, ExternType, Linker, Memory, Module,
    Store, StoreLimits, StoreLimitsBuilder, Trap, TypedFunc,
};

use crate::config::SandboxSettings;
use crate::telemetry::{SANDBOX_INVOCATIONS, STORE_APPENDS};

pub const HOST_MODULE: &str = "env";
pub const HOST_WRITE_RECORD: &str = "write_to_json_file";
pub const EXPORT_MEMORY: &str = "memory";
pub const EXPORT_ALLOC: &str = "alloc";

pub const HOST_OK: i32 = 0;
pub const HOST_REJECTED: i32 = 1;
pub const HOST_STORE_FAILED: i32 = 2;
pub const HOST_WRITE_CONFIRMATION: &str = "Successfully wrote data to DB";

const WASM_PAGE_SIZE: u64 = 65_536;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to load module: {0}")]
    Load(String),

    #[error("module requested too much memory: {requested} bytes (limit {limit})")]
    MemoryLimitExceeded { requested: u64, limit: usize },

    #[error("module does not export `{0}` with the expected signature")]
    MissingExport(String),

    #[error("invalid contract input: {0}")]
    InvalidPayload(#[from] KernelError),

    #[error("fuel exhausted")]
    OutOfFuel,

    #[error("guest trapped: {0}")]
    Trap(String),

    #[error("guest returned an unreadable result: {0}")]
    InvalidOutput(String),

    /// The contract ran to completion and reported an error of its own.
    #[error("contract returned status {status}: {message}")]
    Guest { status: i32, message: String },

    #[error("host error: {0}")]
    Host(String),
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub output: String,
    /// Categories of the side-effect records written during the call, in order.
    pub records: Vec<Category>,
    pub fuel_consumed: u64,
}

pub struct HostState {
    store: RecordStore,
    limits: StoreLimits,
    written: Vec<Category>,
}

#[derive(Clone)]
pub struct SandboxInvoker {
    engine: Engine,
    linker: Arc<Linker<HostState>>,
    store: RecordStore,
    fuel: u64,
    max_memory_bytes: usize,
}

impl SandboxInvoker {
    pub fn new(settings: &SandboxSettings, store: RecordStore) -> Result<Self, SandboxError> {
        let mut config = Config::new();
        config.consume_fuel(true);
        let engine = Engine::new(&config).map_err(|e| SandboxError::Host(format!("{e:#}")))?;

        let mut linker = Linker::new(&engine);
        linker
            .func_wrap(HOST_MODULE, HOST_WRITE_RECORD, write_record)
            .map_err(|e| SandboxError::Host(format!("failed to add host func: {e:#}")))?;

        Ok(Self {
            engine,
            linker: Arc::new(linker),
            store,
            fuel: settings.fuel,
            max_memory_bytes: settings.max_memory_bytes,
        })
    }

    /// Invoke the entry point named by `payload_json`'s single key.
    pub fn invoke(&self, module_path: &Path, payload_json: &str) -> Result<Invocation, SandboxError> {
        let call = ContractCall::parse(payload_json)?;
        let module = Module::from_file(&self.engine, module_path)
            .map_err(|e| SandboxError::Load(format!("{}: {e:#}", module_path.display())))?;
        self.check_memory(&module)?;

        let result = self.run(&module, &call);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(SandboxError::Guest { .. }) => "guest_error",
            Err(_) => "error",
        };
        metrics::increment_counter!(SANDBOX_INVOCATIONS, "entry" => call.entry().to_string(), "outcome" => outcome);

        match &result {
            Ok(inv) => info!(
                module = %module_path.display(),
                entry = call.entry(),
                records = inv.records.len(),
                fuel = inv.fuel_consumed,
                "Contract invoked"
            ),
            Err(e) => warn!(module = %module_path.display(), entry = call.entry(), "Contract invocation failed: {}", e),
        }
        result
    }

    /// Run [`invoke`](Self::invoke) on the blocking pool.
    pub async fn invoke_blocking(
        &self,
        module_path: PathBuf,
        payload_json: String,
    ) -> Result<Invocation, SandboxError> {
        let invoker = self.clone();
        tokio::task::spawn_blocking(move || invoker.invoke(&module_path, &payload_json))
            .await
            .map_err(|e| SandboxError::Host(format!("invocation task failed: {e}")))?
    }

    fn check_memory(&self, module: &Module) -> Result<(), SandboxError> {
        for export in module.exports() {
            if let ExternType::Memory(ty) = export.ty() {
                let requested = ty.minimum().saturating_mul(WASM_PAGE_SIZE);
                if requested > self.max_memory_bytes as u64 {
                    return Err(SandboxError::MemoryLimitExceeded {
                        requested,
                        limit: self.max_memory_bytes,
                    });
                }
            }
        }
        Ok(())
    }

    fn run(&self, module: &Module, call: &ContractCall) -> Result<Invocation, SandboxError> {
        let state = HostState {
            store: self.store.clone(),
            limits: StoreLimitsBuilder::new()
                .memory_size(self.max_memory_bytes)
                .build(),
            written: Vec::new(),
        };
        let mut store = Store::new(&self.engine, state);
        store.limiter(|s| &mut s.limits);
        store
            .set_fuel(self.fuel)
            .map_err(|e| SandboxError::Host(format!("{e:#}")))?;

        let instance = self
            .linker
            .instantiate(&mut store, module)
            .map_err(call_error)?;

        let memory = instance
            .get_memory(&mut store, EXPORT_MEMORY)
            .ok_or_else(|| SandboxError::MissingExport(EXPORT_MEMORY.to_string()))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, EXPORT_ALLOC)
            .map_err(|_| SandboxError::MissingExport(EXPORT_ALLOC.to_string()))?;
        let entry = instance
            .get_typed_func::<(i32, i32, i32, i32), i32>(&mut store, call.entry())
            .map_err(|_| SandboxError::MissingExport(call.entry().to_string()))?;

        let args = call.args_json();
        debug!(entry = call.entry(), args = %args, "Calling contract");

        let (in_ptr, in_len) = put_bytes(&mut store, memory, &alloc, args.as_bytes()).map_err(call_error)?;
        let slots = alloc.call(&mut store, 8).map_err(call_error)?;
        memory
            .write(&mut store, offset(slots), &[0u8; 8])
            .map_err(|e| SandboxError::Trap(format!("out slots: {e}")))?;

        let status = entry
            .call(&mut store, (in_ptr, in_len, slots, slots.wrapping_add(4)))
            .map_err(call_error)?;

        let out_ptr = read_u32(&store, memory, slots).map_err(|e| SandboxError::InvalidOutput(format!("{e:#}")))?;
        let out_len = read_u32(&store, memory, slots.wrapping_add(4))
            .map_err(|e| SandboxError::InvalidOutput(format!("{e:#}")))?;
        let raw = read_bytes(&store, memory, out_ptr, out_len)
            .map_err(|e| SandboxError::InvalidOutput(format!("{e:#}")))?;
        let output = String::from_utf8(raw).map_err(|e| SandboxError::InvalidOutput(e.to_string()))?;

        if status != 0 {
            return Err(SandboxError::Guest {
                status,
                message: output,
            });
        }

        let remaining = store.get_fuel().unwrap_or(0);
        Ok(Invocation {
            output,
            records: std::mem::take(&mut store.data_mut().written),
            fuel_consumed: self.fuel.saturating_sub(remaining),
        })
    }
}

/// Classify and persist one record copied out of the guest.
///
/// Returns the host status and the message handed back to the guest.
pub fn persist_record(store: &RecordStore, bytes: &[u8]) -> (i32, String, Option<Category>) {
    let record = match SideEffectRecord::classify(bytes) {
        Ok(record) => record,
        Err(e) => {
            warn!("Rejected side-effect record: {}", e);
            return (HOST_REJECTED, e.to_string(), None);
        }
    };

    let category = record.category();
    match store.append(&record) {
        Ok(len) => {
            metrics::increment_counter!(STORE_APPENDS, "category" => category.as_str());
            debug!(category = %category, len, "Side-effect record stored");
            (HOST_OK, HOST_WRITE_CONFIRMATION.to_string(), Some(category))
        }
        Err(e) => {
            warn!(category = %category, "Failed to store side-effect record: {}", e);
            (HOST_STORE_FAILED, e.to_string(), None)
        }
    }
}

fn write_record(
    mut caller: Caller<'_, HostState>,
    data_ptr: i32,
    data_len: i32,
    resp_ptr_ptr: i32,
    resp_len_ptr: i32,
) -> anyhow::Result<i32> {
    let memory = match caller.get_export(EXPORT_MEMORY) {
        Some(Extern::Memory(memory)) => memory,
        _ => bail!("guest does not export `{EXPORT_MEMORY}`"),
    };
    let data = read_bytes(&caller, memory, data_ptr, data_len)?;

    let (status, message, category) = persist_record(&caller.data().store, &data);
    if let Some(category) = category {
        caller.data_mut().written.push(category);
    }

    let alloc = match caller.get_export(EXPORT_ALLOC) {
        Some(Extern::Func(func)) => func.typed::<i32, i32>(&caller)?,
        _ => bail!("guest does not export `{EXPORT_ALLOC}`"),
    };
    let (ptr, len) = put_bytes(&mut caller, memory, &alloc, message.as_bytes())?;
    memory.write(&mut caller, offset(resp_ptr_ptr), &(ptr as u32).to_le_bytes())?;
    memory.write(&mut caller, offset(resp_len_ptr), &(len as u32).to_le_bytes())?;
    Ok(status)
}

/// Guest pointers are unsigned 32-bit offsets.
fn offset(ptr: i32) -> usize {
    ptr as u32 as usize
}

fn put_bytes(
    mut ctx: impl AsContextMut,
    memory: Memory,
    alloc: &TypedFunc<i32, i32>,
    bytes: &[u8],
) -> anyhow::Result<(i32, i32)> {
    let len = i32::try_from(bytes.len()).context("buffer larger than guest address space")?;
    let ptr = alloc.call(&mut ctx, len)?;
    memory
        .write(&mut ctx, offset(ptr), bytes)
        .map_err(|e| anyhow!("alloc returned an unusable pointer {ptr}: {e}"))?;
    Ok((ptr, len))
}

/// Bounds are checked against the current memory size before anything is copied.
fn read_bytes(ctx: impl AsContext, memory: Memory, ptr: i32, len: i32) -> anyhow::Result<Vec<u8>> {
    let data = memory.data(&ctx);
    let start = offset(ptr);
    let bytes = start
        .checked_add(offset(len))
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| anyhow!("out of bounds read at {start} (+{})", offset(len)))?;
    Ok(bytes.to_vec())
}

fn read_u32(ctx: impl AsContext, memory: Memory, ptr: i32) -> anyhow::Result<i32> {
    let mut buf = [0u8; 4];
    memory
        .read(&ctx, offset(ptr), &mut buf)
        .map_err(|e| anyhow!("out of bounds read at {ptr}: {e}"))?;
    Ok(u32::from_le_bytes(buf) as i32)
}

fn call_error(e: anyhow::Error) -> SandboxError {
    match e.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => SandboxError::OutOfFuel,
        _ => SandboxError::Trap(format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dapp_persistence::StorePaths;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    /// Bump allocator, an entry forwarding to the host, an echo, a failing
    /// entry and an endless loop.
    const CONTRACT_WAT: &str = r#"
    (module
        (import "env" "write_to_json_file" (func $write (param i32 i32 i32 i32) (result i32)))
        (memory (export "memory") 1)
        (data (i32.const 0) "not an admin")
        (global $heap (mut i32) (i32.const 1024))
        (func $alloc (export "alloc") (param $len i32) (result i32)
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
        (func (export "fail") (param i32 i32 i32 i32) (result i32)
            local.get 2
            i32.const 0
            i32.store
            local.get 3
            i32.const 12
            i32.store
            i32.const 3)
        (func (export "overlong") (param i32 i32 i32 i32) (result i32)
            local.get 2
            i32.const 0
            i32.store
            local.get 3
            i32.const -1
            i32.store
            i32.const 0)
        (func (export "spin") (param i32 i32 i32 i32) (result i32)
            (loop $l
                br $l)
            i32.const 0)
    )
    "#;

    struct Fixture {
        _dir: TempDir,
        module: PathBuf,
        store: RecordStore,
        invoker: SandboxInvoker,
    }

    fn fixture(settings: SandboxSettings) -> Fixture {
        let dir = tempdir().unwrap();
        let module = dir.path().join("contract.wasm");
        std::fs::write(&module, wat::parse_str(CONTRACT_WAT).unwrap()).unwrap();
        let store = RecordStore::new(StorePaths::under(dir.path().join("store")));
        let invoker = SandboxInvoker::new(&settings, store.clone()).unwrap();
        Fixture {
            _dir: dir,
            module,
            store,
            invoker,
        }
    }

    #[test]
    fn test_echo_returns_entry_args() {
        let f = fixture(SandboxSettings::default());
        let inv = f
            .invoker
            .invoke(&f.module, r#"{"echo":{"hello":"world"}}"#)
            .unwrap();
        assert_eq!(inv.output, r#"{"hello":"world"}"#);
        assert!(inv.records.is_empty());
        assert!(inv.fuel_consumed > 0);
    }

    #[test]
    fn test_host_function_appends_activity() {
        let f = fixture(SandboxSettings::default());
        let payload = json!({"add_activity": {"activity_id": "a1", "reward_points": 10, "block_hash": "5-x"}});
        let inv = f.invoker.invoke(&f.module, &payload.to_string()).unwrap();

        assert_eq!(inv.output, HOST_WRITE_CONFIRMATION);
        assert_eq!(inv.records, vec![Category::Activity]);
        assert_eq!(
            f.store.read_all(Category::Activity).unwrap(),
            vec![json!({"activity_id": "a1", "block_hash": "5-x", "reward_points": 10})]
        );
    }

    #[test]
    fn test_unrecognized_record_is_rejected_and_not_stored() {
        let f = fixture(SandboxSettings::default());
        let err = f
            .invoker
            .invoke(&f.module, r#"{"add_activity":{"user":"u1","points":3}}"#)
            .unwrap_err();
        match err {
            SandboxError::Guest { status, message } => {
                assert_eq!(status, HOST_REJECTED);
                assert!(message.contains("Unrecognized"));
            }
            other => panic!("expected Guest error, got {other:?}"),
        }
        assert!(f.store.read_all(Category::Activity).unwrap().is_empty());
        assert!(f.store.read_all(Category::AdminGrant).unwrap().is_empty());
    }

    #[test]
    fn test_guest_error_status_and_message() {
        let f = fixture(SandboxSettings::default());
        match f.invoker.invoke(&f.module, r#"{"fail":{}}"#) {
            Err(SandboxError::Guest { status, message }) => {
                assert_eq!(status, 3);
                assert_eq!(message, "not an admin");
            }
            other => panic!("expected Guest error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_entry_point() {
        let f = fixture(SandboxSettings::default());
        match f.invoker.invoke(&f.module, r#"{"mint":{}}"#) {
            Err(SandboxError::MissingExport(name)) => assert_eq!(name, "mint"),
            other => panic!("expected MissingExport, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_must_have_one_key() {
        let f = fixture(SandboxSettings::default());
        assert!(matches!(
            f.invoker.invoke(&f.module, r#"{"echo":{},"fail":{}}"#),
            Err(SandboxError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_result_length_is_invalid_output() {
        let f = fixture(SandboxSettings::default());
        match f.invoker.invoke(&f.module, r#"{"overlong":{}}"#) {
            Err(SandboxError::InvalidOutput(message)) => {
                assert!(message.contains("out of bounds"), "{message}");
                assert!(message.contains("4294967295"), "{message}");
            }
            other => panic!("expected InvalidOutput, got {other:?}"),
        }
    }

    #[test]
    fn test_fuel_exhaustion() {
        let f = fixture(SandboxSettings {
            fuel: 100_000,
            ..SandboxSettings::default()
        });
        assert!(matches!(
            f.invoker.invoke(&f.module, r#"{"spin":{}}"#),
            Err(SandboxError::OutOfFuel)
        ));
    }

    #[test]
    fn test_memory_limit_exceeded_rejected() {
        let f = fixture(SandboxSettings::default());
        let big = f._dir.path().join("big.wasm");
        std::fs::write(
            &big,
            wat::parse_str(r#"(module (memory (export "memory") 1000))"#).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            f.invoker.invoke(&big, r#"{"echo":{}}"#),
            Err(SandboxError::MemoryLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_invocations_do_not_share_state() {
        let f = fixture(SandboxSettings::default());
        let a = f.invoker.invoke(&f.module, r#"{"echo":{"n":1}}"#).unwrap();
        let b = f.invoker.invoke(&f.module, r#"{"echo":{"n":1}}"#).unwrap();
        // A fresh store restarts the bump allocator, so both runs cost the same.
        assert_eq!(a.fuel_consumed, b.fuel_consumed);
    }

    #[test]
    fn test_persist_record_direct() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(StorePaths::under(dir.path()));
        let (status, _, category) = persist_record(&store, br#"{"admin_did":"bafyNew"}"#);
        assert_eq!(status, HOST_OK);
        assert_eq!(category, Some(Category::AdminGrant));

        let (status, _, category) = persist_record(&store, b"not json");
        assert_eq!(status, HOST_REJECTED);
        assert!(category.is_none());
        assert_eq!(store.read_all(Category::AdminGrant).unwrap().len(), 1);
    }
}

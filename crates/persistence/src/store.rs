// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::{PersistenceError, Result};

use dapp_kernel::record::{Category, SideEffectRecord, ACTIVITY_KEY};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// One file per record category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub activity: PathBuf,
    pub admin_grant: PathBuf,
}

impl StorePaths {
    /// Default file names inside a single directory.
    pub fn under(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            activity: dir.join("activities.json"),
            admin_grant: dir.join("admins.json"),
        }
    }

    pub fn path(&self, category: Category) -> &Path {
        match category {
            Category::Activity => &self.activity,
            Category::AdminGrant => &self.admin_grant,
        }
    }
}

/// Process-wide lock registry. Two stores opened on the same file share a lock.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let registry = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    paths: StorePaths,
}

impl RecordStore {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Append a classified record to its category's array.
    ///
    /// Returns the array length after the append.
    pub fn append(&self, record: &SideEffectRecord) -> Result<usize> {
        self.append_body(record.category(), record.to_body())
    }

    pub fn append_body(&self, category: Category, body: Value) -> Result<usize> {
        let path = self.paths.path(category);
        let lock = path_lock(path);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut entries = read_array(path)?;
        entries.push(body);
        write_array(path, &entries)?;

        debug!(category = %category, path = %path.display(), len = entries.len(), "Appended record");
        Ok(entries.len())
    }

    /// All entries of a category in append order. An absent file reads as empty.
    pub fn read_all(&self, category: Category) -> Result<Vec<Value>> {
        let path = self.paths.path(category);
        let lock = path_lock(path);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        read_array(path)
    }

    /// Reward points of the most recent activity entry with this id.
    pub fn reward_points_for(&self, activity_id: &str) -> Result<Option<u64>> {
        let entries = self.read_all(Category::Activity)?;
        Ok(entries
            .iter()
            .rev()
            .find(|entry| entry.get(ACTIVITY_KEY).and_then(Value::as_str) == Some(activity_id))
            .and_then(|entry| entry.get("reward_points"))
            .and_then(Value::as_u64))
    }
}

fn read_array(path: &Path) -> Result<Vec<Value>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(other) => Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("top-level value is {}", kind_of(&other)),
        }),
        Err(e) => Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn write_array(path: &Path, entries: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut body = serde_json::to_vec_pretty(entries)?;
    body.push(b'\n');

    let tmp_path = tmp_path_for(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

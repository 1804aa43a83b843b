// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Finds a contract's compiled module inside a node's storage tree.

use crate::errors::DappError;
use dapp_kernel::directory::contract_dir;
use dapp_kernel::types::ContractHash;
use std::fs;
use std::path::{Path, PathBuf};

pub const MODULE_SUFFIX: &str = ".wasm";

/// `<storage_root>/SmartContract/<hash>/*.wasm`, non-recursive.
///
/// When several modules are present the one whose file name sorts first is
/// returned, so the choice does not depend on the filesystem's listing order.
pub fn locate_module(storage_root: &Path, contract_hash: &ContractHash) -> Result<PathBuf, DappError> {
    let dir = contract_dir(storage_root, contract_hash.as_str());
    let not_found = || DappError::ArtifactNotFound {
        contract_hash: contract_hash.to_string(),
        dir: dir.clone(),
    };

    let entries = fs::read_dir(&dir).map_err(|e| {
        tracing::debug!("Cannot list {:?}: {}", dir, e);
        not_found()
    })?;

    let mut modules: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(MODULE_SUFFIX))
        .map(|entry| entry.path())
        .collect();
    modules.sort();

    modules.into_iter().next().ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn hash(s: &str) -> ContractHash {
        ContractHash::parse(s).unwrap()
    }

    #[test]
    fn test_finds_module_next_to_other_artifacts() {
        let root = tempdir().unwrap();
        let dir = contract_dir(root.path(), "QmA");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("schema.json"), "{}").unwrap();
        fs::write(dir.join("lib.rs"), "").unwrap();
        fs::write(dir.join("contract.wasm"), b"\0asm").unwrap();

        assert_eq!(locate_module(root.path(), &hash("QmA")).unwrap(), dir.join("contract.wasm"));
    }

    #[test]
    fn test_first_name_wins_and_dirs_are_skipped() {
        let root = tempdir().unwrap();
        let dir = contract_dir(root.path(), "QmB");
        fs::create_dir_all(dir.join("a.wasm")).unwrap();
        fs::write(dir.join("z.wasm"), b"").unwrap();
        fs::write(dir.join("m.wasm"), b"").unwrap();

        assert_eq!(locate_module(root.path(), &hash("QmB")).unwrap(), dir.join("m.wasm"));
    }

    #[test]
    fn test_missing_dir_and_no_match_are_not_found() {
        let root = tempdir().unwrap();
        assert!(matches!(
            locate_module(root.path(), &hash("QmMissing")),
            Err(DappError::ArtifactNotFound { .. })
        ));

        let dir = contract_dir(root.path(), "QmEmpty");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("contract.wat"), "").unwrap();
        match locate_module(root.path(), &hash("QmEmpty")) {
            Err(DappError::ArtifactNotFound { contract_hash, dir: reported }) => {
                assert_eq!(contract_hash, "QmEmpty");
                assert_eq!(reported, dir);
            }
            other => panic!("expected ArtifactNotFound, got {other:?}"),
        }
    }
}

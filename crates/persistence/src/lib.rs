// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable side-effect store.
//!
//! Each record category lives in its own JSON file holding one array. Files
//! are only ever replaced whole (tmp + fsync + rename), so a reader sees the
//! previous array or the next one, never a torn write.

pub mod error;
pub mod store;

pub use error::{PersistenceError, Result};
pub use store::{RecordStore, StorePaths};

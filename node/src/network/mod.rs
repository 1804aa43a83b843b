// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod client;
pub mod retry;
pub mod wire;

pub use client::LedgerClient;

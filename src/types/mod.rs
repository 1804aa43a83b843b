// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod id;
pub mod block;

pub use block::{BlockSignatures, ChainBlock};
pub use id::{ContractHash, Did, SignatureRequestId};

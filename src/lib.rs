// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! dapp-kernel: the IO-free domain of the dapp relay.
//!
//! Identity resolution, chain blocks, side-effect records, block selection and
//! contract-call payload shaping. Nothing in here talks to the network, the
//! filesystem or the sandbox; the node crate wires those around these types.

pub mod error;
pub mod types;
pub mod directory;
pub mod record;
pub mod selection;
pub mod payload;

pub use error::{KernelError, Result};

#[cfg(test)]
pub mod tests;

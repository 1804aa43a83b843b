// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Relevant-block selection for callback processing.
//!
//! The ledger returns a contract's history oldest first. The tail of that
//! order is trusted to be the most recent block; no sort is applied.

use crate::types::block::ChainBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSelection<'a> {
    /// The ledger returned no blocks at all.
    Empty,
    /// The last block is the genesis block; nothing to invoke.
    Genesis(&'a ChainBlock),
    /// The last block carries an invocation payload.
    Relevant(&'a ChainBlock),
}

impl<'a> BlockSelection<'a> {
    pub fn relevant(&self) -> Option<&'a ChainBlock> {
        match self {
            BlockSelection::Relevant(block) => Some(block),
            _ => None,
        }
    }
}

pub fn select_relevant_block(blocks: &[ChainBlock]) -> BlockSelection<'_> {
    match blocks.last() {
        None => BlockSelection::Empty,
        Some(block) if block.is_genesis() => BlockSelection::Genesis(block),
        Some(block) => BlockSelection::Relevant(block),
    }
}

//! Basic Block Management
//!
//! A basic block is an ordered instruction sequence owned by a function.
//! A well-formed block ends in exactly one terminator; a block without
//! one is valid only transiently during construction and is rejected by
//! the verifier.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::function::FuncId;
use crate::instructions::InstrId;

/// Handle to a basic block in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Basic block record. Names need not be unique within a function; the
/// printer disambiguates labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    pub func: FuncId,
    pub instrs: Vec<InstrId>,
}

impl Context {
    pub fn block_name(&self, block: BlockId) -> &str {
        &self.blocks[block.idx()].name
    }

    pub fn block_func(&self, block: BlockId) -> FuncId {
        self.blocks[block.idx()].func
    }

    pub fn block_instrs(&self, block: BlockId) -> &[InstrId] {
        &self.blocks[block.idx()].instrs
    }

    pub fn block_has_terminator(&self, block: BlockId) -> bool {
        self.block_terminator(block).is_some()
    }

    /// The block's final instruction, if it is a terminator.
    pub fn block_terminator(&self, block: BlockId) -> Option<InstrId> {
        let last = *self.blocks[block.idx()].instrs.last()?;
        self.instr_kind(last).is_terminator().then_some(last)
    }
}

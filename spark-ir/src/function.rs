//! Function Definitions
//!
//! A function owns an ordered block list forming its control-flow graph.
//! Zero blocks makes it a declaration; one or more makes it a
//! definition. Block append order is layout order and implies nothing
//! about reachability.

use serde::{Deserialize, Serialize};
use spark_common::IrError;

use crate::blocks::{BasicBlock, BlockId};
use crate::context::Context;
use crate::module::ModuleId;
use crate::types::{Type, TypeId};
use crate::values::ValueId;

/// Handle to a function in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Function record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Always a `Type::Function`
    pub ty: TypeId,
    /// One argument value per parameter, in declaration order
    pub args: Vec<ValueId>,
    /// Layout order = append order
    pub blocks: Vec<BlockId>,
    pub module: ModuleId,
}

impl Context {
    /// Append a new empty block to the function and return its handle.
    pub fn append_basic_block(&mut self, func: FuncId, name: &str) -> BlockId {
        let block = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            name: name.to_string(),
            func,
            instrs: Vec::new(),
        });
        self.funcs[func.idx()].blocks.push(block);
        block
    }

    /// Argument value by position.
    pub fn argument(&self, func: FuncId, index: usize) -> Result<ValueId, IrError> {
        let args = &self.funcs[func.idx()].args;
        args.get(index).copied().ok_or(IrError::IndexOutOfRange {
            what: "argument",
            index,
            limit: args.len(),
        })
    }

    pub fn func_name(&self, func: FuncId) -> &str {
        &self.funcs[func.idx()].name
    }

    pub fn func_type(&self, func: FuncId) -> TypeId {
        self.funcs[func.idx()].ty
    }

    pub fn func_return_type(&self, func: FuncId) -> TypeId {
        match self.types.get(self.funcs[func.idx()].ty) {
            Type::Function { ret, .. } => *ret,
            // create_function only accepts function types
            _ => unreachable!("function record carries a non-function type"),
        }
    }

    pub fn func_args(&self, func: FuncId) -> &[ValueId] {
        &self.funcs[func.idx()].args
    }

    pub fn func_blocks(&self, func: FuncId) -> &[BlockId] {
        &self.funcs[func.idx()].blocks
    }

    /// A function with no blocks is a pure declaration.
    pub fn func_is_declaration(&self, func: FuncId) -> bool {
        self.funcs[func.idx()].blocks.is_empty()
    }

    pub fn func_module(&self, func: FuncId) -> ModuleId {
        self.funcs[func.idx()].module
    }
}

//! IR Value Representations
//!
//! Anything an instruction can consume or produce is a value: function
//! arguments, integer constants, global addresses, and instruction
//! results. Values live in the context arena; operand references are
//! plain handles, so a value's lifetime is governed by its owning
//! container, never by the number of uses.

use serde::{Deserialize, Serialize};

use crate::function::FuncId;
use crate::instructions::InstrId;
use crate::module::GlobalId;
use crate::types::TypeId;

/// Handle to a value in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// What a value is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Function argument, immutable apart from its display name
    Argument { func: FuncId, index: u32 },

    /// Constant integer from the context pool
    ConstInt { value: i64 },

    /// Address of a global variable
    Global(GlobalId),

    /// Result of an instruction
    Instruction(InstrId),
}

/// A value record: kind, static type, and optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueData {
    pub kind: ValueKind,
    pub ty: TypeId,
    pub name: Option<String>,
}

//! IR Instructions
//!
//! Defines the closed instruction variant set. Each instruction is owned
//! by exactly one basic block; operand references are non-owning value
//! handles.

use serde::{Deserialize, Serialize};
use spark_common::IrError;

use crate::blocks::BlockId;
use crate::context::Context;
use crate::function::FuncId;
use crate::ops::{BinaryOp, CmpPredicate};
use crate::types::TypeId;
use crate::values::{ValueId, ValueKind};

/// Handle to an instruction in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrId(pub(crate) u32);

impl InstrId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// IR instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    /// Binary arithmetic: result = op lhs, rhs
    Binary {
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Integer compare: result = icmp pred lhs, rhs (result is i1)
    Cmp {
        pred: CmpPredicate,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Load from memory: result = load ty, ptr
    Load { ptr: ValueId, ty: TypeId },

    /// Store to memory: store value, ptr
    Store { value: ValueId, ptr: ValueId },

    /// Pointer to a struct field, no dereference:
    /// result = getelementptr struct_ty, base, index
    StructGep {
        struct_ty: TypeId,
        base: ValueId,
        index: u32,
    },

    /// Pointer to an array element, no dereference. The index is a
    /// runtime integer value, so it is not range-checked:
    /// result = getelementptr array_ty, base, index
    ArrayGep {
        array_ty: TypeId,
        base: ValueId,
        index: ValueId,
    },

    /// Direct call: result = call callee(args...). Void callees
    /// produce no result.
    Call {
        callee: FuncId,
        args: Vec<ValueId>,
    },

    /// Allocate a stack slot: result = alloca ty (result is ty*)
    Alloca { ty: TypeId },

    /// Phi node: result = phi ty [val, pred], ...
    Phi {
        ty: TypeId,
        incoming: Vec<(ValueId, BlockId)>,
    },

    /// Unconditional branch: br target
    Br { target: BlockId },

    /// Conditional branch: br cond, then_block, else_block
    CondBr {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },

    /// Return: ret value or ret void
    Ret { value: Option<ValueId> },
}

impl InstrKind {
    /// Terminators end control flow in a block and produce no result.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstrKind::Br { .. } | InstrKind::CondBr { .. } | InstrKind::Ret { .. }
        )
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            InstrKind::Binary { op, .. } => match op {
                BinaryOp::Add => "add",
                BinaryOp::Sub => "sub",
                BinaryOp::Mul => "mul",
            },
            InstrKind::Cmp { .. } => "icmp",
            InstrKind::Load { .. } => "load",
            InstrKind::Store { .. } => "store",
            InstrKind::StructGep { .. } | InstrKind::ArrayGep { .. } => "getelementptr",
            InstrKind::Call { .. } => "call",
            InstrKind::Alloca { .. } => "alloca",
            InstrKind::Phi { .. } => "phi",
            InstrKind::Br { .. } | InstrKind::CondBr { .. } => "br",
            InstrKind::Ret { .. } => "ret",
        }
    }

    /// All value operands, in a stable order.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            InstrKind::Binary { lhs, rhs, .. } | InstrKind::Cmp { lhs, rhs, .. } => {
                vec![*lhs, *rhs]
            }
            InstrKind::Load { ptr, .. } => vec![*ptr],
            InstrKind::Store { value, ptr } => vec![*value, *ptr],
            InstrKind::StructGep { base, .. } => vec![*base],
            InstrKind::ArrayGep { base, index, .. } => vec![*base, *index],
            InstrKind::Call { args, .. } => args.clone(),
            InstrKind::Alloca { .. } => Vec::new(),
            InstrKind::Phi { incoming, .. } => incoming.iter().map(|(v, _)| *v).collect(),
            InstrKind::Br { .. } => Vec::new(),
            InstrKind::CondBr { cond, .. } => vec![*cond],
            InstrKind::Ret { value } => value.iter().copied().collect(),
        }
    }

    /// Successor blocks of a terminator; empty for non-branches.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            InstrKind::Br { target } => vec![*target],
            InstrKind::CondBr {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            _ => Vec::new(),
        }
    }
}

/// An instruction record: kind, owning block, optional result value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrData {
    pub kind: InstrKind,
    pub block: BlockId,
    pub result: Option<ValueId>,
}

impl Context {
    pub fn instr_kind(&self, instr: InstrId) -> &InstrKind {
        &self.instrs[instr.idx()].kind
    }

    pub fn instr_block(&self, instr: InstrId) -> BlockId {
        self.instrs[instr.idx()].block
    }

    pub fn instr_result(&self, instr: InstrId) -> Option<ValueId> {
        self.instrs[instr.idx()].result
    }

    /// Append an incoming edge to a phi node. The value must match the
    /// phi's type; whether the edges agree with the owning block's
    /// predecessors is the verifier's business, not checked here.
    pub fn add_incoming(
        &mut self,
        phi: ValueId,
        value: ValueId,
        pred: BlockId,
    ) -> Result<(), IrError> {
        let instr = match self.value_kind(phi) {
            ValueKind::Instruction(instr) => *instr,
            _ => {
                return Err(IrError::TypeMismatch {
                    message: "add_incoming target is not a phi node".to_string(),
                })
            }
        };
        let phi_ty = match self.instr_kind(instr) {
            InstrKind::Phi { ty, .. } => *ty,
            _ => {
                return Err(IrError::TypeMismatch {
                    message: "add_incoming target is not a phi node".to_string(),
                })
            }
        };
        let value_ty = self.value_type(value);
        if value_ty != phi_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "phi has type {} but incoming value has type {}",
                    self.types.render(phi_ty),
                    self.types.render(value_ty)
                ),
            });
        }
        if let InstrKind::Phi { incoming, .. } = &mut self.instrs[instr.idx()].kind {
            incoming.push((value, pred));
        }
        Ok(())
    }
}

//! IR Builder
//!
//! A stateful cursor over "current insertion block", appending at the
//! end of that block. Operand types are validated at emission time, not
//! deferred to verification: the checks are local and cheap, and eager
//! failure points at the misuse site. A failed emission appends
//! nothing.
//!
//! The cursor is explicit state owned by the builder value; independent
//! construction tasks use independent builders (serialized through
//! `&mut Context`). Terminator-creating calls do not move the cursor,
//! and emitting into an already-terminated block fails with
//! `AppendAfterTerminator`.

use log::{debug, trace};
use spark_common::IrError;

use crate::blocks::BlockId;
use crate::context::Context;
use crate::function::FuncId;
use crate::instructions::{InstrData, InstrId, InstrKind};
use crate::ops::{BinaryOp, CmpPredicate};
use crate::types::{Type, TypeId};
use crate::values::{ValueId, ValueKind};

/// Builder for constructing IR
pub struct Builder<'ctx> {
    ctx: &'ctx mut Context,
    block: Option<BlockId>,
}

impl<'ctx> Builder<'ctx> {
    pub fn new(ctx: &'ctx mut Context) -> Self {
        Self { ctx, block: None }
    }

    /// Reposition the cursor to the end of `block`.
    pub fn set_insert_point(&mut self, block: BlockId) {
        debug!(
            "insert point -> block '{}' in @{}",
            self.ctx.block_name(block),
            self.ctx.func_name(self.ctx.block_func(block))
        );
        self.block = Some(block);
    }

    /// Current insertion block, if one has been set.
    pub fn insert_block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn context(&self) -> &Context {
        self.ctx
    }

    // ---- arithmetic and compares -------------------------------------

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.binary(BinaryOp::Add, lhs, rhs, name)
    }

    pub fn sub(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.binary(BinaryOp::Sub, lhs, rhs, name)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> Result<ValueId, IrError> {
        self.binary(BinaryOp::Mul, lhs, rhs, name)
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        let ty = self.matching_int_operands(op.to_string(), lhs, rhs)?;
        Ok(self.push_with_result(block, InstrKind::Binary { op, lhs, rhs }, ty, name))
    }

    /// Integer compare producing an i1.
    pub fn icmp(
        &mut self,
        pred: CmpPredicate,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        self.matching_int_operands(format!("icmp {pred}"), lhs, rhs)?;
        let i1 = self.ctx.i1_type();
        Ok(self.push_with_result(block, InstrKind::Cmp { pred, lhs, rhs }, i1, name))
    }

    /// Signed greater-than compare.
    pub fn icmp_sgt(
        &mut self,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        self.icmp(CmpPredicate::Sgt, lhs, rhs, name)
    }

    // ---- memory ------------------------------------------------------

    pub fn load(&mut self, ty: TypeId, ptr: ValueId, name: &str) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        let (pointee, _) = self.pointer_operand("load", ptr)?;
        if pointee != ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "load of {} through a pointer to {}",
                    self.ctx.types.render(ty),
                    self.ctx.types.render(pointee)
                ),
            });
        }
        Ok(self.push_with_result(block, InstrKind::Load { ptr, ty }, ty, name))
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId) -> Result<InstrId, IrError> {
        let block = self.check_can_append()?;
        let (pointee, _) = self.pointer_operand("store", ptr)?;
        let value_ty = self.ctx.value_type(value);
        if pointee != value_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "store of {} through a pointer to {}",
                    self.ctx.types.render(value_ty),
                    self.ctx.types.render(pointee)
                ),
            });
        }
        Ok(self.push(block, InstrKind::Store { value, ptr }, None))
    }

    /// Pointer to field `index` of a struct, without dereferencing. The
    /// result pointer keeps the base pointer's address space.
    pub fn struct_gep(
        &mut self,
        struct_ty: TypeId,
        base: ValueId,
        index: u32,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        let fields = self.ctx.types.struct_fields(struct_ty)?;
        let limit = fields.len();
        let field_ty = match fields.get(index as usize) {
            Some(&ty) => ty,
            None => {
                return Err(IrError::IndexOutOfRange {
                    what: "struct field",
                    index: index as usize,
                    limit,
                })
            }
        };
        let (pointee, addr_space) = self.pointer_operand("getelementptr", base)?;
        if pointee != struct_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "getelementptr of {} through a pointer to {}",
                    self.ctx.types.render(struct_ty),
                    self.ctx.types.render(pointee)
                ),
            });
        }
        let result_ty = self.ctx.types.ptr_type(field_ty, addr_space);
        Ok(self.push_with_result(
            block,
            InstrKind::StructGep {
                struct_ty,
                base,
                index,
            },
            result_ty,
            name,
        ))
    }

    /// Pointer to element `index` of an array, without dereferencing.
    /// The index is a runtime integer value; the result pointer keeps
    /// the base pointer's address space.
    pub fn array_gep(
        &mut self,
        array_ty: TypeId,
        base: ValueId,
        index: ValueId,
        name: &str,
    ) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        let elem = match self.ctx.types.get(array_ty) {
            Type::Array { elem, .. } => *elem,
            _ => {
                return Err(IrError::TypeMismatch {
                    message: format!(
                        "getelementptr needs an array type, got {}",
                        self.ctx.types.render(array_ty)
                    ),
                })
            }
        };
        let (pointee, addr_space) = self.pointer_operand("getelementptr", base)?;
        if pointee != array_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "getelementptr of {} through a pointer to {}",
                    self.ctx.types.render(array_ty),
                    self.ctx.types.render(pointee)
                ),
            });
        }
        let index_ty = self.ctx.value_type(index);
        if !self.ctx.types.is_integer(index_ty) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "array index must be an integer, got {}",
                    self.ctx.types.render(index_ty)
                ),
            });
        }
        let result_ty = self.ctx.types.ptr_type(elem, addr_space);
        Ok(self.push_with_result(
            block,
            InstrKind::ArrayGep {
                array_ty,
                base,
                index,
            },
            result_ty,
            name,
        ))
    }

    /// Stack allocation of one `ty`; the result is a `ty*` in address
    /// space 0. `ty` must be sized.
    pub fn alloca(&mut self, ty: TypeId, name: &str) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        self.ctx.types.size_in_bytes(ty)?;
        let result_ty = self.ctx.types.ptr_type(ty, 0);
        Ok(self.push_with_result(block, InstrKind::Alloca { ty }, result_ty, name))
    }

    // ---- calls -------------------------------------------------------

    /// Direct call to `callee`, which may be a declaration. Argument
    /// types are checked against the callee's parameters; a vararg
    /// callee accepts extra arguments past them, unchecked. Returns
    /// `None` for a void callee.
    pub fn call(
        &mut self,
        callee: FuncId,
        args: &[ValueId],
        name: &str,
    ) -> Result<Option<ValueId>, IrError> {
        let block = self.check_can_append()?;
        let (ret, params, vararg) = match self.ctx.types.get(self.ctx.func_type(callee)) {
            Type::Function {
                ret,
                params,
                vararg,
            } => (*ret, params.clone(), *vararg),
            // create_function only accepts function types
            _ => unreachable!("function record carries a non-function type"),
        };
        if args.len() < params.len() || (!vararg && args.len() != params.len()) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "call to '@{}' expects {} argument(s), got {}",
                    self.ctx.func_name(callee),
                    params.len(),
                    args.len()
                ),
            });
        }
        for (i, (&arg, &param)) in args.iter().zip(params.iter()).enumerate() {
            let arg_ty = self.ctx.value_type(arg);
            if arg_ty != param {
                return Err(IrError::TypeMismatch {
                    message: format!(
                        "call to '@{}': argument {i} has type {}, parameter expects {}",
                        self.ctx.func_name(callee),
                        self.ctx.types.render(arg_ty),
                        self.ctx.types.render(param)
                    ),
                });
            }
        }
        let kind = InstrKind::Call {
            callee,
            args: args.to_vec(),
        };
        if matches!(self.ctx.types.get(ret), Type::Void) {
            self.push(block, kind, None);
            Ok(None)
        } else {
            Ok(Some(self.push_with_result(block, kind, ret, name)))
        }
    }

    // ---- phi ---------------------------------------------------------

    /// A phi with no incoming edges yet; edges are added with
    /// `add_incoming`, one per predecessor.
    pub fn phi(&mut self, ty: TypeId, name: &str) -> Result<ValueId, IrError> {
        let block = self.check_can_append()?;
        if matches!(self.ctx.types.get(ty), Type::Void) {
            return Err(IrError::TypeMismatch {
                message: "phi cannot produce void".to_string(),
            });
        }
        Ok(self.push_with_result(
            block,
            InstrKind::Phi {
                ty,
                incoming: Vec::new(),
            },
            ty,
            name,
        ))
    }

    pub fn add_incoming(
        &mut self,
        phi: ValueId,
        value: ValueId,
        pred: BlockId,
    ) -> Result<(), IrError> {
        self.ctx.add_incoming(phi, value, pred)
    }

    // ---- terminators -------------------------------------------------

    pub fn br(&mut self, target: BlockId) -> Result<InstrId, IrError> {
        let block = self.check_can_append()?;
        Ok(self.push(block, InstrKind::Br { target }, None))
    }

    pub fn cond_br(
        &mut self,
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<InstrId, IrError> {
        let block = self.check_can_append()?;
        let cond_ty = self.ctx.value_type(cond);
        if !matches!(self.ctx.types.get(cond_ty), Type::Int(1)) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "branch condition must be i1, got {}",
                    self.ctx.types.render(cond_ty)
                ),
            });
        }
        Ok(self.push(
            block,
            InstrKind::CondBr {
                cond,
                then_block,
                else_block,
            },
            None,
        ))
    }

    pub fn ret(&mut self, value: ValueId) -> Result<InstrId, IrError> {
        let block = self.check_can_append()?;
        let ret_ty = self.ctx.func_return_type(self.ctx.block_func(block));
        if matches!(self.ctx.types.get(ret_ty), Type::Void) {
            return Err(IrError::TypeMismatch {
                message: "returning a value from a void function".to_string(),
            });
        }
        let value_ty = self.ctx.value_type(value);
        if value_ty != ret_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "function returns {} but ret operand has type {}",
                    self.ctx.types.render(ret_ty),
                    self.ctx.types.render(value_ty)
                ),
            });
        }
        Ok(self.push(block, InstrKind::Ret { value: Some(value) }, None))
    }

    pub fn ret_void(&mut self) -> Result<InstrId, IrError> {
        let block = self.check_can_append()?;
        let ret_ty = self.ctx.func_return_type(self.ctx.block_func(block));
        if !matches!(self.ctx.types.get(ret_ty), Type::Void) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "ret void in a function returning {}",
                    self.ctx.types.render(ret_ty)
                ),
            });
        }
        Ok(self.push(block, InstrKind::Ret { value: None }, None))
    }

    // ---- internals ---------------------------------------------------

    /// The block the next instruction would land in, or the error that
    /// makes appending impossible. All operand checks run after this
    /// and before anything is allocated.
    fn check_can_append(&self) -> Result<BlockId, IrError> {
        let block = self.block.ok_or(IrError::NoInsertPoint)?;
        if self.ctx.block_has_terminator(block) {
            return Err(IrError::AppendAfterTerminator {
                block: self.ctx.block_name(block).to_string(),
            });
        }
        Ok(block)
    }

    fn matching_int_operands(
        &self,
        op: String,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<TypeId, IrError> {
        let lhs_ty = self.ctx.value_type(lhs);
        let rhs_ty = self.ctx.value_type(rhs);
        if lhs_ty != rhs_ty {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "{op} operands disagree: {} vs {}",
                    self.ctx.types.render(lhs_ty),
                    self.ctx.types.render(rhs_ty)
                ),
            });
        }
        if !self.ctx.types.is_integer(lhs_ty) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "{op} needs integer operands, got {}",
                    self.ctx.types.render(lhs_ty)
                ),
            });
        }
        Ok(lhs_ty)
    }

    fn pointer_operand(&self, op: &str, ptr: ValueId) -> Result<(TypeId, u32), IrError> {
        let ptr_ty = self.ctx.value_type(ptr);
        self.ctx.types.pointee(ptr_ty).ok_or_else(|| IrError::TypeMismatch {
            message: format!(
                "{op} needs a pointer operand, got {}",
                self.ctx.types.render(ptr_ty)
            ),
        })
    }

    /// Append an already-validated instruction that produces a value,
    /// allocating and naming its result.
    fn push_with_result(
        &mut self,
        block: BlockId,
        kind: InstrKind,
        result_ty: TypeId,
        name: &str,
    ) -> ValueId {
        let instr = InstrId(self.ctx.instrs.len() as u32);
        let result = self.ctx.alloc_value(ValueKind::Instruction(instr), result_ty);
        if !name.is_empty() {
            self.ctx.set_value_name(result, name);
        }
        self.push(block, kind, Some(result));
        result
    }

    /// Append an already-validated instruction.
    fn push(&mut self, block: BlockId, kind: InstrKind, result: Option<ValueId>) -> InstrId {
        let instr = InstrId(self.ctx.instrs.len() as u32);
        trace!(
            "append {} to block '{}'",
            kind.mnemonic(),
            self.ctx.block_name(block)
        );
        self.ctx.instrs.push(InstrData {
            kind,
            block,
            result,
        });
        self.ctx.blocks[block.idx()].instrs.push(instr);
        instr
    }
}

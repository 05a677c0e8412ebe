//! Module Verifier
//!
//! Read-only structural checker. Walks a module and collects one
//! diagnostic per violation instead of stopping at the first failure:
//! independent violations co-exist and should all surface in one pass.
//!
//! Checked rules:
//! 1. every block of a defined function ends in exactly one terminator,
//!    positioned last;
//! 2. each phi's incoming edges match the owning block's computed
//!    predecessor set exactly, and phis are grouped at the block head;
//! 3. operand types agree with each instruction's contract;
//! 4. best-effort def-before-use: operands must be defined in the
//!    enclosing function, and a non-phi use may not precede its
//!    definition within the same block. Full dominance checking is out
//!    of scope.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, trace};
use spark_common::Diagnostic;

use crate::blocks::BlockId;
use crate::context::Context;
use crate::function::FuncId;
use crate::instructions::{InstrId, InstrKind};
use crate::module::ModuleId;
use crate::types::Type;
use crate::values::{ValueId, ValueKind};

/// Outcome of verification: success, or every violation found.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerifierReport {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Display for VerifierReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "module is well-formed");
        }
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}

/// Verify a module. Never mutates it, including on failure.
pub fn verify_module(ctx: &Context, module: ModuleId) -> VerifierReport {
    debug!("verifying module '{}'", ctx.module_name(module));
    let mut diags = Vec::new();
    for &func in ctx.module_functions(module) {
        // A function without blocks is a valid declaration.
        if ctx.func_is_declaration(func) {
            continue;
        }
        verify_function(ctx, func, &mut diags);
    }
    VerifierReport { diagnostics: diags }
}

fn verify_function(ctx: &Context, func: FuncId, diags: &mut Vec<Diagnostic>) {
    trace!("verifying function @{}", ctx.func_name(func));

    // Position of every instruction of this function, for local
    // def-before-use checks.
    let mut position: HashMap<InstrId, (BlockId, usize)> = HashMap::new();
    for &block in ctx.func_blocks(func) {
        for (idx, &instr) in ctx.block_instrs(block).iter().enumerate() {
            position.insert(instr, (block, idx));
        }
    }

    // Predecessor sets, derived from every branch in the function.
    let mut preds: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
    for &block in ctx.func_blocks(func) {
        preds.entry(block).or_default();
    }
    for &block in ctx.func_blocks(func) {
        for &instr in ctx.block_instrs(block) {
            for succ in ctx.instr_kind(instr).successors() {
                preds.entry(succ).or_default().insert(block);
            }
        }
    }

    for &block in ctx.func_blocks(func) {
        check_terminator_placement(ctx, func, block, diags);
        check_phi_grouping(ctx, func, block, diags);
        for (idx, &instr) in ctx.block_instrs(block).iter().enumerate() {
            check_instr_types(ctx, func, block, idx, instr, diags);
            check_branch_targets(ctx, func, block, idx, instr, diags);
            check_operand_defs(ctx, func, block, idx, instr, &position, diags);
            if let InstrKind::Phi { incoming, .. } = ctx.instr_kind(instr) {
                check_phi_edges(ctx, func, block, idx, incoming, &preds[&block], diags);
            }
        }
    }
}

/// Rule 1: exactly one terminator, last.
fn check_terminator_placement(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    diags: &mut Vec<Diagnostic>,
) {
    let instrs = ctx.block_instrs(block);
    let mut found_any = false;
    for (idx, &instr) in instrs.iter().enumerate() {
        if ctx.instr_kind(instr).is_terminator() {
            found_any = true;
            if idx != instrs.len() - 1 {
                diags.push(Diagnostic::error(format!(
                    "{}: terminator is not the last instruction in the block",
                    site(ctx, func, block, Some((idx, instr)))
                )));
            }
        }
    }
    if !found_any {
        diags.push(Diagnostic::error(format!(
            "{}: block has no terminator",
            site(ctx, func, block, None)
        )));
    }
}

/// Rule 2 (placement half): phis precede all non-phi instructions.
fn check_phi_grouping(ctx: &Context, func: FuncId, block: BlockId, diags: &mut Vec<Diagnostic>) {
    let mut seen_non_phi = false;
    for (idx, &instr) in ctx.block_instrs(block).iter().enumerate() {
        if matches!(ctx.instr_kind(instr), InstrKind::Phi { .. }) {
            if seen_non_phi {
                diags.push(Diagnostic::error(format!(
                    "{}: phi is not grouped at the head of the block",
                    site(ctx, func, block, Some((idx, instr)))
                )));
            }
        } else {
            seen_non_phi = true;
        }
    }
}

/// Rule 2 (edge half): incoming edges == predecessor set, exactly.
/// One diagnostic per broken phi, with one note per discrepancy.
fn check_phi_edges(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    idx: usize,
    incoming: &[(ValueId, BlockId)],
    preds: &HashSet<BlockId>,
    diags: &mut Vec<Diagnostic>,
) {
    let mut notes = Vec::new();
    let mut seen: HashSet<BlockId> = HashSet::new();
    for &(_, pred) in incoming {
        if !seen.insert(pred) {
            notes.push(format!(
                "duplicate incoming edge for block '{}'",
                ctx.block_name(pred)
            ));
        } else if !preds.contains(&pred) {
            notes.push(format!(
                "incoming edge for non-predecessor block '{}'",
                ctx.block_name(pred)
            ));
        }
    }
    for &pred in preds {
        if !seen.contains(&pred) {
            notes.push(format!(
                "no incoming edge for predecessor block '{}'",
                ctx.block_name(pred)
            ));
        }
    }
    if notes.is_empty() {
        return;
    }
    notes.sort();
    let mut diag = Diagnostic::error(format!(
        "{}: phi incoming edges do not match the block's predecessors",
        site(ctx, func, block, Some((idx, instr_at(ctx, block, idx))))
    ));
    for note in notes {
        diag = diag.with_note(note);
    }
    diags.push(diag);
}

/// Rule 3: operand types against each instruction's contract.
fn check_instr_types(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    idx: usize,
    instr: InstrId,
    diags: &mut Vec<Diagnostic>,
) {
    let mut fail = |message: String| {
        diags.push(Diagnostic::error(format!(
            "{}: {message}",
            site(ctx, func, block, Some((idx, instr)))
        )));
    };

    match ctx.instr_kind(instr) {
        InstrKind::Binary { lhs, rhs, .. } | InstrKind::Cmp { lhs, rhs, .. } => {
            let lhs_ty = ctx.value_type(*lhs);
            let rhs_ty = ctx.value_type(*rhs);
            if lhs_ty != rhs_ty {
                fail(format!(
                    "operand types disagree: {} vs {}",
                    ctx.types.render(lhs_ty),
                    ctx.types.render(rhs_ty)
                ));
            } else if !ctx.types.is_integer(lhs_ty) {
                fail(format!(
                    "needs integer operands, got {}",
                    ctx.types.render(lhs_ty)
                ));
            }
        }
        InstrKind::Load { ptr, ty } => match ctx.types.pointee(ctx.value_type(*ptr)) {
            Some((pointee, _)) if pointee == *ty => {}
            Some((pointee, _)) => fail(format!(
                "load of {} through a pointer to {}",
                ctx.types.render(*ty),
                ctx.types.render(pointee)
            )),
            None => fail(format!(
                "load needs a pointer operand, got {}",
                ctx.types.render(ctx.value_type(*ptr))
            )),
        },
        InstrKind::Store { value, ptr } => {
            let value_ty = ctx.value_type(*value);
            match ctx.types.pointee(ctx.value_type(*ptr)) {
                Some((pointee, _)) if pointee == value_ty => {}
                Some((pointee, _)) => fail(format!(
                    "store of {} through a pointer to {}",
                    ctx.types.render(value_ty),
                    ctx.types.render(pointee)
                )),
                None => fail(format!(
                    "store needs a pointer operand, got {}",
                    ctx.types.render(ctx.value_type(*ptr))
                )),
            }
        }
        InstrKind::StructGep {
            struct_ty,
            base,
            index,
        } => match ctx.types.struct_fields(*struct_ty) {
            Err(err) => fail(err.to_string()),
            Ok(fields) => {
                if *index as usize >= fields.len() {
                    fail(format!(
                        "struct field index {index} out of range (limit {})",
                        fields.len()
                    ));
                }
                match ctx.types.pointee(ctx.value_type(*base)) {
                    Some((pointee, _)) if pointee == *struct_ty => {}
                    _ => fail(format!(
                        "getelementptr base must be a pointer to {}",
                        ctx.types.render(*struct_ty)
                    )),
                }
            }
        },
        InstrKind::ArrayGep {
            array_ty,
            base,
            index,
        } => {
            if !matches!(ctx.types.get(*array_ty), Type::Array { .. }) {
                fail(format!(
                    "getelementptr needs an array type, got {}",
                    ctx.types.render(*array_ty)
                ));
            }
            match ctx.types.pointee(ctx.value_type(*base)) {
                Some((pointee, _)) if pointee == *array_ty => {}
                _ => fail(format!(
                    "getelementptr base must be a pointer to {}",
                    ctx.types.render(*array_ty)
                )),
            }
            if !ctx.types.is_integer(ctx.value_type(*index)) {
                fail(format!(
                    "array index must be an integer, got {}",
                    ctx.types.render(ctx.value_type(*index))
                ));
            }
        }
        InstrKind::Call { callee, args } => match ctx.types.get(ctx.func_type(*callee)) {
            Type::Function { params, vararg, .. } => {
                if args.len() < params.len() || (!vararg && args.len() != params.len()) {
                    fail(format!(
                        "call to '@{}' expects {} argument(s), got {}",
                        ctx.func_name(*callee),
                        params.len(),
                        args.len()
                    ));
                } else {
                    for (i, (&arg, &param)) in args.iter().zip(params.iter()).enumerate() {
                        let arg_ty = ctx.value_type(arg);
                        if arg_ty != param {
                            fail(format!(
                                "call to '@{}': argument {i} has type {}, parameter expects {}",
                                ctx.func_name(*callee),
                                ctx.types.render(arg_ty),
                                ctx.types.render(param)
                            ));
                        }
                    }
                }
            }
            _ => fail(format!(
                "call callee '@{}' does not have a function type",
                ctx.func_name(*callee)
            )),
        },
        InstrKind::Alloca { ty } => {
            if let Err(err) = ctx.types.size_in_bytes(*ty) {
                fail(format!("alloca of an unsized type: {err}"));
            }
        }
        InstrKind::Phi { ty, incoming } => {
            for (value, pred) in incoming {
                let value_ty = ctx.value_type(*value);
                if value_ty != *ty {
                    fail(format!(
                        "incoming value from block '{}' has type {}, phi has type {}",
                        ctx.block_name(*pred),
                        ctx.types.render(value_ty),
                        ctx.types.render(*ty)
                    ));
                }
            }
        }
        InstrKind::Br { .. } => {}
        InstrKind::CondBr { cond, .. } => {
            let cond_ty = ctx.value_type(*cond);
            if !matches!(ctx.types.get(cond_ty), Type::Int(1)) {
                fail(format!(
                    "branch condition must be i1, got {}",
                    ctx.types.render(cond_ty)
                ));
            }
        }
        InstrKind::Ret { value } => {
            let ret_ty = ctx.func_return_type(func);
            match value {
                Some(value) => {
                    let value_ty = ctx.value_type(*value);
                    if value_ty != ret_ty {
                        fail(format!(
                            "function returns {} but ret operand has type {}",
                            ctx.types.render(ret_ty),
                            ctx.types.render(value_ty)
                        ));
                    }
                }
                None => {
                    if !matches!(ctx.types.get(ret_ty), Type::Void) {
                        fail(format!(
                            "ret void in a function returning {}",
                            ctx.types.render(ret_ty)
                        ));
                    }
                }
            }
        }
    }
}

/// Branch targets must be blocks of the enclosing function.
fn check_branch_targets(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    idx: usize,
    instr: InstrId,
    diags: &mut Vec<Diagnostic>,
) {
    for succ in ctx.instr_kind(instr).successors() {
        if ctx.block_func(succ) != func {
            diags.push(Diagnostic::error(format!(
                "{}: branch target '{}' belongs to function '@{}'",
                site(ctx, func, block, Some((idx, instr))),
                ctx.block_name(succ),
                ctx.func_name(ctx.block_func(succ))
            )));
        }
    }
}

/// Rule 4: operands are defined in this function, and non-phi uses do
/// not precede their definition within the same block.
fn check_operand_defs(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    idx: usize,
    instr: InstrId,
    position: &HashMap<InstrId, (BlockId, usize)>,
    diags: &mut Vec<Diagnostic>,
) {
    let is_phi = matches!(ctx.instr_kind(instr), InstrKind::Phi { .. });
    for operand in ctx.instr_kind(instr).operands() {
        let problem = match ctx.value_kind(operand) {
            ValueKind::ConstInt { .. } | ValueKind::Global(_) => None,
            ValueKind::Argument { func: owner, .. } => (*owner != func)
                .then(|| format!("operand is an argument of '@{}'", ctx.func_name(*owner))),
            ValueKind::Instruction(def) => match position.get(def) {
                None => Some(format!(
                    "operand is defined in function '@{}'",
                    ctx.func_name(ctx.block_func(ctx.instr_block(*def)))
                )),
                // Phis may reference values from predecessors freely;
                // anything else may not use a later result of its own
                // block.
                Some(&(def_block, def_idx)) => {
                    (!is_phi && def_block == block && def_idx >= idx)
                        .then(|| "value used before it is defined".to_string())
                }
            },
        };
        if let Some(problem) = problem {
            diags.push(Diagnostic::error(format!(
                "{}: {problem}",
                site(ctx, func, block, Some((idx, instr)))
            )));
        }
    }
}

fn instr_at(ctx: &Context, block: BlockId, idx: usize) -> InstrId {
    ctx.block_instrs(block)[idx]
}

/// Entity path for diagnostics: function, block, instruction position.
fn site(
    ctx: &Context,
    func: FuncId,
    block: BlockId,
    instr: Option<(usize, InstrId)>,
) -> String {
    match instr {
        Some((idx, instr)) => format!(
            "function '@{}', block '{}', instruction {idx} ({})",
            ctx.func_name(func),
            ctx.block_name(block),
            ctx.instr_kind(instr).mnemonic()
        ),
        None => format!(
            "function '@{}', block '{}'",
            ctx.func_name(func),
            ctx.block_name(block)
        ),
    }
}

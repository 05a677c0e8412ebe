//! Textual dump
//!
//! Deterministic, human-readable rendering of modules and functions in
//! an LLVM-flavored syntax. Printing is read-only; unnamed values get
//! per-function positional names (%0, %1, ...) assigned on the fly, and
//! duplicate block names get ".1", ".2" suffixes. Two prints of the
//! same module state are byte-identical.

use std::collections::HashMap;

use crate::blocks::BlockId;
use crate::context::Context;
use crate::function::FuncId;
use crate::instructions::InstrKind;
use crate::module::{Linkage, ModuleId};
use crate::values::{ValueId, ValueKind};

pub(crate) fn print_module(ctx: &Context, module: ModuleId) -> String {
    let mut out = String::new();
    out.push_str(&format!("; ModuleID = '{}'\n", ctx.module_name(module)));

    for &global in ctx.module_globals(module) {
        let g = ctx.global(global);
        let linkage = match g.linkage {
            Linkage::External => "",
            Linkage::Internal => "internal ",
            Linkage::Private => "private ",
        };
        out.push('\n');
        match g.initializer {
            Some(init) => out.push_str(&format!(
                "@{} = {}global {} {}\n",
                g.name,
                linkage,
                ctx.types.render(g.ty),
                render_constant(ctx, init)
            )),
            None => out.push_str(&format!(
                "@{} = external global {}\n",
                g.name,
                ctx.types.render(g.ty)
            )),
        }
    }

    for &func in ctx.module_functions(module) {
        out.push('\n');
        out.push_str(&print_function(ctx, func));
    }
    out
}

pub(crate) fn print_function(ctx: &Context, func: FuncId) -> String {
    let ret = ctx.types.render(ctx.func_return_type(func));
    let name = ctx.func_name(func);

    if ctx.func_is_declaration(func) {
        let params: Vec<String> = ctx
            .func_args(func)
            .iter()
            .map(|&arg| ctx.types.render(ctx.value_type(arg)))
            .collect();
        return format!("declare {ret} @{name}({})\n", params.join(", "));
    }

    let names = Namer::for_function(ctx, func);

    let params: Vec<String> = ctx
        .func_args(func)
        .iter()
        .map(|&arg| {
            format!(
                "{} {}",
                ctx.types.render(ctx.value_type(arg)),
                names.value(arg)
            )
        })
        .collect();

    let mut out = format!("define {ret} @{name}({}) {{\n", params.join(", "));
    for &block in ctx.func_blocks(func) {
        out.push_str(&format!("{}:\n", names.label(block)));
        for &instr in ctx.block_instrs(block) {
            out.push_str("  ");
            out.push_str(&render_instr(ctx, &names, instr));
            out.push('\n');
        }
    }
    out.push_str("}\n");
    out
}

fn render_instr(ctx: &Context, names: &Namer, instr: crate::instructions::InstrId) -> String {
    let result = ctx
        .instr_result(instr)
        .map(|v| format!("{} = ", names.value(v)));
    let result = result.as_deref().unwrap_or("");

    match ctx.instr_kind(instr) {
        InstrKind::Binary { op, lhs, rhs } => format!(
            "{result}{op} {} {}, {}",
            ctx.types.render(ctx.value_type(*lhs)),
            names.operand(ctx, *lhs),
            names.operand(ctx, *rhs)
        ),
        InstrKind::Cmp { pred, lhs, rhs } => format!(
            "{result}icmp {pred} {} {}, {}",
            ctx.types.render(ctx.value_type(*lhs)),
            names.operand(ctx, *lhs),
            names.operand(ctx, *rhs)
        ),
        InstrKind::Load { ptr, ty } => format!(
            "{result}load {}, {} {}",
            ctx.types.render(*ty),
            ctx.types.render(ctx.value_type(*ptr)),
            names.operand(ctx, *ptr)
        ),
        InstrKind::Store { value, ptr } => format!(
            "store {} {}, {} {}",
            ctx.types.render(ctx.value_type(*value)),
            names.operand(ctx, *value),
            ctx.types.render(ctx.value_type(*ptr)),
            names.operand(ctx, *ptr)
        ),
        InstrKind::StructGep {
            struct_ty,
            base,
            index,
        } => format!(
            "{result}getelementptr {}, {} {}, i32 0, i32 {index}",
            ctx.types.render(*struct_ty),
            ctx.types.render(ctx.value_type(*base)),
            names.operand(ctx, *base)
        ),
        InstrKind::ArrayGep {
            array_ty,
            base,
            index,
        } => format!(
            "{result}getelementptr {}, {} {}, i32 0, {} {}",
            ctx.types.render(*array_ty),
            ctx.types.render(ctx.value_type(*base)),
            names.operand(ctx, *base),
            ctx.types.render(ctx.value_type(*index)),
            names.operand(ctx, *index)
        ),
        InstrKind::Call { callee, args } => {
            let mut out = format!(
                "{result}call {} @{}(",
                ctx.types.render(ctx.func_return_type(*callee)),
                ctx.func_name(*callee)
            );
            for (i, &arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!(
                    "{} {}",
                    ctx.types.render(ctx.value_type(arg)),
                    names.operand(ctx, arg)
                ));
            }
            out.push(')');
            out
        }
        InstrKind::Alloca { ty } => format!("{result}alloca {}", ctx.types.render(*ty)),
        InstrKind::Phi { ty, incoming } => {
            let mut out = format!("{result}phi {} ", ctx.types.render(*ty));
            for (i, (value, pred)) in incoming.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!(
                    "[ {}, %{} ]",
                    names.operand(ctx, *value),
                    names.label(*pred)
                ));
            }
            out
        }
        InstrKind::Br { target } => format!("br label %{}", names.label(*target)),
        InstrKind::CondBr {
            cond,
            then_block,
            else_block,
        } => format!(
            "br i1 {}, label %{}, label %{}",
            names.operand(ctx, *cond),
            names.label(*then_block),
            names.label(*else_block)
        ),
        InstrKind::Ret { value: Some(value) } => format!(
            "ret {} {}",
            ctx.types.render(ctx.value_type(*value)),
            names.operand(ctx, *value)
        ),
        InstrKind::Ret { value: None } => "ret void".to_string(),
    }
}

fn render_constant(ctx: &Context, value: ValueId) -> String {
    match ctx.value_kind(value) {
        ValueKind::ConstInt { value } => value.to_string(),
        ValueKind::Global(g) => format!("@{}", ctx.global(*g).name),
        // Not a constant; only reachable by printing an ill-formed
        // module, which still must not panic.
        _ => "<non-constant>".to_string(),
    }
}

/// Per-function naming environment: display names where present,
/// positional %N names otherwise, with duplicates suffixed.
struct Namer {
    values: HashMap<ValueId, String>,
    labels: HashMap<BlockId, String>,
}

impl Namer {
    fn for_function(ctx: &Context, func: FuncId) -> Self {
        let mut values = HashMap::new();
        let mut labels = HashMap::new();
        let mut taken: HashMap<String, u32> = HashMap::new();
        let mut counter = 0u32;

        let mut name_value = |value: ValueId, values: &mut HashMap<ValueId, String>| {
            let name = match ctx.value_name(value) {
                Some(name) => unique(&mut taken, name),
                None => {
                    // Positional names share the namespace with display
                    // names, so an explicit "0" cannot collide with them.
                    let mut n = counter;
                    while taken.contains_key(&n.to_string()) {
                        n += 1;
                    }
                    counter = n + 1;
                    let name = n.to_string();
                    taken.insert(name.clone(), 1);
                    name
                }
            };
            values.insert(value, format!("%{name}"));
        };

        for &arg in ctx.func_args(func) {
            name_value(arg, &mut values);
        }
        for &block in ctx.func_blocks(func) {
            for &instr in ctx.block_instrs(block) {
                if let Some(result) = ctx.instr_result(instr) {
                    name_value(result, &mut values);
                }
            }
        }

        let mut label_taken: HashMap<String, u32> = HashMap::new();
        for &block in ctx.func_blocks(func) {
            let base = ctx.block_name(block);
            let base = if base.is_empty() { "bb" } else { base };
            labels.insert(block, unique(&mut label_taken, base));
        }

        Self { values, labels }
    }

    fn value(&self, value: ValueId) -> &str {
        self.values
            .get(&value)
            .map(String::as_str)
            // An operand from outside this function; ill-formed, but
            // the dump is exactly what one wants while debugging that.
            .unwrap_or("%<foreign>")
    }

    fn operand(&self, ctx: &Context, value: ValueId) -> String {
        match ctx.value_kind(value) {
            ValueKind::ConstInt { value } => value.to_string(),
            ValueKind::Global(g) => format!("@{}", ctx.global(*g).name),
            _ => self.value(value).to_string(),
        }
    }

    fn label(&self, block: BlockId) -> &str {
        self.labels
            .get(&block)
            .map(String::as_str)
            .unwrap_or("<foreign>")
    }
}

/// First use of a name keeps it; later uses get ".1", ".2", ...
fn unique(taken: &mut HashMap<String, u32>, base: &str) -> String {
    let n = taken.entry(base.to_string()).or_insert(0);
    *n += 1;
    if *n == 1 {
        base.to_string()
    } else {
        format!("{base}.{}", *n - 1)
    }
}

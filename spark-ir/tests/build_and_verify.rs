//! End-to-end construction through the public API: a module with
//! arithmetic, control flow, a phi, memory traffic, and struct field
//! access, verified and dumped.

use spark_ir::{Builder, Context, IrError};

#[test]
fn build_max_with_phi() {
    let mut ctx = Context::new();
    let i32t = ctx.i32_type();
    let fn_ty = ctx.function_type(i32t, vec![i32t, i32t], false);
    let module = ctx.create_module("control_flow");
    let func = ctx.create_function(module, "max", fn_ty).unwrap();

    let entry = ctx.append_basic_block(func, "entry");
    let then_bb = ctx.append_basic_block(func, "then");
    let else_bb = ctx.append_basic_block(func, "else");
    let exit = ctx.append_basic_block(func, "return");

    let a = ctx.argument(func, 0).unwrap();
    let b = ctx.argument(func, 1).unwrap();
    ctx.set_value_name(a, "a");
    ctx.set_value_name(b, "b");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(entry);
    let cmp = builder.icmp_sgt(a, b, "cmp").unwrap();
    builder.cond_br(cmp, then_bb, else_bb).unwrap();

    builder.set_insert_point(then_bb);
    builder.br(exit).unwrap();

    builder.set_insert_point(else_bb);
    builder.br(exit).unwrap();

    builder.set_insert_point(exit);
    let result = builder.phi(i32t, "result").unwrap();
    builder.add_incoming(result, a, then_bb).unwrap();
    builder.add_incoming(result, b, else_bb).unwrap();
    builder.ret(result).unwrap();

    let report = ctx.verify(module);
    assert!(report.is_ok(), "{report}");

    let dump = ctx.print_module(module);
    assert!(dump.contains("define i32 @max(i32 %a, i32 %b) {"));
    assert!(dump.contains("%cmp = icmp sgt i32 %a, %b"));
    assert!(dump.contains("br i1 %cmp, label %then, label %else"));
    assert!(dump.contains("%result = phi i32 [ %a, %then ], [ %b, %else ]"));
    assert!(dump.contains("ret i32 %result"));
}

#[test]
fn phi_against_wrong_block_fails_verification() {
    let mut ctx = Context::new();
    let i32t = ctx.i32_type();
    let fn_ty = ctx.function_type(i32t, vec![i32t, i32t], false);
    let module = ctx.create_module("m");
    let func = ctx.create_function(module, "pick", fn_ty).unwrap();

    let entry = ctx.append_basic_block(func, "entry");
    let then_bb = ctx.append_basic_block(func, "then");
    let else_bb = ctx.append_basic_block(func, "else");
    let exit = ctx.append_basic_block(func, "exit");

    let a = ctx.argument(func, 0).unwrap();
    let b = ctx.argument(func, 1).unwrap();

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(entry);
    let cmp = builder.icmp_sgt(a, b, "cmp").unwrap();
    builder.cond_br(cmp, then_bb, else_bb).unwrap();
    builder.set_insert_point(then_bb);
    builder.br(exit).unwrap();
    builder.set_insert_point(else_bb);
    builder.br(exit).unwrap();

    builder.set_insert_point(exit);
    let result = builder.phi(i32t, "result").unwrap();
    builder.add_incoming(result, a, then_bb).unwrap();
    // Points at the entry block, which is not a predecessor of exit.
    builder.add_incoming(result, b, entry).unwrap();
    builder.ret(result).unwrap();

    let report = ctx.verify(module);
    assert_eq!(report.diagnostics.len(), 1);
    let rendered = report.to_string();
    assert!(rendered.contains("phi incoming edges"), "{rendered}");
    assert!(rendered.contains("non-predecessor block 'entry'"), "{rendered}");
    assert!(rendered.contains("no incoming edge for predecessor block 'else'"), "{rendered}");
}

#[test]
fn terminator_misuse_is_caught_eagerly() {
    let mut ctx = Context::new();
    let void = ctx.void_type();
    let fn_ty = ctx.function_type(void, vec![], false);
    let module = ctx.create_module("m");
    let func = ctx.create_function(module, "f", fn_ty).unwrap();
    let entry = ctx.append_basic_block(func, "entry");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(entry);
    builder.ret_void().unwrap();

    let err = builder.ret_void().unwrap_err();
    assert!(matches!(err, IrError::AppendAfterTerminator { .. }));
    assert_eq!(
        err.to_string(),
        "cannot append to block 'entry': it already has a terminator"
    );
}

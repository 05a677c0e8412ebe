//! Builds a small module end to end and prints its dump and the
//! verifier's report. Run with `RUST_LOG=trace` to watch the builder
//! emit instruction by instruction.

use spark_ir::{Builder, Context, IrError};

fn main() -> Result<(), IrError> {
    env_logger::init();

    let mut ctx = Context::new();
    let module = ctx.create_module("my_first_module");

    // A named struct: { float, i8, [50 x i8], i8* }
    let i8t = ctx.i8_type();
    let float = ctx.float_type();
    let i8p = ctx.ptr_type(i8t, 0);
    let name_ty = ctx.array_type(i8t, 50);
    let person = ctx.named_struct_type("struct.Person");
    ctx.set_struct_body(person, vec![float, i8t, name_ty, i8p])?;
    println!("person type: {}", ctx.render_type(person));
    println!("person size: {} bytes", ctx.type_size_in_bytes(person)?);

    // int32 add_numbers(int32 a, int32 b)
    let i32t = ctx.i32_type();
    let add_ty = ctx.function_type(i32t, vec![i32t, i32t], false);
    let add_fn = ctx.create_function(module, "add_numbers", add_ty)?;
    let entry = ctx.append_basic_block(add_fn, "entry");
    let ret_block = ctx.append_basic_block(add_fn, "return");
    let a = ctx.argument(add_fn, 0)?;
    let b = ctx.argument(add_fn, 1)?;
    ctx.set_value_name(a, "a");
    ctx.set_value_name(b, "b");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(entry);
    let sum = builder.add(a, b, "sum")?;
    builder.br(ret_block)?;
    builder.set_insert_point(ret_block);
    builder.ret(sum)?;

    // int32 max(int32 a, int32 b), via a conditional branch and a phi
    let max_fn = ctx.create_function(module, "max", add_ty)?;
    let max_entry = ctx.append_basic_block(max_fn, "entry");
    let then_bb = ctx.append_basic_block(max_fn, "then");
    let else_bb = ctx.append_basic_block(max_fn, "else");
    let max_ret = ctx.append_basic_block(max_fn, "return");
    let a = ctx.argument(max_fn, 0)?;
    let b = ctx.argument(max_fn, 1)?;
    ctx.set_value_name(a, "a");
    ctx.set_value_name(b, "b");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(max_entry);
    let cmp = builder.icmp_sgt(a, b, "cmp")?;
    builder.cond_br(cmp, then_bb, else_bb)?;
    builder.set_insert_point(then_bb);
    builder.br(max_ret)?;
    builder.set_insert_point(else_bb);
    builder.br(max_ret)?;
    builder.set_insert_point(max_ret);
    let result = builder.phi(i32t, "result")?;
    builder.add_incoming(result, a, then_bb)?;
    builder.add_incoming(result, b, else_bb)?;
    builder.ret(result)?;

    // void swap(int32* a_ptr, int32* b_ptr)
    let void = ctx.void_type();
    let i32p = ctx.ptr_type(i32t, 0);
    let swap_ty = ctx.function_type(void, vec![i32p, i32p], false);
    let swap_fn = ctx.create_function(module, "swap", swap_ty)?;
    let swap_entry = ctx.append_basic_block(swap_fn, "entry");
    let a_ptr = ctx.argument(swap_fn, 0)?;
    let b_ptr = ctx.argument(swap_fn, 1)?;
    ctx.set_value_name(a_ptr, "a_ptr");
    ctx.set_value_name(b_ptr, "b_ptr");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(swap_entry);
    let val_a = builder.load(i32t, a_ptr, "val_a")?;
    let val_b = builder.load(i32t, b_ptr, "val_b")?;
    builder.store(val_a, b_ptr)?;
    builder.store(val_b, a_ptr)?;
    builder.ret_void()?;

    // int32 sumPair(struct.IntPair* pair_ptr), via struct field access
    let pair = ctx.named_struct_type("struct.IntPair");
    ctx.set_struct_body(pair, vec![i32t, i32t])?;
    let pair_ptr_ty = ctx.ptr_type(pair, 0);
    let sum_pair_ty = ctx.function_type(i32t, vec![pair_ptr_ty], false);
    let sum_pair_fn = ctx.create_function(module, "sumPair", sum_pair_ty)?;
    let sp_entry = ctx.append_basic_block(sum_pair_fn, "entry");
    let pair_ptr = ctx.argument(sum_pair_fn, 0)?;
    ctx.set_value_name(pair_ptr, "pair_ptr");

    let mut builder = Builder::new(&mut ctx);
    builder.set_insert_point(sp_entry);
    let field0_ptr = builder.struct_gep(pair, pair_ptr, 0, "field0_ptr")?;
    let field1_ptr = builder.struct_gep(pair, pair_ptr, 1, "field1_ptr")?;
    let field0 = builder.load(i32t, field0_ptr, "field0")?;
    let field1 = builder.load(i32t, field1_ptr, "field1")?;
    let total = builder.add(field0, field1, "total")?;
    builder.ret(total)?;

    println!("{}", ctx.print_module(module));

    let report = ctx.verify(module);
    println!("verify: {report}");
    Ok(())
}

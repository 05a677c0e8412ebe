//! Context - the ownership domain
//!
//! A context owns the type uniquing table and the arenas for every
//! value, instruction, block, function, module, and global created
//! under it. There is no implicit singleton; an application may hold
//! any number of independent contexts, and entities from one are never
//! valid in another.

use std::sync::atomic::{AtomicU32, Ordering};

use spark_common::IrError;

use crate::blocks::BasicBlock;
use crate::function::{FuncId, Function};
use crate::instructions::InstrData;
use crate::module::{Global, Module, ModuleId};
use crate::printer;
use crate::types::{Type, TypeId, TypeTable};
use crate::values::{ValueData, ValueId, ValueKind};
use crate::verifier::{self, VerifierReport};

/// Process-unique context ids, used only to make cross-context handle
/// misuse detectable. The interning tables themselves are per-instance.
static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Owner of all IR entities. Mutation goes through `&mut self`, so a
/// context cannot be mutated from two threads without synchronization
/// by construction.
#[derive(Debug)]
pub struct Context {
    pub(crate) types: TypeTable,
    pub(crate) values: Vec<ValueData>,
    pub(crate) instrs: Vec<InstrData>,
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) funcs: Vec<Function>,
    pub(crate) modules: Vec<Module>,
    pub(crate) globals: Vec<Global>,
}

impl Context {
    pub fn new() -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            types: TypeTable::new(id),
            values: Vec::new(),
            instrs: Vec::new(),
            blocks: Vec::new(),
            funcs: Vec::new(),
            modules: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Create a new module owned by this context.
    pub fn create_module(&mut self, name: &str) -> ModuleId {
        let module = ModuleId(self.modules.len() as u32);
        self.modules.push(Module {
            name: name.to_string(),
            functions: Vec::new(),
            globals: Vec::new(),
        });
        module
    }

    /// Structural verification; read-only, collects all violations.
    pub fn verify(&self, module: ModuleId) -> VerifierReport {
        verifier::verify_module(self, module)
    }

    /// Deterministic textual rendering of a whole module.
    pub fn print_module(&self, module: ModuleId) -> String {
        printer::print_module(self, module)
    }

    /// Deterministic textual rendering of a single function.
    pub fn print_function(&self, func: FuncId) -> String {
        printer::print_function(self, func)
    }

    // ---- type system facade ------------------------------------------

    pub fn void_type(&mut self) -> TypeId {
        self.types.void_type()
    }

    pub fn int_type(&mut self, width: u32) -> TypeId {
        self.types.int_type(width)
    }

    pub fn i1_type(&mut self) -> TypeId {
        self.types.int_type(1)
    }

    pub fn i8_type(&mut self) -> TypeId {
        self.types.int_type(8)
    }

    pub fn i32_type(&mut self) -> TypeId {
        self.types.int_type(32)
    }

    pub fn float_type(&mut self) -> TypeId {
        self.types.float_type()
    }

    pub fn ptr_type(&mut self, pointee: TypeId, addr_space: u32) -> TypeId {
        self.types.ptr_type(pointee, addr_space)
    }

    pub fn array_type(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.types.array_type(elem, len)
    }

    pub fn function_type(&mut self, ret: TypeId, params: Vec<TypeId>, vararg: bool) -> TypeId {
        self.types.function_type(ret, params, vararg)
    }

    pub fn named_struct_type(&mut self, name: &str) -> TypeId {
        self.types.named_struct_type(name)
    }

    pub fn set_struct_body(&mut self, id: TypeId, fields: Vec<TypeId>) -> Result<(), IrError> {
        self.types.set_struct_body(id, fields)
    }

    pub fn type_kind(&self, id: TypeId) -> &Type {
        self.types.get(id)
    }

    pub fn type_size_in_bytes(&self, id: TypeId) -> Result<u64, IrError> {
        self.types.size_in_bytes(id)
    }

    pub fn struct_fields(&self, id: TypeId) -> Result<&[TypeId], IrError> {
        self.types.struct_fields(id)
    }

    pub fn render_type(&self, id: TypeId) -> String {
        self.types.render(id)
    }

    // ---- values ------------------------------------------------------

    /// Constant integer from the context pool.
    pub fn const_int(&mut self, ty: TypeId, value: i64) -> Result<ValueId, IrError> {
        if !self.types.is_integer(ty) {
            return Err(IrError::TypeMismatch {
                message: format!(
                    "constant integers need an integer type, got {}",
                    self.types.render(ty)
                ),
            });
        }
        Ok(self.alloc_value(ValueKind::ConstInt { value }, ty))
    }

    pub fn value_type(&self, value: ValueId) -> TypeId {
        self.values[value.idx()].ty
    }

    pub fn value_kind(&self, value: ValueId) -> &ValueKind {
        &self.values[value.idx()].kind
    }

    pub fn value_name(&self, value: ValueId) -> Option<&str> {
        self.values[value.idx()].name.as_deref()
    }

    /// Display names are mutable on any value, arguments included; they
    /// only affect rendering.
    pub fn set_value_name(&mut self, value: ValueId, name: &str) {
        self.values[value.idx()].name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
    }

    pub(crate) fn alloc_value(&mut self, kind: ValueKind, ty: TypeId) -> ValueId {
        let value = ValueId(self.values.len() as u32);
        self.values.push(ValueData {
            kind,
            ty,
            name: None,
        });
        value
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

//! Module and Global Variables
//!
//! A module is a named container of functions and global declarations
//! owned by a context. Function and global names share one namespace
//! within a module (both render as `@name`); redefining a taken name is
//! an error rather than a replacement.

use serde::{Deserialize, Serialize};
use spark_common::IrError;

use crate::context::Context;
use crate::function::{FuncId, Function};
use crate::types::{Type, TypeId};
use crate::values::{ValueId, ValueKind};

/// Handle to a module in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a global variable in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalId(pub(crate) u32);

impl GlobalId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Linkage types for global symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Visible to other modules
    External,
    /// Only visible within this module
    Internal,
    /// Not visible outside this translation unit
    Private,
}

/// Global variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    /// Type of the stored value; the global's address has type `ty*`
    pub ty: TypeId,
    pub initializer: Option<ValueId>,
    pub linkage: Linkage,
    /// Address value usable as a pointer operand
    pub value: ValueId,
}

/// Module record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    /// Insertion order, also dump order
    pub functions: Vec<FuncId>,
    pub globals: Vec<GlobalId>,
}

impl Context {
    pub fn module_name(&self, module: ModuleId) -> &str {
        &self.modules[module.idx()].name
    }

    pub fn set_module_name(&mut self, module: ModuleId, name: &str) {
        self.modules[module.idx()].name = name.to_string();
    }

    /// Create a declaration-only function registered under `name`.
    /// Fails with `DuplicateDefinition` if the name is taken; callers
    /// that want to reuse an existing declaration should `get_function`
    /// first.
    pub fn create_function(
        &mut self,
        module: ModuleId,
        name: &str,
        fn_type: TypeId,
    ) -> Result<FuncId, IrError> {
        let params = match self.types.get(fn_type) {
            Type::Function { params, .. } => params.clone(),
            _ => {
                return Err(IrError::TypeMismatch {
                    message: format!(
                        "expected a function type, got {}",
                        self.types.render(fn_type)
                    ),
                })
            }
        };
        if self.module_name_taken(module, name) {
            return Err(IrError::DuplicateDefinition {
                module: self.module_name(module).to_string(),
                name: name.to_string(),
            });
        }

        let func = FuncId(self.funcs.len() as u32);
        let args = params
            .iter()
            .enumerate()
            .map(|(index, &ty)| {
                self.alloc_value(
                    ValueKind::Argument {
                        func,
                        index: index as u32,
                    },
                    ty,
                )
            })
            .collect();
        self.funcs.push(Function {
            name: name.to_string(),
            ty: fn_type,
            args,
            blocks: Vec::new(),
            module,
        });
        self.modules[module.idx()].functions.push(func);
        Ok(func)
    }

    /// Look up a function by name.
    pub fn get_function(&self, module: ModuleId, name: &str) -> Result<FuncId, IrError> {
        self.modules[module.idx()]
            .functions
            .iter()
            .copied()
            .find(|&f| self.funcs[f.idx()].name == name)
            .ok_or_else(|| IrError::NotFound {
                module: self.module_name(module).to_string(),
                name: name.to_string(),
            })
    }

    pub fn module_functions(&self, module: ModuleId) -> &[FuncId] {
        &self.modules[module.idx()].functions
    }

    /// Declare a global variable. The returned handle's address value
    /// (`global_value`) has type `ty*` in address space 0.
    pub fn add_global(
        &mut self,
        module: ModuleId,
        name: &str,
        ty: TypeId,
        initializer: Option<ValueId>,
        linkage: Linkage,
    ) -> Result<GlobalId, IrError> {
        if let Some(init) = initializer {
            let init_ty = self.value_type(init);
            if init_ty != ty {
                return Err(IrError::TypeMismatch {
                    message: format!(
                        "global '{name}' has type {} but its initializer has type {}",
                        self.types.render(ty),
                        self.types.render(init_ty)
                    ),
                });
            }
        }
        if self.module_name_taken(module, name) {
            return Err(IrError::DuplicateDefinition {
                module: self.module_name(module).to_string(),
                name: name.to_string(),
            });
        }

        let global = GlobalId(self.globals.len() as u32);
        let addr_ty = self.types.ptr_type(ty, 0);
        let value = self.alloc_value(ValueKind::Global(global), addr_ty);
        self.globals.push(Global {
            name: name.to_string(),
            ty,
            initializer,
            linkage,
            value,
        });
        self.modules[module.idx()].globals.push(global);
        Ok(global)
    }

    pub fn global(&self, global: GlobalId) -> &Global {
        &self.globals[global.idx()]
    }

    /// Address value of a global, usable as a pointer operand.
    pub fn global_value(&self, global: GlobalId) -> ValueId {
        self.globals[global.idx()].value
    }

    pub fn module_globals(&self, module: ModuleId) -> &[GlobalId] {
        &self.modules[module.idx()].globals
    }

    fn module_name_taken(&self, module: ModuleId, name: &str) -> bool {
        let m = &self.modules[module.idx()];
        m.functions
            .iter()
            .any(|&f| self.funcs[f.idx()].name == name)
            || m.globals.iter().any(|&g| self.globals[g.idx()].name == name)
    }
}

//! IR Type System
//!
//! Defines the type variant set and the per-context uniquing table.
//! Non-struct types are interned: structurally equal requests return the
//! identical `TypeId`. Named struct types are identity-distinct even with
//! identical bodies and may be created opaque, receiving their field list
//! exactly once via `set_struct_body`.

use serde::{Deserialize, Serialize};
use spark_common::IrError;
use std::collections::HashMap;

/// Handle to a type owned by a context.
///
/// Carries the id of the owning context so that structurally equal types
/// interned in two different contexts never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId {
    pub(crate) ctx: u32,
    pub(crate) index: u32,
}

/// IR type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Void type
    Void,

    /// Integer type with bit width (i1, i8, i16, i32, ...)
    Int(u32),

    /// 32-bit float type
    Float,

    /// Pointer type with address space
    Ptr { pointee: TypeId, addr_space: u32 },

    /// Array type [len x elem]
    Array { elem: TypeId, len: u64 },

    /// Named struct type; `body` is `None` while the type is opaque
    Struct {
        name: String,
        body: Option<Vec<TypeId>>,
    },

    /// Function type
    Function {
        ret: TypeId,
        params: Vec<TypeId>,
        vararg: bool,
    },
}

/// Per-context type uniquing table.
///
/// This is an explicit mapping owned by the context, never process-wide
/// state, so multiple contexts coexist in one process without sharing
/// type identity.
#[derive(Debug)]
pub struct TypeTable {
    ctx: u32,
    types: Vec<Type>,
    interned: HashMap<Type, TypeId>,
}

impl TypeTable {
    pub(crate) fn new(ctx: u32) -> Self {
        Self {
            ctx,
            types: Vec::new(),
            interned: HashMap::new(),
        }
    }

    /// Intern a non-struct type shape, returning the canonical handle.
    fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = TypeId {
            ctx: self.ctx,
            index: self.types.len() as u32,
        };
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern(Type::Void)
    }

    pub fn int_type(&mut self, width: u32) -> TypeId {
        self.intern(Type::Int(width))
    }

    pub fn float_type(&mut self) -> TypeId {
        self.intern(Type::Float)
    }

    pub fn ptr_type(&mut self, pointee: TypeId, addr_space: u32) -> TypeId {
        self.check(pointee);
        self.intern(Type::Ptr {
            pointee,
            addr_space,
        })
    }

    pub fn array_type(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.check(elem);
        self.intern(Type::Array { elem, len })
    }

    pub fn function_type(&mut self, ret: TypeId, params: Vec<TypeId>, vararg: bool) -> TypeId {
        self.check(ret);
        for &param in &params {
            self.check(param);
        }
        self.intern(Type::Function {
            ret,
            params,
            vararg,
        })
    }

    /// Create a fresh opaque struct type. Never interned: two structs
    /// with the same name (or later the same body) are distinct types.
    pub fn named_struct_type(&mut self, name: &str) -> TypeId {
        let id = TypeId {
            ctx: self.ctx,
            index: self.types.len() as u32,
        };
        self.types.push(Type::Struct {
            name: name.to_string(),
            body: None,
        });
        id
    }

    /// Assign the field list of an opaque struct. Allowed exactly once.
    pub fn set_struct_body(&mut self, id: TypeId, fields: Vec<TypeId>) -> Result<(), IrError> {
        for &field in &fields {
            self.check(field);
        }
        match self.get(id) {
            Type::Struct { name, body } => {
                if body.is_some() {
                    return Err(IrError::TypeIncomplete {
                        name: name.clone(),
                        message: "struct body may only be set once".to_string(),
                    });
                }
            }
            other => {
                return Err(IrError::TypeMismatch {
                    message: format!("expected a struct type, got {}", Self::render_shape(other)),
                });
            }
        }
        if let Type::Struct { body, .. } = &mut self.types[id.index as usize] {
            *body = Some(fields);
        }
        Ok(())
    }

    /// Look up a type by handle. Panics on a handle from another
    /// context; that misuse is made loud rather than silently tolerated.
    pub fn get(&self, id: TypeId) -> &Type {
        self.check(id);
        &self.types[id.index as usize]
    }

    fn check(&self, id: TypeId) {
        assert_eq!(
            id.ctx, self.ctx,
            "type handle belongs to a different context"
        );
    }

    /// Size of a type in bytes. Layout is flat: integers round up to
    /// whole bytes, no padding between struct fields.
    pub fn size_in_bytes(&self, id: TypeId) -> Result<u64, IrError> {
        match self.get(id) {
            Type::Void => Err(IrError::TypeMismatch {
                message: "void has no size".to_string(),
            }),
            Type::Int(width) => Ok((u64::from(*width) + 7) / 8),
            Type::Float => Ok(4),
            Type::Ptr { .. } => Ok(8),
            Type::Array { elem, len } => Ok(self.size_in_bytes(*elem)? * len),
            Type::Struct { name, body } => match body {
                Some(fields) => {
                    let mut total = 0;
                    for &field in fields {
                        total += self.size_in_bytes(field)?;
                    }
                    Ok(total)
                }
                None => Err(IrError::TypeIncomplete {
                    name: name.clone(),
                    message: "cannot compute the size of an opaque struct".to_string(),
                }),
            },
            Type::Function { .. } => Err(IrError::TypeMismatch {
                message: "function types have no size".to_string(),
            }),
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Int(_))
    }

    /// Pointee type and address space, for pointer types
    pub fn pointee(&self, id: TypeId) -> Option<(TypeId, u32)> {
        match self.get(id) {
            Type::Ptr {
                pointee,
                addr_space,
            } => Some((*pointee, *addr_space)),
            _ => None,
        }
    }

    /// Fields of a struct type with a body set
    pub fn struct_fields(&self, id: TypeId) -> Result<&[TypeId], IrError> {
        match self.get(id) {
            Type::Struct { body: Some(fields), .. } => Ok(fields),
            Type::Struct { name, body: None } => Err(IrError::TypeIncomplete {
                name: name.clone(),
                message: "struct body has not been set".to_string(),
            }),
            other => Err(IrError::TypeMismatch {
                message: format!("expected a struct type, got {}", Self::render_shape(other)),
            }),
        }
    }

    /// Stable textual rendering, used by the dump and by diagnostics.
    pub fn render(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".to_string(),
            Type::Int(width) => format!("i{width}"),
            Type::Float => "float".to_string(),
            Type::Ptr {
                pointee,
                addr_space: 0,
            } => format!("{}*", self.render(*pointee)),
            Type::Ptr {
                pointee,
                addr_space,
            } => format!("{} addrspace({addr_space})*", self.render(*pointee)),
            Type::Array { elem, len } => format!("[{len} x {}]", self.render(*elem)),
            Type::Struct { name, .. } => format!("%{name}"),
            Type::Function {
                ret,
                params,
                vararg,
            } => {
                let mut out = format!("{} (", self.render(*ret));
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&self.render(*param));
                }
                if *vararg {
                    out.push_str(", ...");
                }
                out.push(')');
                out
            }
        }
    }

    /// One-word description of a shape, for error messages that have no
    /// handle to render with.
    fn render_shape(ty: &Type) -> &'static str {
        match ty {
            Type::Void => "void",
            Type::Int(_) => "an integer type",
            Type::Float => "float",
            Type::Ptr { .. } => "a pointer type",
            Type::Array { .. } => "an array type",
            Type::Struct { .. } => "a struct type",
            Type::Function { .. } => "a function type",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_idempotence() {
        let mut table = TypeTable::new(0);
        let i32a = table.int_type(32);
        let i32b = table.int_type(32);
        assert_eq!(i32a, i32b);

        let i8t = table.int_type(8);
        assert_ne!(i32a, i8t);

        let p1 = table.ptr_type(i8t, 0);
        let p2 = table.ptr_type(i8t, 0);
        assert_eq!(p1, p2);
        assert_ne!(p1, table.ptr_type(i8t, 1));

        let a1 = table.array_type(i8t, 50);
        let a2 = table.array_type(i8t, 50);
        assert_eq!(a1, a2);
        assert_ne!(a1, table.array_type(i8t, 49));

        let f1 = table.function_type(i32a, vec![i32a, i32a], false);
        let f2 = table.function_type(i32a, vec![i32a, i32a], false);
        assert_eq!(f1, f2);
        assert_ne!(f1, table.function_type(i32a, vec![i32a, i32a], true));
    }

    #[test]
    fn test_no_sharing_across_contexts() {
        let mut a = TypeTable::new(0);
        let mut b = TypeTable::new(1);
        // Same shape, same arena slot, still distinct handles.
        assert_ne!(a.int_type(32), b.int_type(32));
    }

    #[test]
    #[should_panic(expected = "different context")]
    fn test_foreign_handle_is_loud() {
        let mut a = TypeTable::new(0);
        let b = TypeTable::new(1);
        let ty = a.int_type(32);
        let _ = b.get(ty);
    }

    #[test]
    fn test_named_structs_are_identity_distinct() {
        let mut table = TypeTable::new(0);
        let s1 = table.named_struct_type("Pair");
        let s2 = table.named_struct_type("Pair");
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_struct_body_single_assignment() {
        let mut table = TypeTable::new(0);
        let i32t = table.int_type(32);
        let pair = table.named_struct_type("IntPair");

        // Layout is unreadable while the struct is opaque.
        assert!(matches!(
            table.size_in_bytes(pair),
            Err(IrError::TypeIncomplete { .. })
        ));
        assert!(matches!(
            table.struct_fields(pair),
            Err(IrError::TypeIncomplete { .. })
        ));

        table.set_struct_body(pair, vec![i32t, i32t]).unwrap();
        assert_eq!(table.struct_fields(pair).unwrap(), &[i32t, i32t]);
        assert_eq!(table.size_in_bytes(pair).unwrap(), 8);

        let err = table.set_struct_body(pair, vec![i32t]).unwrap_err();
        assert!(matches!(err, IrError::TypeIncomplete { .. }));
    }

    #[test]
    fn test_set_struct_body_on_non_struct() {
        let mut table = TypeTable::new(0);
        let i32t = table.int_type(32);
        let err = table.set_struct_body(i32t, vec![]).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_sizes() {
        let mut table = TypeTable::new(0);
        let i1 = table.int_type(1);
        let i8t = table.int_type(8);
        let i32t = table.int_type(32);
        let f = table.float_type();
        let p = table.ptr_type(i8t, 0);
        let arr = table.array_type(i32t, 10);

        assert_eq!(table.size_in_bytes(i1).unwrap(), 1);
        assert_eq!(table.size_in_bytes(i8t).unwrap(), 1);
        assert_eq!(table.size_in_bytes(i32t).unwrap(), 4);
        assert_eq!(table.size_in_bytes(f).unwrap(), 4);
        assert_eq!(table.size_in_bytes(p).unwrap(), 8);
        assert_eq!(table.size_in_bytes(arr).unwrap(), 40);

        let void = table.void_type();
        assert!(table.size_in_bytes(void).is_err());
        let fty = table.function_type(void, vec![], false);
        assert!(table.size_in_bytes(fty).is_err());
    }

    #[test]
    fn test_render() {
        let mut table = TypeTable::new(0);
        let void = table.void_type();
        let i8t = table.int_type(8);
        let i32t = table.int_type(32);
        let p = table.ptr_type(i8t, 0);
        let p1 = table.ptr_type(i8t, 1);
        let arr = table.array_type(i8t, 50);
        let person = table.named_struct_type("struct.Person");
        let fty = table.function_type(i32t, vec![i32t, i32t], false);
        let vty = table.function_type(void, vec![p], true);

        assert_eq!(table.render(void), "void");
        assert_eq!(table.render(i32t), "i32");
        assert_eq!(table.render(p), "i8*");
        assert_eq!(table.render(p1), "i8 addrspace(1)*");
        assert_eq!(table.render(arr), "[50 x i8]");
        assert_eq!(table.render(person), "%struct.Person");
        assert_eq!(table.render(fty), "i32 (i32, i32)");
        assert_eq!(table.render(vty), "void (i8*, ...)");
    }
}

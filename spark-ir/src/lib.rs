//! Spark IR - arena-based intermediate representation
//!
//! This crate provides a context-owned IR graph built incrementally
//! through a cursor-based builder and checked by a read-only verifier.
//!
//! ## Architecture
//!
//! The crate is structured as follows:
//! - `types` - Type system and the per-context uniquing table
//! - `values` - Value representations (arguments, constants, results)
//! - `ops` - Binary operations and compare predicates
//! - `instructions` - IR instructions
//! - `blocks` - Basic block management
//! - `function` - Function definitions
//! - `module` - Module and global variables
//! - `context` - Arena owner for everything above
//! - `builder` - IR construction cursor
//! - `printer` - Deterministic textual dump
//! - `verifier` - Structural well-formedness checks
//!
//! All cross-references between entities are copyable index handles into
//! arenas owned by a [`Context`]. A handle is only meaningful for the
//! context that produced it; mixing handles across contexts is a
//! programming error that the accessors fail fast on where detectable.
//!
//! The subsystem is single-threaded by construction: every mutation goes
//! through `&mut Context` (usually via a [`Builder`] borrowing it), so
//! sharing a context across threads without synchronization is a compile
//! error rather than a runtime hazard.

pub use self::blocks::BlockId;
pub use self::builder::Builder;
pub use self::context::Context;
pub use self::function::FuncId;
pub use self::instructions::{InstrId, InstrKind};
pub use self::module::{Global, GlobalId, Linkage, ModuleId};
pub use self::ops::{BinaryOp, CmpPredicate};
pub use self::types::{Type, TypeId, TypeTable};
pub use self::values::{ValueId, ValueKind};
pub use self::verifier::{verify_module, VerifierReport};

pub use spark_common::{Diagnostic, IrError, Severity};

mod blocks;
mod builder;
mod context;
mod function;
mod instructions;
mod module;
mod ops;
mod printer;
mod types;
mod values;
mod verifier;

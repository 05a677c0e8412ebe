//! Spark IR - Common Types and Utilities
//!
//! This crate contains the error and diagnostic types shared by the
//! IR construction and verification crates.

pub mod error;

pub use error::{Diagnostic, IrError, Severity};

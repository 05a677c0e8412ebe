//! IR Operations
//!
//! Defines the binary operations and integer compare predicates
//! available in the IR.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
        };
        write!(f, "{op_str}")
    }
}

/// Integer compare predicates (results are i1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpPredicate {
    Eq,
    Ne,
    /// Signed less-than
    Slt,
    /// Signed greater-than
    Sgt,
}

impl fmt::Display for CmpPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pred_str = match self {
            CmpPredicate::Eq => "eq",
            CmpPredicate::Ne => "ne",
            CmpPredicate::Slt => "slt",
            CmpPredicate::Sgt => "sgt",
        };
        write!(f, "{pred_str}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BinaryOp::Add.to_string(), "add");
        assert_eq!(BinaryOp::Mul.to_string(), "mul");
        assert_eq!(CmpPredicate::Sgt.to_string(), "sgt");
        assert_eq!(CmpPredicate::Ne.to_string(), "ne");
    }
}

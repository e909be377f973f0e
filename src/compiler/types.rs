//! # Source-level types
//!
//! Every declared entity and every expression result carries one of these.
//! Simple types map one-to-one onto a memory segment kind; class types have
//! no storage of their own (their fields do).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::memory::{Address, ValueKind};

/// OOPL types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// `bool`
    Bool,
    /// `float` (64-bit)
    Float,
    /// `int` (64-bit signed)
    Int,
    /// `string`
    String,
    /// `void` (function return type only)
    Void,
    /// Instance of a declared class
    Class(String),
}

impl Type {
    /// Parses a built-in type keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "bool" => Some(Type::Bool),
            "float" => Some(Type::Float),
            "int" => Some(Type::Int),
            "string" => Some(Type::String),
            "void" => Some(Type::Void),
            _ => None,
        }
    }

    /// Segment kind used to store a value of this type
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Type::Bool => Some(ValueKind::Bool),
            Type::Float => Some(ValueKind::Float),
            Type::Int => Some(ValueKind::Int),
            Type::String => Some(ValueKind::String),
            Type::Void | Type::Class(_) => None,
        }
    }

    /// `int` or `float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Types that can be stored in a single memory cell
    pub fn is_simple(&self) -> bool {
        self.kind().is_some()
    }

    /// Class name for class types
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    /// True when a value of type `arg` may be passed where `self` is expected
    pub fn accepts_argument(&self, arg: &Type) -> bool {
        self == arg || (self.is_numeric() && arg.is_numeric())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Float => write!(f, "float"),
            Type::Int => write!(f, "int"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

/// A typed address: the result of compiling an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// Static type of the value
    pub ty: Type,
    /// Where the value lives (possibly a pointer cell for array elements)
    pub address: Address,
}

impl Operand {
    /// Creates an operand
    pub fn new(ty: Type, address: Address) -> Self {
        Self { ty, address }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_and_kind() {
        assert_eq!(Type::from_keyword("float"), Some(Type::Float));
        assert_eq!(Type::from_keyword("Point"), None);
        assert_eq!(Type::String.kind(), Some(ValueKind::String));
        assert_eq!(Type::Class("Point".into()).kind(), None);
        assert!(!Type::Void.is_simple());
    }

    #[test]
    fn test_argument_promotion() {
        assert!(Type::Float.accepts_argument(&Type::Int));
        assert!(Type::Int.accepts_argument(&Type::Float));
        assert!(!Type::String.accepts_argument(&Type::Int));
        assert!(Type::Bool.accepts_argument(&Type::Bool));
    }
}

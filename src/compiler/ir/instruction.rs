//! Quadruple definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::memory::Address;

/// Quadruple operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    // Arithmetic (result = left op right)
    /// Addition / string concatenation
    Plus,
    /// Subtraction
    Minus,
    /// Multiplication
    Times,
    /// Division (truncating for two ints)
    Divides,

    /// Copy: result = left
    Assign,

    // Comparison
    /// Equality
    Eq,
    /// Inequality
    Diff,
    /// Less than
    Lt,
    /// Greater than
    Gt,
    /// Less than or equal
    LtEq,
    /// Greater than or equal
    GtEq,

    // Logical
    /// Logical and
    And,
    /// Logical or
    Or,

    // Control flow
    /// Unconditional jump
    Goto,
    /// Jump when the condition is false
    GotoF,

    // Calls
    /// Allocate a pending activation record for a function
    Era,
    /// Copy an argument into the pending activation
    Param,
    /// Presence-preserving copy of an instance field into the pending activation
    OptParam,
    /// Presence-preserving copy (field write-back)
    OptAssign,
    /// Activate the pending record and jump to the function entry
    Gosub,
    /// Discard the current activation and return to the caller
    EndSub,
    /// Store the return value
    Return,

    // I/O
    /// Write a value to the output
    Print,
    /// Read one input line into a string cell
    Read,

    // Arrays
    /// Verify `lower <= index < upper`
    Ver,
    /// Store a computed address into a pointer cell
    SavePtr,
}

impl Operation {
    /// Every operation, in table order
    pub const ALL: [Operation; 26] = [
        Operation::Plus,
        Operation::Minus,
        Operation::Times,
        Operation::Divides,
        Operation::Assign,
        Operation::Eq,
        Operation::Diff,
        Operation::Lt,
        Operation::Gt,
        Operation::LtEq,
        Operation::GtEq,
        Operation::And,
        Operation::Or,
        Operation::Goto,
        Operation::GotoF,
        Operation::Era,
        Operation::Param,
        Operation::OptParam,
        Operation::OptAssign,
        Operation::Gosub,
        Operation::EndSub,
        Operation::Return,
        Operation::Print,
        Operation::Read,
        Operation::Ver,
        Operation::SavePtr,
    ];

    /// Symbol used in source text and in the artifact
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Plus => "+",
            Operation::Minus => "-",
            Operation::Times => "*",
            Operation::Divides => "/",
            Operation::Assign => "=",
            Operation::Eq => "==",
            Operation::Diff => "!=",
            Operation::Lt => "<",
            Operation::Gt => ">",
            Operation::LtEq => "<=",
            Operation::GtEq => ">=",
            Operation::And => "&&",
            Operation::Or => "||",
            Operation::Goto => "GOTO",
            Operation::GotoF => "GOTOF",
            Operation::Era => "ERA",
            Operation::Param => "PARAM",
            Operation::OptParam => "OPT_PARAM",
            Operation::OptAssign => "OPT_ASSIGN",
            Operation::Gosub => "GOSUB",
            Operation::EndSub => "ENDSUB",
            Operation::Return => "RETURN",
            Operation::Print => "PRINT",
            Operation::Read => "READ",
            Operation::Ver => "VER",
            Operation::SavePtr => "SAVEPTR",
        }
    }

    /// Parses an artifact symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Two-operand operations that produce a value
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Operation::Plus
                | Operation::Minus
                | Operation::Times
                | Operation::Divides
                | Operation::Eq
                | Operation::Diff
                | Operation::Lt
                | Operation::Gt
                | Operation::LtEq
                | Operation::GtEq
                | Operation::And
                | Operation::Or
        )
    }

    /// Operations whose result is an instruction index
    pub fn is_jump(self) -> bool {
        matches!(self, Operation::Goto | Operation::GotoF)
    }

    /// Operations whose result is a function name
    pub fn targets_function(self) -> bool {
        matches!(self, Operation::Era | Operation::Gosub)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Result field of a quadruple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// No result (`ENDSUB`, unpatched jumps)
    None,
    /// Memory address
    Address(Address),
    /// Instruction index
    Jump(usize),
    /// Function name (resolved through the function table at run time)
    Function(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::None => write!(f, "None"),
            Target::Address(a) => write!(f, "{}", a),
            Target::Jump(i) => write!(f, "{}", i),
            Target::Function(name) => write!(f, "{}", name),
        }
    }
}

/// One instruction: `(op, left, right, result)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadruple {
    /// Operation code
    pub op: Operation,
    /// First operand
    pub left: Option<Address>,
    /// Second operand
    pub right: Option<Address>,
    /// Destination, jump target or function name
    pub result: Target,
}

impl Quadruple {
    /// Creates a quadruple
    pub fn new(
        op: Operation,
        left: Option<Address>,
        right: Option<Address>,
        result: Target,
    ) -> Self {
        Self {
            op,
            left,
            right,
            result,
        }
    }

    /// `op left right -> address`
    pub fn binary(op: Operation, left: Address, right: Address, result: Address) -> Self {
        Self::new(op, Some(left), Some(right), Target::Address(result))
    }

    /// `op source -> address` (assignment-like moves)
    pub fn mov(op: Operation, source: Address, result: Address) -> Self {
        Self::new(op, Some(source), None, Target::Address(result))
    }
}

fn operand(f: &mut fmt::Formatter, value: Option<Address>) -> fmt::Result {
    match value {
        Some(a) => write!(f, "{}", a),
        None => write!(f, "None"),
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},", self.op)?;
        operand(f, self.left)?;
        write!(f, ",")?;
        operand(f, self.right)?;
        write!(f, ",{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_unique_and_parse_back() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operation::from_symbol("MOD"), None);
    }

    #[test]
    fn test_display() {
        let quad = Quadruple::binary(Operation::Plus, 2000, 2001, 7000);
        assert_eq!(quad.to_string(), "+,2000,2001,7000");
        let era = Quadruple::new(Operation::Era, None, None, Target::Function("main".into()));
        assert_eq!(era.to_string(), "ERA,None,None,main");
        let end = Quadruple::new(Operation::EndSub, None, None, Target::None);
        assert_eq!(end.to_string(), "ENDSUB,None,None,None");
    }
}

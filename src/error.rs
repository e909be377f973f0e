//! Error types for the OOPL compiler and virtual machine

use thiserror::Error;

use crate::memory::Address;

/// OOPL compiler and VM errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Compile-time errors
    /// Malformed construct found by the front end
    ///
    /// **Triggered by:** Invalid OOPL syntax (missing `;`, unbalanced braces, stray tokens)
    /// **Example:** `int main( { return 0; }`
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// Re-declared variable, class, member or function body
    ///
    /// **Example:** `int x; float x;` in the same scope
    #[error("Duplicate {entity}: {name}")]
    DuplicateEntity {
        /// What was re-declared ("variable", "class", "function body", ...)
        entity: String,
        /// Offending name
        name: String,
    },

    /// Reference to a name not visible from the current scope
    #[error("Undeclared identifier: {name}")]
    UndeclaredIdentifier {
        /// Identifier name
        name: String,
    },

    /// Operator table miss, return or argument type mismatch
    ///
    /// **Example:** `true + 1`, `return 1.5;` in an `int` function
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Error description
        message: String,
    },

    /// `this` or `break` used outside of a valid context
    #[error("Scope error: {message}")]
    ScopeError {
        /// Error description
        message: String,
    },

    /// Semantic rule violation (missing return, wrong `main`, signature mismatch)
    #[error("Semantic error: {message}")]
    SemanticError {
        /// Error description
        message: String,
    },

    /// Function called but never given a body
    #[error("Implicit function declaration: {name} is called but never defined")]
    ImplicitDeclaration {
        /// Function name
        name: String,
    },

    /// Array declared with a non-positive dimension
    #[error("Arrays must have a dimension length larger than 0 (got {size})")]
    InvalidDimension {
        /// Declared bound
        size: i64,
    },

    /// Memory segment grew past its chunk size
    #[error("Chunk size exceeded for {kind} segment (limit: {limit})")]
    CapacityExceeded {
        /// Segment kind name
        kind: String,
        /// Maximum number of cells
        limit: usize,
    },

    /// Compile error annotated with the source position that produced it
    #[error("{source} (line {line}, column {col})")]
    Located {
        /// Line of the construct
        line: usize,
        /// Column of the construct
        col: usize,
        /// Underlying error
        source: Box<Error>,
    },

    // Run-time errors
    /// Read of a cell that was reserved but never written
    #[error("Uninitialized variable at address {address}")]
    UninitializedVariable {
        /// Address that was read
        address: Address,
    },

    /// Array index outside `[lower, upper)`
    #[error("Index out of bounds: {index} not in [{lower}, {upper})")]
    IndexOutOfBounds {
        /// Evaluated index
        index: i64,
        /// Inclusive lower bound
        lower: i64,
        /// Exclusive upper bound
        upper: i64,
    },

    /// Opcode / operand shape that the dispatcher does not handle
    #[error("Unknown instruction at {index}: {instruction}")]
    UnknownInstruction {
        /// Instruction pointer of the quadruple
        index: usize,
        /// Rendered quadruple
        instruction: String,
    },

    /// The artifact contains no quadruples
    #[error("Empty program: no instructions to execute")]
    EmptyProgram,

    /// Integer division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Address outside every segment of the memory it resolves to
    #[error("Invalid address: {address}")]
    InvalidAddress {
        /// Offending address
        address: Address,
    },

    /// `ERA`/`GOSUB` names a function missing from the function table
    #[error("Undefined function: {name}")]
    UndefinedFunction {
        /// Function name
        name: String,
    },

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    // Artifact errors
    /// Malformed compiled artifact
    #[error("Artifact error at line {line}: {message}")]
    ArtifactError {
        /// 1-indexed artifact line
        line: usize,
        /// Error description
        message: String,
    },

    /// I/O failure while reading input or writing output
    #[error("I/O error: {0}")]
    Io(String),
}

/// Stage of the toolchain an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Raised while compiling source text
    Compile,
    /// Raised while executing quadruples
    Runtime,
    /// Raised while encoding or decoding an artifact
    Artifact,
}

impl Error {
    /// Create a type mismatch error with a message
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch {
            message: msg.into(),
        }
    }

    /// Create a semantic error with a message
    pub fn semantic(msg: impl Into<String>) -> Self {
        Error::SemanticError {
            message: msg.into(),
        }
    }

    /// Create a scope error with a message
    pub fn scope(msg: impl Into<String>) -> Self {
        Error::ScopeError {
            message: msg.into(),
        }
    }

    /// Create a duplicate-entity error
    pub fn duplicate(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Error::DuplicateEntity {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Create an undeclared-identifier error
    pub fn undeclared(name: impl Into<String>) -> Self {
        Error::UndeclaredIdentifier { name: name.into() }
    }

    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Attach a source position. Already located errors keep their innermost position.
    pub fn at(self, line: usize, col: usize) -> Self {
        match self {
            Error::Located { .. } | Error::SyntaxError { .. } => self,
            other => Error::Located {
                line,
                col,
                source: Box::new(other),
            },
        }
    }

    /// Strip position information, returning the underlying error
    pub fn root(&self) -> &Error {
        match self {
            Error::Located { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify the error by toolchain phase
    pub fn phase(&self) -> ErrorPhase {
        match self.root() {
            Error::SyntaxError { .. }
            | Error::DuplicateEntity { .. }
            | Error::UndeclaredIdentifier { .. }
            | Error::TypeMismatch { .. }
            | Error::ScopeError { .. }
            | Error::SemanticError { .. }
            | Error::ImplicitDeclaration { .. }
            | Error::InvalidDimension { .. }
            | Error::CapacityExceeded { .. } => ErrorPhase::Compile,

            Error::ArtifactError { .. } => ErrorPhase::Artifact,

            _ => ErrorPhase::Runtime,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type for OOPL operations
pub type Result<T> = std::result::Result<T, Error>;

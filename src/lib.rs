//! # OOPL - a quadruple compiler and virtual machine
//!
//! OOPL is a small statically typed, class-based imperative language. This
//! crate compiles it in a single pass into a flat stream of quadruples over a
//! typed, segmented virtual address space, and executes that stream on a
//! stack-of-activations virtual machine.
//!
//! ## Features
//!
//! - **Typed memory** - every address encodes its region (global/activation)
//!   and its value kind, so no cell carries a runtime tag
//! - **Single pass** - the parser drives the code generator directly; jump
//!   targets are backpatched as control structures close
//! - **Heap-less objects** - class instances are expanded into one cell per
//!   leaf field; methods see their receiver through `this.<field>` copies
//! - **Bounds-checked arrays** - multi-dimensional arrays with row-major
//!   layout and a `VER` check per index
//! - **Text artifacts** - the compiled program is a readable, line-oriented
//!   file that the VM loads back
//!
//! ## Quick Start
//!
//! ```rust
//! use oopl::{CompileOptions, Compiler, Value, VirtualMachine};
//!
//! # fn main() -> oopl::Result<()> {
//! let source = r#"
//!     program demo;
//!     int main() {
//!         int x;
//!         x = 2 + 3 * 4;
//!         print(x);
//!         return 0;
//!     }
//! "#;
//!
//! // Compile to an artifact
//! let compiled = Compiler::new(CompileOptions::default()).compile(source)?;
//!
//! // Execute, capturing what the program prints
//! let mut vm = VirtualMachine::with_io(compiled.artifact, "".as_bytes(), Vec::new())?;
//! let result = vm.run()?;
//!
//! assert_eq!(result, Some(Value::Int(0)));
//! assert_eq!(vm.into_output(), b"14");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ Source Code │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Scanner   │  Tokenization (lexer module)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌───────────────┐
//! │   Parser    │ ──▶ │ CodeGenerator │  scopes, directories, memory, quads
//! └─────────────┘     └───────┬───────┘
//!                             │
//!                             ▼
//!                     ┌───────────────┐
//!                     │   Artifact    │  %%global_resources ... %%quadruples
//!                     └───────┬───────┘
//!                             │
//!                             ▼
//!                     ┌───────────────┐
//!                     │VirtualMachine │  runtime module
//!                     └───────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Compile errors carry
//! the source position of the construct that raised them:
//!
//! ```rust
//! use oopl::{CompileOptions, Compiler, Error};
//!
//! let err = Compiler::new(CompileOptions::default())
//!     .compile("program p; int main() { y = 1; return 0; }")
//!     .unwrap_err();
//! assert_eq!(err.root(), &Error::undeclared("y"));
//! ```

#![warn(missing_docs)]

/// Version of the OOPL toolchain
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod runtime;

// Re-export main types
pub use compiler::{Artifact, CompileOptions, CompileResult, Compiler};
pub use error::{Error, ErrorPhase, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use memory::{Address, MemoryLayout, Value};
pub use parser::Parser;
pub use runtime::VirtualMachine;

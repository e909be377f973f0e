//! # OOPL Compiler - source to quadruple artifact
//!
//! Single-pass compiler: the parser recognizes constructs and the code
//! generator type-checks them, assigns typed virtual addresses and emits
//! quadruples immediately, backpatching jump targets once they are known.
//!
//! ## Architecture
//!
//! ```text
//! OOPL Source → Tokens → Parser ⇄ CodeGenerator → Artifact (text)
//!                                   ├── scope stack / directories
//!                                   ├── global + local typed memory
//!                                   └── quadruple stream
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use oopl::compiler::{CompileOptions, Compiler};
//!
//! let source = "program demo; int main() { return 14; }";
//! let compiled = Compiler::new(CompileOptions::default()).compile(source)?;
//! std::fs::write("demo.oopl.out", compiled.text)?;
//! ```

pub mod artifact;
pub mod cube;
pub mod debug;
pub mod directory;
pub mod generator;
pub mod ir;
pub mod scope;
pub mod types;

pub use artifact::{Artifact, FunctionRecord};
pub use debug::debug_compile;
pub use directory::{ClassDirectory, FunctionDirectory};
pub use generator::{CallSite, CodeGenerator};
pub use ir::{Operation, Quadruple, Target};
pub use types::{Operand, Type};

use crate::error::Result;
use crate::lexer::Scanner;
use crate::memory::MemoryLayout;
use crate::parser::Parser;

/// Compilation options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Segment layout shared with the virtual machine
    pub layout: MemoryLayout,
    /// Prepend `#` dumps of the directories, global memory and quadruples
    pub verbose: bool,
}

/// Compilation result with metadata
#[derive(Debug)]
pub struct CompileResult {
    /// Structured artifact, ready for the virtual machine
    pub artifact: Artifact,
    /// Text form of the artifact (with the dumps when verbose)
    pub text: String,
    /// Number of emitted quadruples
    pub quadruple_count: usize,
}

/// OOPL to quadruple compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile OOPL source code to an artifact
    pub fn compile(&self, source: &str) -> Result<CompileResult> {
        // Phase 1: Scan
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens()?;
        tracing::debug!(tokens = tokens.len(), "scanned source");

        // Phase 2: Parse and generate in one pass
        let mut generator = CodeGenerator::new(self.options.layout);
        let artifact = Parser::new(tokens, &mut generator).parse()?;

        // Phase 3: Render
        let mut text = String::new();
        if self.options.verbose {
            text.push_str(&debug_compile(&generator));
        }
        text.push_str(&artifact.render());

        Ok(CompileResult {
            quadruple_count: artifact.quadruples.len(),
            artifact,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_renders_artifact() {
        let compiled = Compiler::new(CompileOptions::default())
            .compile("program demo; int main() { return 14; }")
            .unwrap();
        assert_eq!(compiled.quadruple_count, 5);
        assert!(compiled.text.starts_with("%%global_resources"));
        let reparsed = Artifact::parse(&compiled.text).unwrap();
        assert_eq!(reparsed, compiled.artifact);
    }

    #[test]
    fn test_verbose_dumps_are_comments() {
        let options = CompileOptions {
            verbose: true,
            ..CompileOptions::default()
        };
        let compiled = Compiler::new(options)
            .compile("program demo; int main() { print(1); return 0; }")
            .unwrap();
        assert!(compiled.text.starts_with("# program demo\n"));
        assert!(compiled.text.contains("QUADRUPLES"));
        assert_eq!(Artifact::parse(&compiled.text).unwrap(), compiled.artifact);
    }
}

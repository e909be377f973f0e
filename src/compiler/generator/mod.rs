//! # Code generator
//!
//! The semantic actions of the compiler. The parser calls one action per
//! recognized construct, left to right, depth first; each action type-checks,
//! resolves addresses and emits quadruples on the spot. Nothing is revisited,
//! so every error is reported at first sight.
//!
//! ```text
//! generator/
//! ├── mod.rs       # CodeGenerator state, program and variable declarations
//! ├── function.rs  # function headers/bodies, return
//! ├── class.rs     # classes, object field expansion, `this` bindings
//! ├── call.rs      # call sites (ERA / PARAM / GOSUB)
//! ├── expr.rs      # constants, variables, array elements, operators, I/O
//! └── control.rs   # if / while / for / break, blocks
//! ```

mod call;
mod class;
mod control;
mod expr;
mod function;

pub use call::CallSite;

use super::artifact::Artifact;
use super::directory::{ClassDirectory, FunctionDirectory};
use super::ir::{JumpStack, Operation, Quadruple, QuadrupleStream, Target};
use super::scope::{ScopeKind, ScopeStack, Symbol};
use super::types::{Operand, Type};
use crate::error::{Error, Result};
use crate::memory::{ArrayShape, Memory, MemoryLayout, Region, ValueKind};

use control::BranchFrame;

/// Name of the program entry function
pub const MAIN: &str = "main";

/// Compiler context: memories, directories, scopes and the quadruple stream
#[derive(Debug)]
pub struct CodeGenerator {
    layout: MemoryLayout,
    global: Memory,
    local: Memory,
    scopes: ScopeStack,
    functions: FunctionDirectory,
    classes: ClassDirectory,
    quads: QuadrupleStream,
    jumps: JumpStack,
    branches: Vec<BranchFrame>,
    current_function: Option<String>,
    has_return: bool,
    program: Option<String>,
    unresolved_calls: Vec<String>,
}

impl CodeGenerator {
    /// Creates a generator for the given address-space geometry
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            global: Memory::new(Region::Global, layout),
            local: Memory::new(Region::Local, layout),
            scopes: ScopeStack::new(),
            functions: FunctionDirectory::new(),
            classes: ClassDirectory::new(),
            quads: QuadrupleStream::new(),
            jumps: JumpStack::new(),
            branches: Vec::new(),
            current_function: None,
            has_return: false,
            program: None,
            unresolved_calls: Vec::new(),
        }
    }

    /// Address-space geometry
    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// Program name given in the `program` header
    pub fn program_name(&self) -> Option<&str> {
        self.program.as_deref()
    }

    /// Function directory
    pub fn functions(&self) -> &FunctionDirectory {
        &self.functions
    }

    /// Class directory
    pub fn classes(&self) -> &ClassDirectory {
        &self.classes
    }

    /// Global memory (globals, pooled constants, return slots, shadows)
    pub fn global_memory(&self) -> &Memory {
        &self.global
    }

    /// Emitted quadruples
    pub fn quadruples(&self) -> &QuadrupleStream {
        &self.quads
    }

    /// Scope stack
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    fn emit(&mut self, quad: Quadruple) -> usize {
        self.quads.emit(quad)
    }

    /// Declares a name in the innermost scope, backed by `region`'s memory
    fn declare_in(
        &mut self,
        region: Region,
        name: &str,
        ty: Type,
        shape: Option<ArrayShape>,
    ) -> Result<Symbol> {
        let memory = match region {
            Region::Global => &mut self.global,
            Region::Local => &mut self.local,
        };
        self.scopes.declare(name, ty, shape, memory)
    }

    /// Reserves a temporary cell in the memory of the code being compiled
    fn temp(&mut self, ty: &Type) -> Result<Operand> {
        let kind = ty
            .kind()
            .ok_or_else(|| Error::type_mismatch(format!("no storage for a value of type {}", ty)))?;
        let address = self.reserve_temp(kind)?;
        Ok(Operand::new(ty.clone(), address))
    }

    fn reserve_temp(&mut self, kind: ValueKind) -> Result<usize> {
        match self.current_function {
            Some(_) => self.local.reserve(kind, 1),
            None => self.global.reserve(kind, 1),
        }
    }

    // ---------------------------------------------------------------------
    // Program
    // ---------------------------------------------------------------------

    /// `program <name>;` opens the global scope and emits `ERA main; GOSUB main`
    pub fn begin_program(&mut self, name: &str) -> Result<()> {
        if self.program.is_some() {
            return Err(Error::duplicate("program", name));
        }
        self.program = Some(name.to_string());
        self.scopes.push(ScopeKind::Global);
        self.emit(Quadruple::new(
            Operation::Era,
            None,
            None,
            Target::Function(MAIN.to_string()),
        ));
        self.emit(Quadruple::new(
            Operation::Gosub,
            None,
            None,
            Target::Function(MAIN.to_string()),
        ));
        tracing::debug!(program = name, "begin program");
        Ok(())
    }

    /// End of input: checks `main` and pending calls, then builds the artifact
    pub fn end_program(&mut self) -> Result<Artifact> {
        match self.functions.get(MAIN) {
            Some(entry) if entry.defined => {}
            _ => return Err(Error::semantic("program has no 'main' function")),
        }
        for name in &self.unresolved_calls {
            let defined = self.functions.get(name).map_or(false, |f| f.defined);
            if !defined {
                return Err(Error::ImplicitDeclaration { name: name.clone() });
            }
        }
        if !self.jumps.is_empty() || !self.branches.is_empty() {
            return Err(Error::semantic("unterminated control-flow construct"));
        }
        self.scopes.pop()?;

        let artifact = Artifact {
            global_resources: self.global.describe(),
            global_memory: self.global.cells(),
            functions: self.functions.records(),
            quadruples: self.quads.to_vec(),
        };
        tracing::debug!(
            program = ?self.program,
            quadruples = artifact.quadruples.len(),
            functions = artifact.functions.len(),
            "end program"
        );
        Ok(artifact)
    }

    // ---------------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------------

    /// Declares a variable (or a class member inside a class body).
    /// `dims` holds the bounds of an array declaration, empty for scalars.
    pub fn declare_variable(&mut self, name: &str, ty: Type, dims: &[i64]) -> Result<()> {
        if ty == Type::Void {
            return Err(Error::type_mismatch(format!(
                "variable '{}' cannot have type void",
                name
            )));
        }
        let shape = if dims.is_empty() {
            None
        } else {
            Some(ArrayShape::new(dims)?)
        };

        let class_body = match self.scopes.current().map(|s| s.kind()) {
            Some(ScopeKind::Class(class)) => Some(class.clone()),
            _ => None,
        };
        if let Some(class) = class_body {
            return self.declare_member(&class, name, ty, shape);
        }

        match ty {
            Type::Class(class) => {
                if shape.is_some() {
                    return Err(Error::type_mismatch(format!(
                        "'{}': arrays of class instances are not supported",
                        name
                    )));
                }
                let region = self.scopes.region();
                self.declare_object(region, name, &class)?;
            }
            simple => {
                let region = self.scopes.region();
                self.declare_in(region, name, simple, shape)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;

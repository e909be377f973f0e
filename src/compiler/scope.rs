//! # Scopes and symbol resolution
//!
//! A stack of lexical scopes. Each scope maps names to [`Symbol`]s and knows
//! which memory region backs its declarations. Lookup walks from the
//! innermost scope outwards, so inner declarations shadow outer ones.

use std::collections::HashMap;

use super::types::Type;
use crate::error::{Error, Result};
use crate::memory::{Address, ArrayShape, Memory, Region};

/// A declared name
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Name as written, dotted for object fields (`p.x`, `this.x`)
    pub name: String,
    /// Declared type
    pub ty: Type,
    /// First cell; `None` for class members and for class-typed variables
    pub address: Option<Address>,
    /// Layout for arrays
    pub shape: Option<ArrayShape>,
}

impl Symbol {
    /// Number of cells occupied (1 for scalars)
    pub fn cells(&self) -> usize {
        self.shape.as_ref().map_or(1, |s| s.total())
    }
}

/// What opened a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Whole program
    Global,
    /// Class body
    Class(String),
    /// Function body; `class` is set for methods
    Function {
        /// Owning class of a method
        class: Option<String>,
    },
    /// Plain block (`if`/`else` bodies, nested `{ }`)
    Generic,
    /// `while` / `for`
    Loop,
}

impl ScopeKind {
    /// Memory region declarations in this scope live in
    pub fn region(&self) -> Region {
        match self {
            ScopeKind::Global | ScopeKind::Class(_) => Region::Global,
            _ => Region::Local,
        }
    }
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
    breaks: Vec<usize>,
}

impl Scope {
    /// Creates an empty scope
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            symbols: HashMap::new(),
            breaks: Vec::new(),
        }
    }

    /// Kind of the scope
    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    /// Symbol declared directly in this scope
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Pending `break` jumps (loop scopes only)
    pub fn breaks(&self) -> &[usize] {
        &self.breaks
    }
}

/// Stack of open scopes
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// Creates an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope
    pub fn push(&mut self, kind: ScopeKind) {
        tracing::trace!(?kind, depth = self.scopes.len() + 1, "push scope");
        self.scopes.push(Scope::new(kind));
    }

    /// Closes the innermost scope
    pub fn pop(&mut self) -> Result<Scope> {
        self.scopes
            .pop()
            .ok_or_else(|| Error::scope("no scope to close"))
    }

    /// Innermost scope
    pub fn current(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// Region backing declarations in the innermost scope
    pub fn region(&self) -> Region {
        self.current()
            .map_or(Region::Global, |scope| scope.kind.region())
    }

    /// Declares `name` in the innermost scope.
    ///
    /// Simple-typed symbols outside class scopes get `len` cells reserved in
    /// `memory`, which must back the innermost scope's region.
    pub fn declare(
        &mut self,
        name: &str,
        ty: Type,
        shape: Option<ArrayShape>,
        memory: &mut Memory,
    ) -> Result<Symbol> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| Error::scope("declaration outside of any scope"))?;
        if scope.symbols.contains_key(name) {
            return Err(Error::duplicate("variable", name));
        }

        let address = match (&scope.kind, ty.kind()) {
            (ScopeKind::Class(_), _) | (_, None) => None,
            (_, Some(kind)) => {
                let count = shape.as_ref().map_or(1, |s| s.total());
                Some(memory.reserve(kind, count)?)
            }
        };

        let symbol = Symbol {
            name: name.to_string(),
            ty,
            address,
            shape,
        };
        tracing::trace!(name, address = ?symbol.address, "declare");
        scope.symbols.insert(name.to_string(), symbol.clone());
        Ok(symbol)
    }

    /// Innermost visible declaration of `name`
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Like [`find`](Self::find) but fails with `UndeclaredIdentifier`
    pub fn lookup(&self, name: &str) -> Result<&Symbol> {
        self.find(name).ok_or_else(|| Error::undeclared(name))
    }

    /// True when `name` is visible
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// True when some enclosing scope is a loop
    pub fn is_in_loop(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Loop)
    }

    /// True inside a class body or one of its methods
    pub fn is_in_class(&self) -> bool {
        self.current_class().is_some()
    }

    /// Class whose body or method is being compiled
    pub fn current_class(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match &scope.kind {
            ScopeKind::Class(name) => Some(name.as_str()),
            ScopeKind::Function { class } => class.as_deref(),
            _ => None,
        })
    }

    /// Records a `break` jump on the innermost loop
    pub fn add_break(&mut self, index: usize) -> Result<()> {
        let scope = self
            .scopes
            .iter_mut()
            .rev()
            .find(|s| s.kind == ScopeKind::Loop)
            .ok_or_else(|| Error::scope("'break' outside of a loop"))?;
        scope.breaks.push(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLayout;

    fn memories() -> (Memory, Memory) {
        let layout = MemoryLayout::default();
        (
            Memory::new(Region::Global, layout),
            Memory::new(Region::Local, layout),
        )
    }

    #[test]
    fn test_shadowing_and_lookup() {
        let (mut global, mut local) = memories();
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Global);
        let outer = scopes.declare("x", Type::Int, None, &mut global).unwrap();
        assert_eq!(outer.address, Some(2000));

        scopes.push(ScopeKind::Function { class: None });
        assert_eq!(scopes.region(), Region::Local);
        let inner = scopes.declare("x", Type::Float, None, &mut local).unwrap();
        assert_eq!(inner.address, Some(6000));
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::Float);

        scopes.pop().unwrap();
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::Int);
        assert!(matches!(
            scopes.lookup("y"),
            Err(Error::UndeclaredIdentifier { .. })
        ));
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let (mut global, _) = memories();
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Global);
        scopes.declare("x", Type::Int, None, &mut global).unwrap();
        let err = scopes.declare("x", Type::Bool, None, &mut global).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity { .. }));
    }

    #[test]
    fn test_class_scope_reserves_nothing() {
        let (mut global, _) = memories();
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Global);
        scopes.push(ScopeKind::Class("Point".into()));
        let member = scopes.declare("x", Type::Int, None, &mut global).unwrap();
        assert_eq!(member.address, None);
        assert_eq!(global.describe().ints, 0);
        assert_eq!(scopes.current_class(), Some("Point"));
    }

    #[test]
    fn test_array_reserves_total() {
        let (_, mut local) = memories();
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Function { class: None });
        let shape = ArrayShape::new(&[2, 3]).unwrap();
        let arr = scopes.declare("a", Type::Int, Some(shape), &mut local).unwrap();
        let next = scopes.declare("b", Type::Int, None, &mut local).unwrap();
        assert_eq!(arr.address, Some(7000));
        assert_eq!(arr.cells(), 6);
        assert_eq!(next.address, Some(7006));
    }

    #[test]
    fn test_break_needs_loop() {
        let mut scopes = ScopeStack::new();
        scopes.push(ScopeKind::Function { class: None });
        assert!(!scopes.is_in_loop());
        assert!(scopes.add_break(4).is_err());
        scopes.push(ScopeKind::Loop);
        scopes.push(ScopeKind::Generic);
        assert!(scopes.is_in_loop());
        scopes.add_break(4).unwrap();
        scopes.pop().unwrap();
        assert_eq!(scopes.pop().unwrap().breaks(), &[4]);
    }
}

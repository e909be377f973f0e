//! Classes and heap-less objects
//!
//! An object has no storage of its own. Declaring `C obj;` declares every
//! leaf field as a plain variable named `obj.<path>`. Methods see the fields
//! as `this.<path>` locals; each is paired with a global shadow cell the
//! method writes back to before returning, so the caller can copy the new
//! values into its own `obj.<path>` cells after the call.

use super::CodeGenerator;
use crate::compiler::directory::{FieldBinding, Member};
use crate::compiler::ir::{Operation, Quadruple};
use crate::compiler::scope::{ScopeKind, Symbol};
use crate::compiler::types::Type;
use crate::error::{Error, Result};
use crate::memory::{ArrayShape, Region};

/// Name bound to the receiver inside methods
pub const THIS: &str = "this";

impl CodeGenerator {
    /// `class Name [: Parent] {`
    pub fn begin_class(&mut self, name: &str, parent: Option<&str>) -> Result<()> {
        if self.scopes.is_in_class() || self.current_function.is_some() {
            return Err(Error::semantic(format!(
                "class '{}' must be declared at program level",
                name
            )));
        }
        self.classes.declare(name, parent)?;
        self.scopes.push(ScopeKind::Class(name.to_string()));
        Ok(())
    }

    /// Closing `}` of a class body
    pub fn end_class(&mut self) -> Result<()> {
        match self.scopes.current().map(|s| s.kind()) {
            Some(ScopeKind::Class(_)) => {
                self.scopes.pop()?;
                Ok(())
            }
            _ => Err(Error::semantic("no class body to close")),
        }
    }

    pub(super) fn declare_member(
        &mut self,
        class: &str,
        name: &str,
        ty: Type,
        shape: Option<ArrayShape>,
    ) -> Result<()> {
        if let Type::Class(inner) = &ty {
            if inner == class {
                return Err(Error::type_mismatch(format!(
                    "class '{}' cannot contain a field of its own type",
                    class
                )));
            }
            if !self.classes.contains(inner) {
                return Err(Error::undeclared(inner.as_str()));
            }
            if shape.is_some() {
                return Err(Error::type_mismatch(format!(
                    "'{}.{}': arrays of class instances are not supported",
                    class, name
                )));
            }
        }

        self.classes
            .get_mut(class)
            .ok_or_else(|| Error::undeclared(class))?
            .add_member(Member {
                name: name.to_string(),
                ty: ty.clone(),
                shape: shape.clone(),
                inherited: false,
            })?;
        // Class scopes reserve nothing; the symbol only marks the name as a member
        self.declare_in(Region::Global, name, ty, shape)?;
        Ok(())
    }

    /// Declares `name` as an instance of `class` and every leaf field as
    /// `name.<path>`. Returns the leaf symbols in member order.
    pub(super) fn declare_object(
        &mut self,
        region: Region,
        name: &str,
        class: &str,
    ) -> Result<Vec<Symbol>> {
        let members = self.classes.lookup(class)?.members().to_vec();
        self.declare_in(region, name, Type::Class(class.to_string()), None)?;

        let mut leaves = Vec::new();
        for member in members {
            let path = format!("{}.{}", name, member.name);
            match &member.ty {
                Type::Class(inner) => leaves.extend(self.declare_object(region, &path, inner)?),
                ty => leaves.push(self.declare_in(region, &path, ty.clone(), member.shape)?),
            }
        }
        Ok(leaves)
    }

    /// Declares `this` and its fields in the method's activation memory and
    /// reserves one global shadow per field
    pub(super) fn bind_this(&mut self, class: &str) -> Result<Vec<FieldBinding>> {
        let leaves = self.declare_object(Region::Local, THIS, class)?;
        let mut bindings = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let (Some(local), Some(kind)) = (leaf.address, leaf.ty.kind()) else {
                continue;
            };
            let shadow = self.global.reserve(kind, leaf.cells())?;
            bindings.push(FieldBinding {
                path: leaf.name,
                ty: leaf.ty,
                shape: leaf.shape,
                local,
                shadow,
            });
        }
        Ok(bindings)
    }

    /// Copies every `this` field of the current method to its shadow
    pub(super) fn emit_write_back(&mut self, function: &str) -> Result<()> {
        let bindings = self.functions.lookup(function)?.this_fields.clone();
        for binding in &bindings {
            for i in 0..binding.cells() {
                self.emit(Quadruple::mov(
                    Operation::OptAssign,
                    binding.local + i,
                    binding.shadow + i,
                ));
            }
        }
        Ok(())
    }
}

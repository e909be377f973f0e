//! Function headers, bodies and `return`

use std::collections::HashSet;

use super::{CodeGenerator, MAIN};
use crate::compiler::directory::{FunctionEntry, Parameter};
use crate::compiler::ir::{Operation, Quadruple, Target};
use crate::compiler::scope::ScopeKind;
use crate::compiler::types::{Operand, Type};
use crate::error::{Error, Result};
use crate::memory::{Address, Memory, Region, Resources};

impl CodeGenerator {
    fn check_header(
        &self,
        name: &str,
        return_type: &Type,
        params: &[(String, Type)],
        is_method: bool,
    ) -> Result<()> {
        if name == MAIN && !is_method && (*return_type != Type::Int || !params.is_empty()) {
            return Err(Error::semantic("'main' must be declared as 'int main()'"));
        }
        if let Type::Class(class) = return_type {
            return Err(Error::type_mismatch(format!(
                "function '{}' cannot return an instance of '{}'",
                name, class
            )));
        }
        for (param, ty) in params {
            if !ty.is_simple() {
                return Err(Error::type_mismatch(format!(
                    "parameter '{}' of '{}' must have a simple type, found {}",
                    param, name, ty
                )));
            }
        }
        Ok(())
    }

    fn reserve_return(&mut self, return_type: &Type) -> Result<Option<Address>> {
        match return_type.kind() {
            Some(kind) => Ok(Some(self.global.reserve(kind, 1)?)),
            None => Ok(None),
        }
    }

    /// Header-only declaration `T f(params);`, enabling calls before the body
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: &[(String, Type)],
    ) -> Result<()> {
        if self.scopes.is_in_class() {
            return Err(Error::semantic(format!(
                "method '{}' cannot be forward-declared",
                name
            )));
        }
        if name == MAIN {
            return Err(Error::semantic("'main' cannot be forward-declared"));
        }
        if self.functions.contains(name) {
            return Err(Error::duplicate("function declaration", name));
        }
        self.check_header(name, &return_type, params, false)?;

        // Parameters take the first activation slots, so the body will get the same addresses
        let mut scratch = Memory::new(Region::Local, self.layout);
        let mut seen = HashSet::new();
        let mut declared = Vec::with_capacity(params.len());
        for (param, ty) in params {
            if !seen.insert(param.as_str()) {
                return Err(Error::duplicate("parameter", param));
            }
            let kind = ty
                .kind()
                .ok_or_else(|| Error::type_mismatch(format!("invalid parameter type {}", ty)))?;
            declared.push(Parameter {
                name: param.clone(),
                ty: ty.clone(),
                address: scratch.reserve(kind, 1)?,
            });
        }

        let return_address = self.reserve_return(&return_type)?;
        self.functions.insert(FunctionEntry {
            name: name.to_string(),
            return_type,
            return_address,
            params: declared,
            entry: None,
            resources: Resources::default(),
            defined: false,
            class: None,
            this_fields: Vec::new(),
        })
    }

    /// Opens a function body. Inside a class body this opens a method.
    pub fn begin_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: &[(String, Type)],
    ) -> Result<()> {
        if self.current_function.is_some() {
            return Err(Error::semantic(format!(
                "function '{}' cannot be nested in another function",
                name
            )));
        }
        let class = self.scopes.current_class().map(str::to_string);
        let key = match &class {
            Some(c) => format!("{}.{}", c, name),
            None => name.to_string(),
        };
        self.check_header(name, &return_type, params, class.is_some())?;

        if let Some(existing) = self.functions.get(&key) {
            if existing.defined {
                return Err(Error::duplicate("function body", &key));
            }
            if !existing.signature_matches(&return_type, params) {
                return Err(Error::semantic(format!(
                    "definition of '{}' does not match its declaration",
                    key
                )));
            }
        }

        let entry_index = self.quads.next_index();
        self.local.reset();
        self.scopes.push(ScopeKind::Function {
            class: class.clone(),
        });

        let mut declared = Vec::with_capacity(params.len());
        for (param, ty) in params {
            let symbol = self.declare_in(Region::Local, param, ty.clone(), None)?;
            let address = symbol
                .address
                .ok_or_else(|| Error::type_mismatch(format!("invalid parameter type {}", ty)))?;
            declared.push(Parameter {
                name: param.clone(),
                ty: ty.clone(),
                address,
            });
        }

        match self.functions.get_mut(&key) {
            Some(existing) => {
                existing.params = declared;
                existing.entry = Some(entry_index);
                existing.defined = true;
            }
            None => {
                let return_address = self.reserve_return(&return_type)?;
                self.functions.insert(FunctionEntry {
                    name: key.clone(),
                    return_type,
                    return_address,
                    params: declared,
                    entry: Some(entry_index),
                    resources: Resources::default(),
                    defined: true,
                    class: class.clone(),
                    this_fields: Vec::new(),
                })?;
            }
        }

        if let Some(class) = &class {
            let bindings = self.bind_this(class)?;
            if let Some(entry) = self.functions.get_mut(&key) {
                entry.this_fields = bindings;
            }
            self.classes
                .get_mut(class)
                .ok_or_else(|| Error::undeclared(class.as_str()))?
                .add_method(name, &key)?;
        }

        tracing::debug!(function = %key, entry = entry_index, "begin function");
        self.current_function = Some(key);
        self.has_return = false;
        Ok(())
    }

    /// Closes the current function body: write-backs, `ENDSUB`, footprint
    pub fn end_function(&mut self) -> Result<()> {
        let key = self
            .current_function
            .clone()
            .ok_or_else(|| Error::semantic("no function body to close"))?;
        let returns_value = self.functions.lookup(&key)?.return_type != Type::Void;
        if returns_value && !self.has_return {
            return Err(Error::semantic(format!(
                "missing return statement in function '{}'",
                key
            )));
        }

        self.emit_write_back(&key)?;
        self.emit(Quadruple::new(Operation::EndSub, None, None, Target::None));

        let resources = self.local.describe();
        if let Some(entry) = self.functions.get_mut(&key) {
            entry.resources = resources;
        }
        self.scopes.pop()?;
        self.local.reset();
        self.current_function = None;
        tracing::debug!(function = %key, %resources, "end function");
        Ok(())
    }

    /// `return;` or `return expr;`
    pub fn return_value(&mut self, value: Option<Operand>) -> Result<()> {
        let key = self
            .current_function
            .clone()
            .ok_or_else(|| Error::scope("'return' outside of a function"))?;
        let entry = self.functions.lookup(&key)?;
        let return_type = entry.return_type.clone();
        let return_address = entry.return_address;

        match (value, return_address) {
            (None, None) => {}
            (Some(value), Some(slot)) => {
                if value.ty != return_type {
                    return Err(Error::type_mismatch(format!(
                        "'{}' must return {}, found {}",
                        key, return_type, value.ty
                    )));
                }
                self.emit(Quadruple::mov(Operation::Return, value.address, slot));
            }
            (Some(value), None) => {
                return Err(Error::type_mismatch(format!(
                    "'{}' is void but returns a value of type {}",
                    key, value.ty
                )));
            }
            (None, Some(_)) => {
                return Err(Error::type_mismatch(format!(
                    "'{}' must return a value of type {}",
                    key, return_type
                )));
            }
        }

        self.has_return = true;
        self.emit_write_back(&key)?;
        self.emit(Quadruple::new(Operation::EndSub, None, None, Target::None));
        Ok(())
    }
}

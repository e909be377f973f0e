//! Expressions, assignment and I/O statements

use super::class::THIS;
use super::CodeGenerator;
use crate::compiler::cube;
use crate::compiler::ir::{Operation, Quadruple, Target};
use crate::compiler::scope::Symbol;
use crate::compiler::types::{Operand, Type};
use crate::error::{Error, Result};
use crate::memory::{Address, Value, ValueKind};

impl CodeGenerator {
    pub(super) fn check_this(&self, path: &str) -> Result<()> {
        let uses_this = path == THIS || path.starts_with("this.");
        if uses_this && !self.scopes.is_in_class() {
            return Err(Error::scope("'this' used outside of a class method"));
        }
        Ok(())
    }

    /// Looks up a variable or field path. Members declared after the current
    /// method are not yet part of `this`.
    pub(super) fn resolve(&self, path: &str) -> Result<Symbol> {
        self.check_this(path)?;
        if path.starts_with("this.") && !self.scopes.contains(path) {
            let class = self.scopes.current_class().unwrap_or(THIS);
            return Err(Error::semantic(format!(
                "'{}' is not a member of '{}' declared before this method; \
                 members must be declared before the methods that use them",
                path, class
            )));
        }
        self.scopes.lookup(path).cloned()
    }

    /// Literal: pooled in global memory
    pub fn constant(&mut self, value: Value) -> Result<Operand> {
        let ty = match value.kind() {
            ValueKind::Bool => Type::Bool,
            ValueKind::Float => Type::Float,
            ValueKind::Int => Type::Int,
            ValueKind::String => Type::String,
            ValueKind::Pointer => {
                return Err(Error::type_mismatch("address literals are not supported"))
            }
        };
        let address = self.global.intern(value)?;
        Ok(Operand::new(ty, address))
    }

    /// Scalar variable or field reference (`x`, `p.x`, `this.x`)
    pub fn variable(&mut self, path: &str) -> Result<Operand> {
        let symbol = self.resolve(path)?;
        if symbol.shape.is_some() {
            return Err(Error::type_mismatch(format!(
                "array '{}' must be indexed",
                path
            )));
        }
        match symbol.address {
            Some(address) => Ok(Operand::new(symbol.ty, address)),
            None if symbol.ty.class_name().is_some() => Err(Error::type_mismatch(format!(
                "object '{}' cannot be used as a value",
                path
            ))),
            None => Err(Error::scope(format!(
                "member '{}' must be accessed through 'this'",
                path
            ))),
        }
    }

    /// Array element `v[i0][i1]...`: bounds checks, offset arithmetic and a
    /// pointer cell holding the element's address
    pub fn element(&mut self, path: &str, indices: &[Operand]) -> Result<Operand> {
        let symbol = self.resolve(path)?;
        let shape = symbol
            .shape
            .ok_or_else(|| Error::type_mismatch(format!("'{}' is not an array", path)))?;
        let base = symbol
            .address
            .ok_or_else(|| Error::scope(format!("member '{}' must be accessed through 'this'", path)))?;
        if indices.len() != shape.rank() {
            return Err(Error::type_mismatch(format!(
                "'{}' has {} dimension(s), found {} index(es)",
                path,
                shape.rank(),
                indices.len()
            )));
        }

        let zero = self.global.intern(Value::Int(0))?;
        let mut offset: Option<Address> = None;
        for (index, dim) in indices.iter().zip(shape.dims()) {
            if index.ty != Type::Int {
                return Err(Error::type_mismatch(format!(
                    "index of '{}' must be int, found {}",
                    path, index.ty
                )));
            }
            let upper = self.global.intern(Value::Int(dim.upper))?;
            self.emit(Quadruple::binary(Operation::Ver, index.address, zero, upper));

            let term = if dim.multiplier == 1 {
                index.address
            } else {
                let multiplier = self.global.intern(Value::Int(dim.multiplier))?;
                let product = self.temp(&Type::Int)?;
                self.emit(Quadruple::binary(
                    Operation::Times,
                    index.address,
                    multiplier,
                    product.address,
                ));
                product.address
            };

            offset = Some(match offset {
                None => term,
                Some(acc) => {
                    let sum = self.temp(&Type::Int)?;
                    self.emit(Quadruple::binary(Operation::Plus, acc, term, sum.address));
                    sum.address
                }
            });
        }
        let offset = offset.ok_or_else(|| Error::type_mismatch("array access needs an index"))?;

        let base_const = self.global.intern(Value::Int(base as i64))?;
        let target = self.temp(&Type::Int)?;
        self.emit(Quadruple::binary(
            Operation::Plus,
            offset,
            base_const,
            target.address,
        ));
        let pointer = self.reserve_temp(ValueKind::Pointer)?;
        self.emit(Quadruple::mov(Operation::SavePtr, target.address, pointer));
        Ok(Operand::new(symbol.ty, pointer))
    }

    /// `left op right` into a fresh temporary
    pub fn binary(&mut self, op: Operation, left: Operand, right: Operand) -> Result<Operand> {
        let ty = cube::result_type(&left.ty, op, &right.ty)?;
        let result = self.temp(&ty)?;
        self.emit(Quadruple::binary(
            op,
            left.address,
            right.address,
            result.address,
        ));
        Ok(result)
    }

    /// Unary minus, compiled as `0 - operand`
    pub fn negate(&mut self, operand: Operand) -> Result<Operand> {
        if !operand.ty.is_numeric() {
            return Err(Error::type_mismatch(format!(
                "unary '-' cannot be applied to {}",
                operand.ty
            )));
        }
        let zero = self.constant(Value::Int(0))?;
        self.binary(Operation::Minus, zero, operand)
    }

    /// `target = value;`
    pub fn assign(&mut self, target: Operand, value: Operand) -> Result<()> {
        cube::result_type(&target.ty, Operation::Assign, &value.ty)?;
        self.emit(Quadruple::mov(Operation::Assign, value.address, target.address));
        Ok(())
    }

    /// One `print` argument
    pub fn print(&mut self, value: Operand) -> Result<()> {
        if !value.ty.is_simple() {
            return Err(Error::type_mismatch(format!("cannot print a value of type {}", value.ty)));
        }
        self.emit(Quadruple::new(
            Operation::Print,
            None,
            None,
            Target::Address(value.address),
        ));
        Ok(())
    }

    /// `read(target);` stores one input line
    pub fn read(&mut self, target: Operand) -> Result<()> {
        if target.ty != Type::String {
            return Err(Error::type_mismatch(format!(
                "read target must be a string, found {}",
                target.ty
            )));
        }
        self.emit(Quadruple::new(
            Operation::Read,
            None,
            None,
            Target::Address(target.address),
        ));
        Ok(())
    }
}

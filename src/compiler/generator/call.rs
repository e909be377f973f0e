//! Call sites
//!
//! Arguments are compiled before the call sequence, which is emitted in one
//! go by [`CodeGenerator::end_call`]:
//!
//! ```text
//! ERA f
//! PARAM arg_i -> param_i          (one per argument)
//! OPT_PARAM obj.<path> -> this.<path>   (method calls only)
//! GOSUB f
//! = ret -> tmp                    (non-void functions)
//! OPT_ASSIGN shadow -> obj.<path>       (method calls only)
//! ```

use super::class::THIS;
use super::{CodeGenerator, MAIN};
use crate::compiler::directory::FieldBinding;
use crate::compiler::ir::{Operation, Quadruple, Target};
use crate::compiler::types::Operand;
use crate::error::{Error, Result};
use crate::memory::Address;

/// A call being compiled
#[derive(Debug, Clone)]
pub struct CallSite {
    function: String,
    instance: Option<String>,
    args: Vec<Operand>,
}

impl CallSite {
    /// Directory key of the callee
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl CodeGenerator {
    /// Resolves the callee of `path(...)`; `obj.method` and `this.method` name methods
    pub fn begin_call(&mut self, path: &str) -> Result<CallSite> {
        match path.rsplit_once('.') {
            Some((instance, method)) => {
                self.check_this(instance)?;
                let symbol = self.scopes.lookup(instance)?;
                let class = symbol.ty.class_name().ok_or_else(|| {
                    Error::type_mismatch(format!("'{}' is not an object", instance))
                })?;
                let function = match self.classes.lookup(class)?.method(method) {
                    Some(found) => found.function.clone(),
                    None if self.scopes.current_class() == Some(class) => {
                        return Err(Error::semantic(format!(
                            "method '{}.{}' is called before its definition; \
                             methods must be defined before the methods that call them",
                            class, method
                        )));
                    }
                    None => return Err(Error::undeclared(format!("{}.{}", class, method))),
                };
                Ok(CallSite {
                    function,
                    instance: Some(instance.to_string()),
                    args: Vec::new(),
                })
            }
            None => {
                if path == MAIN {
                    return Err(Error::semantic("'main' cannot be called"));
                }
                if !self.functions.contains(path) {
                    return Err(Error::undeclared(path));
                }
                Ok(CallSite {
                    function: path.to_string(),
                    instance: None,
                    args: Vec::new(),
                })
            }
        }
    }

    /// Records one evaluated argument
    pub fn call_argument(&mut self, site: &mut CallSite, arg: Operand) {
        site.args.push(arg);
    }

    /// Emits the call sequence; returns the copied return value for non-void callees
    pub fn end_call(&mut self, site: CallSite) -> Result<Option<Operand>> {
        let entry = self.functions.lookup(&site.function)?.clone();
        if site.args.len() != entry.params.len() {
            return Err(Error::type_mismatch(format!(
                "'{}' expects {} argument(s), found {}",
                entry.name,
                entry.params.len(),
                site.args.len()
            )));
        }
        for (i, (arg, param)) in site.args.iter().zip(&entry.params).enumerate() {
            if !param.ty.accepts_argument(&arg.ty) {
                return Err(Error::type_mismatch(format!(
                    "argument {} of '{}' must be {}, found {}",
                    i + 1,
                    entry.name,
                    param.ty,
                    arg.ty
                )));
            }
        }
        if !entry.defined && !self.unresolved_calls.contains(&entry.name) {
            self.unresolved_calls.push(entry.name.clone());
        }

        let fields = match &site.instance {
            Some(instance) => self.caller_fields(instance, &entry.this_fields),
            None => Vec::new(),
        };

        let callee = Target::Function(entry.name.clone());
        self.emit(Quadruple::new(Operation::Era, None, None, callee.clone()));
        for (arg, param) in site.args.iter().zip(&entry.params) {
            self.emit(Quadruple::mov(Operation::Param, arg.address, param.address));
        }
        for (caller, binding) in &fields {
            for i in 0..binding.cells() {
                self.emit(Quadruple::mov(
                    Operation::OptParam,
                    caller + i,
                    binding.local + i,
                ));
            }
        }
        self.emit(Quadruple::new(Operation::Gosub, None, None, callee));

        let result = match entry.return_address {
            Some(slot) => {
                let tmp = self.temp(&entry.return_type)?;
                self.emit(Quadruple::mov(Operation::Assign, slot, tmp.address));
                Some(tmp)
            }
            None => None,
        };

        for (caller, binding) in &fields {
            for i in 0..binding.cells() {
                self.emit(Quadruple::mov(
                    Operation::OptAssign,
                    binding.shadow + i,
                    caller + i,
                ));
            }
        }
        Ok(result)
    }

    /// Like [`end_call`](Self::end_call) for calls used as expressions
    pub fn end_call_value(&mut self, site: CallSite) -> Result<Operand> {
        let name = site.function.clone();
        self.end_call(site)?.ok_or_else(|| {
            Error::type_mismatch(format!("void function '{}' used as a value", name))
        })
    }

    /// Pairs each `this.<path>` binding with the caller's `instance.<path>` cell
    fn caller_fields(
        &self,
        instance: &str,
        bindings: &[FieldBinding],
    ) -> Vec<(Address, FieldBinding)> {
        let mut fields = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let suffix = binding.path.strip_prefix(THIS).unwrap_or(&binding.path);
            let caller_path = format!("{}{}", instance, suffix);
            let address = self
                .scopes
                .find(&caller_path)
                .filter(|symbol| symbol.cells() == binding.cells())
                .and_then(|symbol| symbol.address);
            match address {
                Some(address) => fields.push((address, binding.clone())),
                None => {
                    tracing::warn!(
                        field = %caller_path,
                        "instance field not declared in the calling context; copy skipped"
                    );
                }
            }
        }
        fields
    }
}

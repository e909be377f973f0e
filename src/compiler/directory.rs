//! # Function and class directories
//!
//! Compile-time tables of every function (free functions by name, methods as
//! `Class.method`) and every class with its flattened member and method lists.

use std::collections::HashMap;

use super::artifact::FunctionRecord;
use super::types::Type;
use crate::error::{Error, Result};
use crate::memory::{Address, ArrayShape, Resources};

/// A formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type (always simple)
    pub ty: Type,
    /// Activation-memory address
    pub address: Address,
}

/// A `this.<path>` field visible inside a method
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    /// Dotted path starting with `this`
    pub path: String,
    /// Field type (always simple)
    pub ty: Type,
    /// Array layout of the field
    pub shape: Option<ArrayShape>,
    /// Address inside the method's activation memory
    pub local: Address,
    /// Global cell the method writes the field back to
    pub shadow: Address,
}

impl FieldBinding {
    /// Number of cells the field spans
    pub fn cells(&self) -> usize {
        self.shape.as_ref().map_or(1, |s| s.total())
    }
}

/// Everything known about one function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    /// Directory key (`name` or `Class.name`)
    pub name: String,
    /// Declared return type
    pub return_type: Type,
    /// Global slot receiving the return value (`None` for void)
    pub return_address: Option<Address>,
    /// Formal parameters in order
    pub params: Vec<Parameter>,
    /// Index of the first quadruple of the body
    pub entry: Option<usize>,
    /// Activation footprint, known once the body is finished
    pub resources: Resources,
    /// False for a header-only (forward) declaration
    pub defined: bool,
    /// Owning class for methods
    pub class: Option<String>,
    /// Instance fields copied in and out around method calls
    pub this_fields: Vec<FieldBinding>,
}

impl FunctionEntry {
    /// True when `return_type` and the parameter types match this entry
    pub fn signature_matches(&self, return_type: &Type, params: &[(String, Type)]) -> bool {
        self.return_type == *return_type
            && self.params.len() == params.len()
            && self
                .params
                .iter()
                .zip(params)
                .all(|(have, (_, ty))| have.ty == *ty)
    }
}

/// Table of functions in declaration order
#[derive(Debug, Clone, Default)]
pub struct FunctionDirectory {
    entries: HashMap<String, FunctionEntry>,
    order: Vec<String>,
}

impl FunctionDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new entry; fails if the name is taken
    pub fn insert(&mut self, entry: FunctionEntry) -> Result<()> {
        if self.entries.contains_key(&entry.name) {
            return Err(Error::duplicate("function", &entry.name));
        }
        tracing::debug!(function = %entry.name, defined = entry.defined, "register function");
        self.order.push(entry.name.clone());
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Entry by key
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    /// Mutable entry by key
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FunctionEntry> {
        self.entries.get_mut(name)
    }

    /// Entry by key or `UndeclaredIdentifier`
    pub fn lookup(&self, name: &str) -> Result<&FunctionEntry> {
        self.get(name).ok_or_else(|| Error::undeclared(name))
    }

    /// True when a function with this key exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.order.iter().filter_map(move |name| self.entries.get(name))
    }

    /// Function table of the artifact (defined functions only)
    pub fn records(&self) -> Vec<FunctionRecord> {
        self.iter()
            .filter_map(|entry| {
                entry.entry.map(|start| FunctionRecord {
                    name: entry.name.clone(),
                    entry: start,
                    resources: entry.resources,
                })
            })
            .collect()
    }
}

/// A data member of a class
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Member name
    pub name: String,
    /// Declared type (simple or class)
    pub ty: Type,
    /// Array layout
    pub shape: Option<ArrayShape>,
    /// Copied from the parent class
    pub inherited: bool,
}

/// A method of a class
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Function-directory key of the implementation
    pub function: String,
    /// Copied from the parent class
    pub inherited: bool,
}

/// A class with its parent's members and methods flattened in
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Class name
    pub name: String,
    /// Parent class
    pub parent: Option<String>,
    members: Vec<Member>,
    methods: Vec<Method>,
}

impl ClassEntry {
    fn new(name: &str, parent: Option<&ClassEntry>) -> Self {
        let (members, methods) = match parent {
            Some(p) => (
                p.members
                    .iter()
                    .map(|m| Member {
                        inherited: true,
                        ..m.clone()
                    })
                    .collect(),
                p.methods
                    .iter()
                    .map(|m| Method {
                        inherited: true,
                        ..m.clone()
                    })
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            name: name.to_string(),
            parent: parent.map(|p| p.name.clone()),
            members,
            methods,
        }
    }

    /// Adds a member; an inherited member of the same name is overridden
    pub fn add_member(&mut self, member: Member) -> Result<()> {
        match self.members.iter().position(|m| m.name == member.name) {
            Some(i) if self.members[i].inherited => {
                self.members[i] = member;
                Ok(())
            }
            Some(_) => Err(Error::duplicate("member", format!("{}.{}", self.name, member.name))),
            None => {
                self.members.push(member);
                Ok(())
            }
        }
    }

    /// Adds a method; an inherited method of the same name is overridden
    pub fn add_method(&mut self, name: &str, function: &str) -> Result<()> {
        let method = Method {
            name: name.to_string(),
            function: function.to_string(),
            inherited: false,
        };
        match self.methods.iter().position(|m| m.name == name) {
            Some(i) if self.methods[i].inherited => {
                self.methods[i] = method;
                Ok(())
            }
            Some(_) => Err(Error::duplicate("method", format!("{}.{}", self.name, name))),
            None => {
                self.methods.push(method);
                Ok(())
            }
        }
    }

    /// Member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Method by name
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Members in declaration order (inherited first)
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Methods in declaration order (inherited first)
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

/// Table of classes in declaration order
#[derive(Debug, Clone, Default)]
pub struct ClassDirectory {
    classes: HashMap<String, ClassEntry>,
    order: Vec<String>,
}

impl ClassDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a class, copying in its parent's members and methods
    pub fn declare(&mut self, name: &str, parent: Option<&str>) -> Result<&mut ClassEntry> {
        if self.classes.contains_key(name) {
            return Err(Error::duplicate("class", name));
        }
        let entry = match parent {
            Some(p) => {
                let parent_entry = self.classes.get(p).ok_or_else(|| Error::undeclared(p))?;
                ClassEntry::new(name, Some(parent_entry))
            }
            None => ClassEntry::new(name, None),
        };
        tracing::debug!(class = name, parent = ?parent, "register class");
        self.order.push(name.to_string());
        Ok(self.classes.entry(name.to_string()).or_insert(entry))
    }

    /// Class by name
    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    /// Mutable class by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassEntry> {
        self.classes.get_mut(name)
    }

    /// Class by name or `UndeclaredIdentifier`
    pub fn lookup(&self, name: &str) -> Result<&ClassEntry> {
        self.get(name).ok_or_else(|| Error::undeclared(name))
    }

    /// True when the class exists
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Classes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.order.iter().filter_map(move |name| self.classes.get(name))
    }
}

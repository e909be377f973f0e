//! # Compiled artifact
//!
//! The unit handed from the compiler to the VM, with its line-oriented text
//! form:
//!
//! ```text
//! %%global_resources
//! b,f,i,s,p
//! %%global_memory
//! address,value
//! %%functions
//! name,entry,b,f,i,s,p
//! %%quadruples
//! op,left,right,result
//! ```
//!
//! Lines starting with `#` are comments. Absent values are written `None`.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::ir::{Operation, Quadruple, Target};
use crate::error::{Error, Result};
use crate::memory::{Address, MemoryLayout, Resources, Value, ValueKind};

const NONE: &str = "None";

/// Entry of the `%%functions` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function key (`name` or `Class.method`)
    pub name: String,
    /// Index of the first quadruple
    pub entry: usize,
    /// Activation footprint
    pub resources: Resources,
}

/// A compiled program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Artifact {
    /// Size of the global memory
    pub global_resources: Resources,
    /// Initial global cells (pooled constants, unwritten globals)
    pub global_memory: Vec<(Address, Option<Value>)>,
    /// Function table
    pub functions: Vec<FunctionRecord>,
    /// Instruction stream
    pub quadruples: Vec<Quadruple>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    GlobalResources,
    GlobalMemory,
    Functions,
    Quadruples,
}

impl Segment {
    fn sentinel(self) -> &'static str {
        match self {
            Segment::GlobalResources => "%%global_resources",
            Segment::GlobalMemory => "%%global_memory",
            Segment::Functions => "%%functions",
            Segment::Quadruples => "%%quadruples",
        }
    }

    fn from_sentinel(line: &str) -> Option<Self> {
        [
            Segment::GlobalResources,
            Segment::GlobalMemory,
            Segment::Functions,
            Segment::Quadruples,
        ]
        .into_iter()
        .find(|s| s.sentinel() == line)
    }
}

impl Artifact {
    /// Looks up a function record by name
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Renders the text form
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(Segment::GlobalResources.sentinel());
        out.push('\n');
        let _ = writeln!(out, "{}", self.global_resources);

        out.push_str(Segment::GlobalMemory.sentinel());
        out.push('\n');
        for (address, value) in &self.global_memory {
            let _ = writeln!(out, "{},{}", address, encode_value(value.as_ref()));
        }

        out.push_str(Segment::Functions.sentinel());
        out.push('\n');
        for f in &self.functions {
            let _ = writeln!(out, "{},{},{}", f.name, f.entry, f.resources);
        }

        out.push_str(Segment::Quadruples.sentinel());
        out.push('\n');
        for quad in &self.quadruples {
            let _ = writeln!(out, "{}", quad);
        }
        out
    }

    /// Parses the text form using the default memory layout
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_layout(text, MemoryLayout::default())
    }

    /// Parses the text form; `layout` decides the kind of each global cell
    pub fn parse_with_layout(text: &str, layout: MemoryLayout) -> Result<Self> {
        let mut artifact = Artifact::default();
        let mut segment: Option<Segment> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("%%") {
                segment = Some(Segment::from_sentinel(line).ok_or_else(|| {
                    artifact_error(line_no, format!("unknown segment '{}'", line))
                })?);
                continue;
            }

            match segment {
                None => {
                    return Err(artifact_error(line_no, "data before the first segment"));
                }
                Some(Segment::GlobalResources) => {
                    artifact.global_resources = parse_resources(line, line_no)?;
                }
                Some(Segment::GlobalMemory) => {
                    let (address, value) = line
                        .split_once(',')
                        .ok_or_else(|| artifact_error(line_no, "expected 'address,value'"))?;
                    let address = parse_number(address, line_no)?;
                    let kind = layout.kind_of(address).ok_or_else(|| {
                        artifact_error(line_no, format!("address {} is out of range", address))
                    })?;
                    let value = decode_value(value, kind, line_no)?;
                    artifact.global_memory.push((address, value));
                }
                Some(Segment::Functions) => {
                    let (name, rest) = line
                        .split_once(',')
                        .ok_or_else(|| artifact_error(line_no, "expected 'name,entry,b,f,i,s,p'"))?;
                    let (entry, resources) = rest
                        .split_once(',')
                        .ok_or_else(|| artifact_error(line_no, "expected 'name,entry,b,f,i,s,p'"))?;
                    artifact.functions.push(FunctionRecord {
                        name: name.to_string(),
                        entry: parse_number(entry, line_no)?,
                        resources: parse_resources(resources, line_no)?,
                    });
                }
                Some(Segment::Quadruples) => {
                    artifact.quadruples.push(parse_quadruple(line, line_no)?);
                }
            }
        }
        Ok(artifact)
    }
}

fn artifact_error(line: usize, message: impl Into<String>) -> Error {
    Error::ArtifactError {
        line,
        message: message.into(),
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, line: usize) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| artifact_error(line, format!("invalid number '{}'", text)))
}

fn parse_resources(text: &str, line: usize) -> Result<Resources> {
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 5 {
        return Err(artifact_error(line, "expected five resource counts"));
    }
    let mut counts = [0usize; 5];
    for (slot, field) in counts.iter_mut().zip(fields) {
        *slot = parse_number(field, line)?;
    }
    Ok(Resources::from_counts(counts))
}

fn parse_operand(text: &str, line: usize) -> Result<Option<Address>> {
    if text == NONE {
        Ok(None)
    } else {
        parse_number(text, line).map(Some)
    }
}

fn parse_quadruple(text: &str, line: usize) -> Result<Quadruple> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(artifact_error(line, "expected 'op,left,right,result'"));
    }
    let op = Operation::from_symbol(fields[0])
        .ok_or_else(|| artifact_error(line, format!("unknown operation '{}'", fields[0])))?;
    let left = parse_operand(fields[1], line)?;
    let right = parse_operand(fields[2], line)?;
    let result = match fields[3] {
        NONE => Target::None,
        text if op.is_jump() => Target::Jump(parse_number(text, line)?),
        text if op.targets_function() => Target::Function(text.to_string()),
        text => Target::Address(parse_number(text, line)?),
    };
    Ok(Quadruple::new(op, left, right, result))
}

fn encode_value(value: Option<&Value>) -> String {
    match value {
        None => NONE.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(x)) => format!("{:?}", x),
        Some(Value::Str(s)) => escape(s),
        Some(Value::Pointer(a)) => a.to_string(),
    }
}

fn decode_value(text: &str, kind: ValueKind, line: usize) -> Result<Option<Value>> {
    if text == NONE {
        return Ok(None);
    }
    let value = match kind {
        ValueKind::Bool => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => return Err(artifact_error(line, format!("invalid bool '{}'", other))),
        },
        ValueKind::Float => Value::Float(parse_number(text, line)?),
        ValueKind::Int => Value::Int(parse_number(text, line)?),
        ValueKind::String => Value::Str(unescape(text, line)?),
        ValueKind::Pointer => Value::Pointer(parse_number(text, line)?),
    };
    Ok(Some(value))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unescape(text: &str, line: usize) -> Result<String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| artifact_error(line, "string values must be quoted"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            other => {
                return Err(artifact_error(
                    line,
                    format!("invalid escape sequence '\\{}'", other.unwrap_or(' ')),
                ))
            }
        }
    }
    Ok(out)
}

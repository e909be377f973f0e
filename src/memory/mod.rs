//! # Typed, segmented memory
//!
//! The address space is split into two regions (global and activation), each
//! made of five contiguous typed segments of `chunk_size` cells:
//!
//! ```text
//! global:      bool [0, C)   float [C, 2C)   int [2C, 3C)   string [3C, 4C)   pointer [4C, 5C)
//! activation:  bool [5C, 6C) float [6C, 7C)  int [7C, 8C)   string [8C, 9C)   pointer [9C, 10C)
//! ```
//!
//! The kind of a cell is derived from its address alone; no per-cell tag is
//! stored. Compiler and VM share this module: the compiler reserves addresses
//! and interns constants, the VM reads and writes values.

mod array;

pub use array::{ArrayShape, Dimension};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Flat memory address
pub type Address = usize;

/// Default number of cells per segment
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Storage kind of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Boolean cells
    Bool,
    /// 64-bit floating point cells
    Float,
    /// 64-bit integer cells
    Int,
    /// String cells
    String,
    /// Cells holding an address (array element indirection)
    Pointer,
}

impl ValueKind {
    /// All kinds in segment order
    pub const ALL: [ValueKind; 5] = [
        ValueKind::Bool,
        ValueKind::Float,
        ValueKind::Int,
        ValueKind::String,
        ValueKind::Pointer,
    ];

    /// Position of the kind's segment inside a region
    pub fn index(self) -> usize {
        match self {
            ValueKind::Bool => 0,
            ValueKind::Float => 1,
            ValueKind::Int => 2,
            ValueKind::String => 3,
            ValueKind::Pointer => 4,
        }
    }

    /// Lowercase name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::String => "string",
            ValueKind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which half of the address space a memory covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// Whole-program storage: globals, constants, return slots, shadows
    Global,
    /// Per-call activation record
    Local,
}

/// Address-space geometry shared by the compiler and the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Cells per segment
    pub chunk_size: usize,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl MemoryLayout {
    /// Creates a layout with the given segment width
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// First address of a region
    pub fn region_base(&self, region: Region) -> Address {
        match region {
            Region::Global => 0,
            Region::Local => ValueKind::ALL.len() * self.chunk_size,
        }
    }

    /// First address of one typed segment
    pub fn segment_base(&self, region: Region, kind: ValueKind) -> Address {
        self.region_base(region) + kind.index() * self.chunk_size
    }

    /// Region an address falls in
    pub fn region_of(&self, address: Address) -> Region {
        if address < self.region_base(Region::Local) {
            Region::Global
        } else {
            Region::Local
        }
    }

    /// Splits an address into (region, kind, offset inside the segment)
    pub fn decode(&self, address: Address) -> Option<(Region, ValueKind, usize)> {
        let region = self.region_of(address);
        let relative = address - self.region_base(region);
        let segment = relative / self.chunk_size;
        let kind = *ValueKind::ALL.get(segment)?;
        Some((region, kind, relative % self.chunk_size))
    }

    /// Kind of the segment containing an address
    pub fn kind_of(&self, address: Address) -> Option<ValueKind> {
        self.decode(address).map(|(_, kind, _)| kind)
    }
}

/// Runtime value stored in a memory cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// 64-bit floating-point value
    Float(f64),
    /// 64-bit integer value
    Int(i64),
    /// String value
    Str(String),
    /// Address stored in a pointer cell
    Pointer(Address),
}

impl Value {
    /// Segment kind this value naturally belongs to
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Float(_) => ValueKind::Float,
            Value::Int(_) => ValueKind::Int,
            Value::Str(_) => ValueKind::String,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    /// Converts the value for storage in a segment of `kind`.
    /// Only int/float promotion and narrowing are allowed.
    pub fn coerce_to(self, kind: ValueKind) -> Option<Value> {
        match (self, kind) {
            (Value::Int(i), ValueKind::Float) => Some(Value::Float(i as f64)),
            (Value::Float(f), ValueKind::Int) => Some(Value::Int(f as i64)),
            (value, kind) if value.kind() == kind => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::Pointer(a) => write!(f, "&{}", a),
        }
    }
}

/// Per-kind slot counts of a memory (the resource footprint of a function)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Number of bool cells
    pub bools: usize,
    /// Number of float cells
    pub floats: usize,
    /// Number of int cells
    pub ints: usize,
    /// Number of string cells
    pub strings: usize,
    /// Number of pointer cells
    pub pointers: usize,
}

impl Resources {
    /// Builds a footprint from counts in segment order
    pub fn from_counts(counts: [usize; 5]) -> Self {
        Self {
            bools: counts[0],
            floats: counts[1],
            ints: counts[2],
            strings: counts[3],
            pointers: counts[4],
        }
    }

    /// Count for one kind
    pub fn get(&self, kind: ValueKind) -> usize {
        match kind {
            ValueKind::Bool => self.bools,
            ValueKind::Float => self.floats,
            ValueKind::Int => self.ints,
            ValueKind::String => self.strings,
            ValueKind::Pointer => self.pointers,
        }
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.bools, self.floats, self.ints, self.strings, self.pointers
        )
    }
}

/// Five parallel typed banks covering one region of the address space
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    layout: MemoryLayout,
    region: Region,
    bools: Vec<Option<bool>>,
    floats: Vec<Option<f64>>,
    ints: Vec<Option<i64>>,
    strings: Vec<Option<String>>,
    pointers: Vec<Option<Address>>,
}

impl Memory {
    /// Creates an empty memory for a region
    pub fn new(region: Region, layout: MemoryLayout) -> Self {
        Self {
            layout,
            region,
            bools: Vec::new(),
            floats: Vec::new(),
            ints: Vec::new(),
            strings: Vec::new(),
            pointers: Vec::new(),
        }
    }

    /// Creates a memory with every slot of a footprint reserved but unwritten
    pub fn with_resources(
        region: Region,
        layout: MemoryLayout,
        resources: &Resources,
    ) -> Result<Self> {
        let mut memory = Self::new(region, layout);
        for kind in ValueKind::ALL {
            let count = resources.get(kind);
            if count > 0 {
                memory.reserve(kind, count)?;
            }
        }
        Ok(memory)
    }

    /// Region covered by this memory
    pub fn region(&self) -> Region {
        self.region
    }

    /// Address-space geometry
    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    fn len(&self, kind: ValueKind) -> usize {
        match kind {
            ValueKind::Bool => self.bools.len(),
            ValueKind::Float => self.floats.len(),
            ValueKind::Int => self.ints.len(),
            ValueKind::String => self.strings.len(),
            ValueKind::Pointer => self.pointers.len(),
        }
    }

    /// Appends `count` unwritten slots of `kind` and returns the first address
    pub fn reserve(&mut self, kind: ValueKind, count: usize) -> Result<Address> {
        let len = self.len(kind);
        if len + count > self.layout.chunk_size {
            return Err(Error::CapacityExceeded {
                kind: kind.name().to_string(),
                limit: self.layout.chunk_size,
            });
        }
        let new_len = len + count;
        match kind {
            ValueKind::Bool => self.bools.resize(new_len, None),
            ValueKind::Float => self.floats.resize(new_len, None),
            ValueKind::Int => self.ints.resize(new_len, None),
            ValueKind::String => self.strings.resize(new_len, None),
            ValueKind::Pointer => self.pointers.resize(new_len, None),
        }
        Ok(self.layout.segment_base(self.region, kind) + len)
    }

    /// Reserves one slot of the value's kind and writes the value into it
    pub fn append(&mut self, value: Value) -> Result<Address> {
        let address = self.reserve(value.kind(), 1)?;
        self.set(address, value)?;
        Ok(address)
    }

    /// Address of the first cell holding exactly `value`
    pub fn find(&self, value: &Value) -> Option<Address> {
        let offset = match value {
            Value::Bool(b) => self.bools.iter().position(|c| c.as_ref() == Some(b)),
            Value::Float(x) => self.floats.iter().position(|c| c.as_ref() == Some(x)),
            Value::Int(i) => self.ints.iter().position(|c| c.as_ref() == Some(i)),
            Value::Str(s) => self.strings.iter().position(|c| c.as_ref() == Some(s)),
            Value::Pointer(a) => self.pointers.iter().position(|c| c.as_ref() == Some(a)),
        }?;
        Some(self.layout.segment_base(self.region, value.kind()) + offset)
    }

    /// Constant pooling: reuses an existing cell holding `value` or appends one
    pub fn intern(&mut self, value: Value) -> Result<Address> {
        match self.find(&value) {
            Some(address) => Ok(address),
            None => self.append(value),
        }
    }

    fn locate(&self, address: Address) -> Result<(ValueKind, usize)> {
        match self.layout.decode(address) {
            Some((region, kind, offset)) if region == self.region && offset < self.len(kind) => {
                Ok((kind, offset))
            }
            _ => Err(Error::InvalidAddress { address }),
        }
    }

    /// True when `address` names a reserved cell of this memory
    pub fn contains(&self, address: Address) -> bool {
        self.locate(address).is_ok()
    }

    /// Reads a cell; `None` when the cell was never written
    pub fn get(&self, address: Address) -> Result<Option<Value>> {
        let (kind, offset) = self.locate(address)?;
        Ok(match kind {
            ValueKind::Bool => self.bools[offset].map(Value::Bool),
            ValueKind::Float => self.floats[offset].map(Value::Float),
            ValueKind::Int => self.ints[offset].map(Value::Int),
            ValueKind::String => self.strings[offset].clone().map(Value::Str),
            ValueKind::Pointer => self.pointers[offset].map(Value::Pointer),
        })
    }

    /// Writes a cell, coercing int/float values to the segment's kind
    pub fn set(&mut self, address: Address, value: Value) -> Result<()> {
        let (kind, offset) = self.locate(address)?;
        let found = value.kind();
        let value = value.coerce_to(kind).ok_or_else(|| {
            Error::runtime(format!(
                "cannot store a {} value at {} address {}",
                found, kind, address
            ))
        })?;
        match value {
            Value::Bool(b) => self.bools[offset] = Some(b),
            Value::Float(x) => self.floats[offset] = Some(x),
            Value::Int(i) => self.ints[offset] = Some(i),
            Value::Str(s) => self.strings[offset] = Some(s),
            Value::Pointer(a) => self.pointers[offset] = Some(a),
        }
        Ok(())
    }

    /// Marks a cell as never written
    pub fn clear(&mut self, address: Address) -> Result<()> {
        let (kind, offset) = self.locate(address)?;
        match kind {
            ValueKind::Bool => self.bools[offset] = None,
            ValueKind::Float => self.floats[offset] = None,
            ValueKind::Int => self.ints[offset] = None,
            ValueKind::String => self.strings[offset] = None,
            ValueKind::Pointer => self.pointers[offset] = None,
        }
        Ok(())
    }

    /// True when the address lies in a pointer segment
    pub fn is_pointer(&self, address: Address) -> bool {
        self.layout.kind_of(address) == Some(ValueKind::Pointer)
    }

    /// Per-kind slot counts
    pub fn describe(&self) -> Resources {
        Resources {
            bools: self.bools.len(),
            floats: self.floats.len(),
            ints: self.ints.len(),
            strings: self.strings.len(),
            pointers: self.pointers.len(),
        }
    }

    /// Drops every slot (the compiler reuses one activation memory per function)
    pub fn reset(&mut self) {
        self.bools.clear();
        self.floats.clear();
        self.ints.clear();
        self.strings.clear();
        self.pointers.clear();
    }

    /// All reserved cells in address order
    pub fn cells(&self) -> Vec<(Address, Option<Value>)> {
        let mut cells = Vec::new();
        for kind in ValueKind::ALL {
            let base = self.layout.segment_base(self.region, kind);
            for offset in 0..self.len(kind) {
                let address = base + offset;
                let value = self.get(address).ok().flatten();
                cells.push((address, value));
            }
        }
        cells
    }
}

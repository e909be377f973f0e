//! Row-major array layout calculator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// One dimension of an array declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Declared bound (valid indexes are `0..upper`)
    pub upper: i64,
    /// Product of this bound and every bound before it
    pub size: i64,
    /// Stride applied to this dimension's index when linearizing
    pub multiplier: i64,
}

/// Layout metadata for a declared array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayShape {
    dims: Vec<Dimension>,
    total: i64,
}

impl ArrayShape {
    /// Builds the layout for `bounds`, e.g. `[2, 3]` for `a[2][3]`
    pub fn new(bounds: &[i64]) -> Result<Self> {
        if bounds.is_empty() {
            return Err(Error::semantic("an array needs at least one dimension"));
        }

        let mut dims: Vec<Dimension> = Vec::with_capacity(bounds.len());
        for &upper in bounds {
            if upper <= 0 {
                return Err(Error::InvalidDimension { size: upper });
            }
            let size = match dims.last() {
                Some(prev) => prev
                    .size
                    .checked_mul(upper)
                    .ok_or_else(|| Error::semantic("array is too large"))?,
                None => upper,
            };
            dims.push(Dimension {
                upper,
                size,
                multiplier: 0,
            });
        }

        let total = dims[dims.len() - 1].size;
        let mut running = total;
        for dim in dims.iter_mut() {
            running /= dim.upper;
            dim.multiplier = running;
        }

        Ok(Self { dims, total })
    }

    /// Per-dimension metadata in declaration order
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total element count
    pub fn total(&self) -> usize {
        self.total as usize
    }

    /// Linear offset of a multi-index, `None` on rank mismatch or out-of-range index
    pub fn linearize(&self, indices: &[i64]) -> Option<i64> {
        if indices.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (index, dim) in indices.iter().zip(&self.dims) {
            if *index < 0 || *index >= dim.upper {
                return None;
            }
            offset += index * dim.multiplier;
        }
        Some(offset)
    }
}

impl fmt::Display for ArrayShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let table: Vec<String> = self
            .dims
            .iter()
            .map(|d| format!("<{},{},{}>", d.upper, d.size, d.multiplier))
            .collect();
        write!(f, "<size:{},table:[{}]>", self.total, table.join(","))
    }
}

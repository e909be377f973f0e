//! Quadruple stream with backpatching

use super::instruction::{Operation, Quadruple, Target};
use crate::error::{Error, Result};
use crate::memory::Address;

/// Append-only list of quadruples; only jump targets are patched after the fact
#[derive(Debug, Clone, Default)]
pub struct QuadrupleStream {
    quads: Vec<Quadruple>,
}

impl QuadrupleStream {
    /// Creates an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a quadruple and returns its index
    pub fn emit(&mut self, quad: Quadruple) -> usize {
        let index = self.quads.len();
        tracing::trace!(index, quad = %quad, "emit");
        self.quads.push(quad);
        index
    }

    /// Emits a jump whose target is filled in later
    pub fn emit_jump(&mut self, op: Operation, condition: Option<Address>) -> usize {
        self.emit(Quadruple::new(op, condition, None, Target::None))
    }

    /// Index the next emitted quadruple will get
    pub fn next_index(&self) -> usize {
        self.quads.len()
    }

    /// Sets the jump target of the quadruple at `index`
    pub fn patch(&mut self, index: usize, target: usize) -> Result<()> {
        let quad = self
            .quads
            .get_mut(index)
            .ok_or_else(|| Error::semantic(format!("cannot patch missing quadruple {}", index)))?;
        if !quad.op.is_jump() {
            return Err(Error::semantic(format!(
                "quadruple {} ({}) is not a jump",
                index, quad.op
            )));
        }
        tracing::trace!(index, target, "patch");
        quad.result = Target::Jump(target);
        Ok(())
    }

    /// Points the jump at `index` to the next quadruple to be emitted
    pub fn patch_here(&mut self, index: usize) -> Result<()> {
        let here = self.next_index();
        self.patch(index, here)
    }

    /// Quadruple at `index`
    pub fn get(&self, index: usize) -> Option<&Quadruple> {
        self.quads.get(index)
    }

    /// Number of quadruples
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// True when nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Quadruples in emission order
    pub fn iter(&self) -> impl Iterator<Item = &Quadruple> {
        self.quads.iter()
    }

    /// Clones the quadruples out
    pub fn to_vec(&self) -> Vec<Quadruple> {
        self.quads.clone()
    }
}

/// Pending jump / loop-start indexes
#[derive(Debug, Clone, Default)]
pub struct JumpStack {
    stack: Vec<usize>,
}

impl JumpStack {
    /// Creates an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an index
    pub fn push(&mut self, index: usize) {
        self.stack.push(index);
    }

    /// Pops the most recent index
    pub fn pop(&mut self) -> Result<usize> {
        self.stack
            .pop()
            .ok_or_else(|| Error::semantic("unbalanced control flow: jump stack is empty"))
    }

    /// True when no jumps are pending
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backpatch_forward_jump() {
        let mut stream = QuadrupleStream::new();
        let jump = stream.emit_jump(Operation::GotoF, Some(0));
        stream.emit(Quadruple::mov(Operation::Assign, 2000, 7000));
        stream.patch_here(jump).unwrap();
        assert_eq!(stream.get(jump).unwrap().result, Target::Jump(2));
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_patch_rejects_non_jump() {
        let mut stream = QuadrupleStream::new();
        let idx = stream.emit(Quadruple::mov(Operation::Assign, 2000, 7000));
        assert!(stream.patch(idx, 0).is_err());
        assert!(stream.patch(5, 0).is_err());
    }

    #[test]
    fn test_jump_stack_underflow() {
        let mut jumps = JumpStack::new();
        jumps.push(3);
        assert_eq!(jumps.pop().unwrap(), 3);
        assert!(jumps.pop().is_err());
    }
}

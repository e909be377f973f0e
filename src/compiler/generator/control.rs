//! Control flow with backpatching
//!
//! ```text
//! while:  M: cond; GOTOF X; body; GOTO M; X:
//! if:     cond; GOTOF N1; body; GOTO E; N1: cond; GOTOF N2; body; GOTO E; N2: else; E:
//! for:    init; C: cond; GOTOF X; GOTO B; S: step; GOTO C; B: body; GOTO S; X:
//! ```

use super::CodeGenerator;
use crate::compiler::ir::Operation;
use crate::compiler::scope::ScopeKind;
use crate::compiler::types::{Operand, Type};
use crate::error::{Error, Result};

/// State of one `if` statement being compiled
#[derive(Debug, Clone, Default)]
pub(super) struct BranchFrame {
    exits: Vec<usize>,
    has_else: bool,
}

impl CodeGenerator {
    fn expect_bool(&self, cond: &Operand, construct: &str) -> Result<()> {
        if cond.ty != Type::Bool {
            return Err(Error::type_mismatch(format!(
                "{} condition must be bool, found {}",
                construct, cond.ty
            )));
        }
        Ok(())
    }

    fn emit_false_jump(&mut self, cond: &Operand) {
        let index = self.quads.emit_jump(Operation::GotoF, Some(cond.address));
        self.jumps.push(index);
    }

    fn patch_breaks(&mut self) -> Result<()> {
        let scope = self.scopes.pop()?;
        if *scope.kind() != ScopeKind::Loop {
            return Err(Error::semantic("loop scope expected"));
        }
        for &index in scope.breaks() {
            self.quads.patch_here(index)?;
        }
        Ok(())
    }

    /// Opens a plain `{ }` block
    pub fn begin_block(&mut self) {
        self.scopes.push(ScopeKind::Generic);
    }

    /// Closes a plain block
    pub fn end_block(&mut self) -> Result<()> {
        self.scopes.pop().map(|_| ())
    }

    // if / elseif / else

    /// `if`
    pub fn begin_if(&mut self) {
        self.branches.push(BranchFrame::default());
    }

    /// Condition of the `if` or of an `elseif`
    pub fn if_condition(&mut self, cond: Operand) -> Result<()> {
        self.expect_bool(&cond, "if")?;
        self.emit_false_jump(&cond);
        Ok(())
    }

    /// Ends the current branch before an `elseif`
    pub fn begin_elseif(&mut self) -> Result<()> {
        let exit = self.quads.emit_jump(Operation::Goto, None);
        let frame = self
            .branches
            .last_mut()
            .ok_or_else(|| Error::semantic("'elseif' without 'if'"))?;
        frame.exits.push(exit);
        let false_jump = self.jumps.pop()?;
        self.quads.patch_here(false_jump)
    }

    /// Ends the current branch before the `else` block
    pub fn begin_else(&mut self) -> Result<()> {
        self.begin_elseif()?;
        if let Some(frame) = self.branches.last_mut() {
            frame.has_else = true;
        }
        Ok(())
    }

    /// End of the whole `if` statement
    pub fn end_if(&mut self) -> Result<()> {
        let frame = self
            .branches
            .pop()
            .ok_or_else(|| Error::semantic("unbalanced 'if'"))?;
        if !frame.has_else {
            let false_jump = self.jumps.pop()?;
            self.quads.patch_here(false_jump)?;
        }
        for exit in frame.exits {
            self.quads.patch_here(exit)?;
        }
        Ok(())
    }

    // while

    /// `while`, before the condition
    pub fn begin_while(&mut self) {
        self.scopes.push(ScopeKind::Loop);
        self.jumps.push(self.quads.next_index());
    }

    /// After the `while` condition
    pub fn while_condition(&mut self, cond: Operand) -> Result<()> {
        self.expect_bool(&cond, "while")?;
        self.emit_false_jump(&cond);
        Ok(())
    }

    /// After the `while` body
    pub fn end_while(&mut self) -> Result<()> {
        let false_jump = self.jumps.pop()?;
        let start = self.jumps.pop()?;
        let back = self.quads.emit_jump(Operation::Goto, None);
        self.quads.patch(back, start)?;
        self.quads.patch_here(false_jump)?;
        self.patch_breaks()
    }

    // for

    /// `for (`, before the init assignment
    pub fn begin_for(&mut self) {
        self.scopes.push(ScopeKind::Loop);
    }

    /// After the init assignment, before the condition
    pub fn for_condition_start(&mut self) {
        self.jumps.push(self.quads.next_index());
    }

    /// After the condition, before the step assignment
    pub fn for_condition(&mut self, cond: Operand) -> Result<()> {
        self.expect_bool(&cond, "for")?;
        self.emit_false_jump(&cond);
        let to_body = self.quads.emit_jump(Operation::Goto, None);
        self.jumps.push(to_body);
        self.jumps.push(self.quads.next_index());
        Ok(())
    }

    /// After the step assignment, before the body
    pub fn for_step_end(&mut self) -> Result<()> {
        let step = self.jumps.pop()?;
        let to_body = self.jumps.pop()?;
        let false_jump = self.jumps.pop()?;
        let cond = self.jumps.pop()?;

        let back = self.quads.emit_jump(Operation::Goto, None);
        self.quads.patch(back, cond)?;
        self.quads.patch_here(to_body)?;

        self.jumps.push(false_jump);
        self.jumps.push(step);
        Ok(())
    }

    /// After the `for` body
    pub fn end_for(&mut self) -> Result<()> {
        let step = self.jumps.pop()?;
        let false_jump = self.jumps.pop()?;
        let back = self.quads.emit_jump(Operation::Goto, None);
        self.quads.patch(back, step)?;
        self.quads.patch_here(false_jump)?;
        self.patch_breaks()
    }

    // break

    /// `break;` jumps past the innermost loop
    pub fn break_loop(&mut self) -> Result<()> {
        if !self.scopes.is_in_loop() {
            return Err(Error::scope("'break' outside of a loop"));
        }
        let jump = self.quads.emit_jump(Operation::Goto, None);
        self.scopes.add_break(jump)
    }
}

//! # Quadruple intermediate representation
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Operation, Target, Quadruple
//! └── program.rs      # QuadrupleStream (emit + backpatch), JumpStack
//! ```
//!
//! A quadruple is `(op, left, right, result)`. Operands are flat memory
//! addresses; the result is an address, an instruction index (jumps) or a
//! function name (`ERA`/`GOSUB`). Jumps are emitted with an empty target and
//! patched once the destination is known.

mod instruction;
mod program;

pub use instruction::{Operation, Quadruple, Target};
pub use program::{JumpStack, QuadrupleStream};

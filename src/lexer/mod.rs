//! Lexical analysis for OOPL
//!
//! Converts source text into a stream of tokens with line/column positions.
//! Comments start with `#` and run to the end of the line.

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};

//! OOPL Parser Module
//!
//! Single-pass recursive descent over the token stream. The parser builds no
//! syntax tree; it drives the code generator directly.

#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;

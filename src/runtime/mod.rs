//! Runtime execution of compiled OOPL artifacts

mod vm;

pub use vm::VirtualMachine;

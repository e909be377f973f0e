//! `ooplvm` - executes a compiled OOPL artifact

use std::path::PathBuf;

use anyhow::Context;
use oopl::compiler::Artifact;
use oopl::runtime::VirtualMachine;

fn usage() -> ! {
    eprintln!("usage:\n  ooplvm <program.oopl.out>");
    std::process::exit(2);
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = match (args.next(), args.next()) {
        (Some(a), None) if !a.starts_with('-') => PathBuf::from(a),
        _ => usage(),
    };

    let text = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let artifact = Artifact::parse(&text)
        .with_context(|| format!("failed to load {}", input.display()))?;

    let mut vm = VirtualMachine::new(artifact)?;
    vm.run().context("execution failed")?;
    Ok(())
}

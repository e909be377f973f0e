//! `ooplc` - compiles an OOPL source file into a quadruple artifact

use std::path::PathBuf;

use anyhow::Context;
use oopl::compiler::{CompileOptions, Compiler};

fn usage() -> ! {
    eprintln!("usage:\n  ooplc <input.oopl> [--out <output.oopl.out>] [--verbose]");
    std::process::exit(2);
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(a) if !a.starts_with('-') => PathBuf::from(a),
        _ => usage(),
    };

    let mut out: Option<PathBuf> = None;
    let mut options = CompileOptions::default();
    while let Some(a) = args.next() {
        match a.as_str() {
            "--out" | "-o" => {
                let p = args.next().unwrap_or_else(|| usage());
                out = Some(PathBuf::from(p));
            }
            "--verbose" | "-v" => options.verbose = true,
            _ => usage(),
        }
    }

    let out = out.unwrap_or_else(|| {
        let mut p = input.clone();
        p.set_extension("oopl.out");
        p
    });

    let source = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let compiled = Compiler::new(options)
        .compile(&source)
        .with_context(|| format!("failed to compile {}", input.display()))?;
    std::fs::write(&out, &compiled.text)
        .with_context(|| format!("failed to write {}", out.display()))?;

    eprintln!(
        "compiled {} -> {} ({} quadruples)",
        input.display(),
        out.display(),
        compiled.quadruple_count
    );
    Ok(())
}

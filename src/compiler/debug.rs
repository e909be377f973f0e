//! Debug utilities for OOPL compilation
//!
//! Human-readable dumps of the directories, global memory and quadruples.
//! Every line starts with `#` so the dumps can be embedded in an artifact
//! without disturbing the loader.

use std::fmt::Write as _;

use super::directory::{ClassDirectory, FunctionDirectory};
use super::generator::CodeGenerator;
use super::ir::{Operation, Quadruple, Target};
use crate::memory::{Address, Memory};

const RULE: &str = "# ═══════════════════════════════════════════════════════════";
const THIN_RULE: &str = "# ───────────────────────────────────────────────────────────";

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "#                    {}", title);
    let _ = writeln!(out, "{}", RULE);
}

/// Function directory dump
pub fn dump_functions(functions: &FunctionDirectory) -> String {
    let mut out = String::new();
    header(&mut out, "FUNCTIONS");
    for f in functions.iter() {
        let params: Vec<String> = f
            .params
            .iter()
            .map(|p| format!("{} {}@{}", p.ty, p.name, p.address))
            .collect();
        let _ = writeln!(
            out,
            "# {} {}({}) entry={} return={} resources={}",
            f.return_type,
            f.name,
            params.join(", "),
            f.entry.map_or("-".to_string(), |e| e.to_string()),
            f.return_address
                .map_or("-".to_string(), |a| a.to_string()),
            f.resources
        );
        for b in &f.this_fields {
            let _ = writeln!(
                out,
                "#     {} {} local={} shadow={} cells={}",
                b.ty,
                b.path,
                b.local,
                b.shadow,
                b.cells()
            );
        }
    }
    out
}

/// Class directory dump
pub fn dump_classes(classes: &ClassDirectory) -> String {
    let mut out = String::new();
    header(&mut out, "CLASSES");
    for c in classes.iter() {
        match &c.parent {
            Some(parent) => {
                let _ = writeln!(out, "# class {} : {}", c.name, parent);
            }
            None => {
                let _ = writeln!(out, "# class {}", c.name);
            }
        }
        for m in c.members() {
            let shape = m.shape.as_ref().map_or(String::new(), |s| s.to_string());
            let origin = if m.inherited { " (inherited)" } else { "" };
            let _ = writeln!(out, "#     {} {}{}{}", m.ty, m.name, shape, origin);
        }
        for m in c.methods() {
            let origin = if m.inherited { " (inherited)" } else { "" };
            let _ = writeln!(out, "#     {}() -> {}{}", m.name, m.function, origin);
        }
    }
    out
}

/// Memory dump, one reserved cell per line
pub fn dump_memory(memory: &Memory, title: &str) -> String {
    let mut out = String::new();
    header(&mut out, title);
    let _ = writeln!(out, "# resources: {}", memory.describe());
    let _ = writeln!(out, "{}", THIN_RULE);
    for (address, value) in memory.cells() {
        match value {
            Some(v) => {
                let _ = writeln!(out, "# {:>6}: {:?}", address, v);
            }
            None => {
                let _ = writeln!(out, "# {:>6}: -", address);
            }
        }
    }
    out
}

/// Numbered quadruple listing
pub fn dump_quadruples<'a>(quads: impl IntoIterator<Item = &'a Quadruple>) -> String {
    let mut out = String::new();
    header(&mut out, "QUADRUPLES");
    for (i, quad) in quads.into_iter().enumerate() {
        let _ = writeln!(out, "# {:04}: {}", i, format_quadruple(quad));
    }
    out
}

fn addr(a: Option<Address>) -> String {
    a.map_or("_".to_string(), |a| format!("[{}]", a))
}

/// Format a single quadruple
pub fn format_quadruple(quad: &Quadruple) -> String {
    let (l, r) = (addr(quad.left), addr(quad.right));
    match (&quad.op, &quad.result) {
        (op, Target::Address(dst)) if op.is_binary() => {
            format!("[{}] = {} {} {}", dst, l, op, r)
        }
        (Operation::Assign, Target::Address(dst)) => format!("[{}] = {}", dst, l),
        (Operation::Goto, Target::Jump(t)) => format!("goto {:04}", t),
        (Operation::GotoF, Target::Jump(t)) => format!("if !{} goto {:04}", l, t),
        (Operation::Era, Target::Function(f)) => format!("era {}", f),
        (Operation::Gosub, Target::Function(f)) => format!("gosub {}", f),
        (Operation::Param, Target::Address(dst)) => format!("param {} -> callee[{}]", l, dst),
        (Operation::OptParam, Target::Address(dst)) => {
            format!("param? {} -> callee[{}]", l, dst)
        }
        (Operation::OptAssign, Target::Address(dst)) => format!("[{}] =? {}", dst, l),
        (Operation::EndSub, _) => "endsub".to_string(),
        (Operation::Return, Target::Address(dst)) => format!("return {} -> [{}]", l, dst),
        (Operation::Print, Target::Address(a)) => format!("print [{}]", a),
        (Operation::Read, Target::Address(a)) => format!("read [{}]", a),
        (Operation::Ver, Target::Address(upper)) => {
            format!("verify {} <= {} < [{}]", r, l, upper)
        }
        (Operation::SavePtr, Target::Address(p)) => format!("[{}] = &{}", p, l),
        _ => quad.to_string(),
    }
}

/// Every dump of a finished compilation, in artifact order
pub fn debug_compile(generator: &CodeGenerator) -> String {
    let mut out = String::new();
    if let Some(name) = generator.program_name() {
        let _ = writeln!(out, "# program {}", name);
    }
    out.push_str(&dump_functions(generator.functions()));
    out.push_str(&dump_classes(generator.classes()));
    out.push_str(&dump_memory(generator.global_memory(), "GLOBAL MEMORY"));
    out.push_str(&dump_quadruples(generator.quadruples().iter()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_quadruple() {
        let add = Quadruple::binary(Operation::Plus, 2000, 2001, 7000);
        assert_eq!(format_quadruple(&add), "[7000] = [2000] + [2001]");
        let jump = Quadruple::new(Operation::GotoF, Some(0), None, Target::Jump(9));
        assert_eq!(format_quadruple(&jump), "if ![0] goto 0009");
        let bad = Quadruple::new(Operation::Goto, None, None, Target::None);
        assert_eq!(format_quadruple(&bad), "GOTO,None,None,None");
    }

    #[test]
    fn test_dump_lines_are_comments() {
        let quads = vec![Quadruple::new(Operation::EndSub, None, None, Target::None)];
        let dump = dump_quadruples(&quads);
        assert!(dump.lines().all(|l| l.starts_with('#')));
        assert!(dump.contains("0000: endsub"));
    }
}

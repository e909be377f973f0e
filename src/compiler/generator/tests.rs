use super::*;
use crate::memory::Value;

fn in_main() -> CodeGenerator {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    cg
}

fn close_main(cg: &mut CodeGenerator) {
    let zero = cg.constant(Value::Int(0)).unwrap();
    cg.return_value(Some(zero)).unwrap();
    cg.end_function().unwrap();
}

fn ops_from(cg: &CodeGenerator, start: usize) -> Vec<Operation> {
    cg.quadruples().iter().skip(start).map(|q| q.op).collect()
}

#[test]
fn test_prologue_calls_main() {
    let mut cg = in_main();
    close_main(&mut cg);
    let artifact = cg.end_program().unwrap();
    assert_eq!(
        artifact.quadruples[0].result,
        Target::Function(MAIN.to_string())
    );
    assert_eq!(artifact.quadruples[1].op, Operation::Gosub);
    assert_eq!(artifact.function(MAIN).unwrap().entry, 2);
}

#[test]
fn test_while_false_jumps_past_body() {
    let mut cg = in_main();
    cg.declare_variable("x", Type::Int, &[]).unwrap();

    cg.begin_while();
    let cond = cg.constant(Value::Bool(false)).unwrap();
    cg.while_condition(cond).unwrap();
    cg.begin_block();
    let x = cg.variable("x").unwrap();
    let one = cg.constant(Value::Int(1)).unwrap();
    cg.assign(x, one).unwrap();
    cg.end_block().unwrap();
    cg.end_while().unwrap();

    let after = cg.quadruples().next_index();
    let x = cg.variable("x").unwrap();
    let two = cg.constant(Value::Int(2)).unwrap();
    cg.assign(x, two).unwrap();

    let goto_f = cg.quadruples().get(2).unwrap();
    assert_eq!(goto_f.op, Operation::GotoF);
    assert_eq!(goto_f.result, Target::Jump(after));
    assert_eq!(cg.quadruples().get(4).unwrap().result, Target::Jump(2));
    assert_eq!(cg.quadruples().get(after).unwrap().op, Operation::Assign);
}

#[test]
fn test_block_shadowing() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.declare_variable("x", Type::Int, &[]).unwrap();
    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    assert_eq!(cg.variable("x").unwrap(), Operand::new(Type::Int, 2000));

    cg.declare_variable("x", Type::Float, &[]).unwrap();
    cg.begin_block();
    cg.declare_variable("x", Type::Bool, &[]).unwrap();
    assert_eq!(cg.variable("x").unwrap(), Operand::new(Type::Bool, 5000));
    cg.end_block().unwrap();
    assert_eq!(cg.variable("x").unwrap(), Operand::new(Type::Float, 6000));

    let err = cg.declare_variable("x", Type::Int, &[]).unwrap_err();
    assert!(matches!(err, Error::DuplicateEntity { .. }));
}

#[test]
fn test_header_only_function_is_implicit_declaration() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.declare_function("f", Type::Int, &[]).unwrap();
    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    let site = cg.begin_call("f").unwrap();
    cg.end_call_value(site).unwrap();
    close_main(&mut cg);

    let err = cg.end_program().unwrap_err();
    assert_eq!(err, Error::ImplicitDeclaration { name: "f".into() });
}

#[test]
fn test_forward_declaration_then_body() {
    let params = [("n".to_string(), Type::Int)];
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.declare_function("f", Type::Int, &params).unwrap();

    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    let mut site = cg.begin_call("f").unwrap();
    let arg = cg.constant(Value::Int(3)).unwrap();
    cg.call_argument(&mut site, arg);
    cg.end_call_value(site).unwrap();
    close_main(&mut cg);

    let err = cg
        .begin_function("f", Type::Float, &params)
        .unwrap_err();
    assert!(matches!(err, Error::SemanticError { .. }));

    cg.begin_function("f", Type::Int, &params).unwrap();
    let n = cg.variable("n").unwrap();
    assert_eq!(n.address, 7000);
    cg.return_value(Some(n)).unwrap();
    cg.end_function().unwrap();

    let artifact = cg.end_program().unwrap();
    assert!(artifact.function("f").is_some());
}

#[test]
fn test_call_sequence() {
    let params = [("a".to_string(), Type::Int), ("b".to_string(), Type::Float)];
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_function("f", Type::Void, &params).unwrap();
    cg.end_function().unwrap();

    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    let start = cg.quadruples().next_index();
    let mut site = cg.begin_call("f").unwrap();
    let one = cg.constant(Value::Int(1)).unwrap();
    cg.call_argument(&mut site, one.clone());
    cg.call_argument(&mut site, one);
    assert_eq!(cg.end_call(site).unwrap(), None);
    assert_eq!(
        ops_from(&cg, start),
        vec![
            Operation::Era,
            Operation::Param,
            Operation::Param,
            Operation::Gosub
        ]
    );
    let param_b = cg.quadruples().get(start + 2).unwrap();
    assert_eq!(param_b.result, Target::Address(6000));
}

#[test]
fn test_call_validation() {
    let params = [("s".to_string(), Type::String)];
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_function("f", Type::Void, &params).unwrap();
    cg.end_function().unwrap();
    cg.begin_function(MAIN, Type::Int, &[]).unwrap();

    let site = cg.begin_call("f").unwrap();
    assert!(matches!(
        cg.end_call(site),
        Err(Error::TypeMismatch { .. })
    ));

    let mut site = cg.begin_call("f").unwrap();
    let arg = cg.constant(Value::Int(1)).unwrap();
    cg.call_argument(&mut site, arg);
    assert!(matches!(
        cg.end_call(site),
        Err(Error::TypeMismatch { .. })
    ));

    let site = cg.begin_call("f").unwrap();
    assert!(cg.end_call_value(site).is_err());
    assert!(matches!(
        cg.begin_call(MAIN),
        Err(Error::SemanticError { .. })
    ));
    assert!(matches!(
        cg.begin_call("g"),
        Err(Error::UndeclaredIdentifier { .. })
    ));
}

#[test]
fn test_main_rules() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    assert!(cg.declare_function(MAIN, Type::Int, &[]).is_err());
    assert!(cg.begin_function(MAIN, Type::Void, &[]).is_err());

    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    assert!(matches!(
        cg.end_program(),
        Err(Error::SemanticError { .. })
    ));
}

#[test]
fn test_return_rules() {
    let mut cg = in_main();
    let err = cg.end_function().unwrap_err();
    assert!(err.to_string().contains("missing return"));

    let half = cg.constant(Value::Float(0.5)).unwrap();
    assert!(matches!(
        cg.return_value(Some(half)),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        cg.return_value(None),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_break_and_this_outside_context() {
    let mut cg = in_main();
    assert!(matches!(cg.break_loop(), Err(Error::ScopeError { .. })));
    assert!(matches!(
        cg.variable("this.x"),
        Err(Error::ScopeError { .. })
    ));

    cg.begin_while();
    let cond = cg.constant(Value::Bool(true)).unwrap();
    cg.while_condition(cond).unwrap();
    cg.begin_block();
    let brk = cg.quadruples().next_index();
    cg.break_loop().unwrap();
    cg.end_block().unwrap();
    cg.end_while().unwrap();
    let exit = cg.quadruples().next_index();
    assert_eq!(cg.quadruples().get(brk).unwrap().result, Target::Jump(exit));
}

#[test]
fn test_conditions_must_be_bool() {
    let mut cg = in_main();
    cg.begin_if();
    let one = cg.constant(Value::Int(1)).unwrap();
    assert!(matches!(
        cg.if_condition(one),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_if_elseif_else_patching() {
    let mut cg = in_main();
    cg.declare_variable("x", Type::Int, &[]).unwrap();
    let t = cg.constant(Value::Bool(true)).unwrap();

    cg.begin_if();
    cg.if_condition(t.clone()).unwrap(); // 2
    cg.begin_elseif().unwrap(); // GOTO at 3
    cg.if_condition(t).unwrap(); // 4
    cg.begin_else().unwrap(); // GOTO at 5
    let x = cg.variable("x").unwrap();
    let one = cg.constant(Value::Int(1)).unwrap();
    cg.assign(x, one).unwrap(); // 6
    cg.end_if().unwrap();

    let q = cg.quadruples();
    assert_eq!(q.get(2).unwrap().result, Target::Jump(4));
    assert_eq!(q.get(3).unwrap().result, Target::Jump(7));
    assert_eq!(q.get(4).unwrap().result, Target::Jump(6));
    assert_eq!(q.get(5).unwrap().result, Target::Jump(7));
}

#[test]
fn test_for_loop_wiring() {
    let mut cg = in_main();
    cg.declare_variable("i", Type::Int, &[]).unwrap();
    cg.begin_for();
    let i = cg.variable("i").unwrap();
    let zero = cg.constant(Value::Int(0)).unwrap();
    cg.assign(i, zero).unwrap(); // 2
    cg.for_condition_start();
    let i = cg.variable("i").unwrap();
    let three = cg.constant(Value::Int(3)).unwrap();
    let cond = cg.binary(Operation::Lt, i, three).unwrap(); // 3
    cg.for_condition(cond).unwrap(); // GOTOF 4, GOTO 5
    let i = cg.variable("i").unwrap();
    let one = cg.constant(Value::Int(1)).unwrap();
    let next = cg.binary(Operation::Plus, i.clone(), one).unwrap(); // 6
    cg.assign(i, next).unwrap(); // 7
    cg.for_step_end().unwrap(); // GOTO 8 -> 3
    cg.begin_block();
    cg.end_block().unwrap();
    cg.end_for().unwrap(); // GOTO 9 -> 6

    let q = cg.quadruples();
    assert_eq!(q.get(4).unwrap().result, Target::Jump(10));
    assert_eq!(q.get(5).unwrap().result, Target::Jump(9));
    assert_eq!(q.get(8).unwrap().result, Target::Jump(3));
    assert_eq!(q.get(9).unwrap().result, Target::Jump(6));
}

#[test]
fn test_array_element_addressing() {
    let mut cg = in_main();
    cg.declare_variable("a", Type::Int, &[2, 3]).unwrap();
    let start = cg.quadruples().next_index();
    let i = cg.constant(Value::Int(1)).unwrap();
    let j = cg.constant(Value::Int(2)).unwrap();
    let element = cg.element("a", &[i, j]).unwrap();
    assert_eq!(element.ty, Type::Int);
    assert_eq!(element.address, 9000);
    assert_eq!(
        ops_from(&cg, start),
        vec![
            Operation::Ver,
            Operation::Times,
            Operation::Ver,
            Operation::Plus,
            Operation::Plus,
            Operation::SavePtr
        ]
    );

    let i = cg.constant(Value::Int(1)).unwrap();
    assert!(matches!(
        cg.element("a", &[i]),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        cg.variable("a"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        cg.declare_variable("b", Type::Int, &[0]),
        Err(Error::InvalidDimension { size: 0 })
    ));
}

#[test]
fn test_objects_and_method_calls() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_class("Counter", None).unwrap();
    cg.declare_variable("count", Type::Int, &[]).unwrap();
    cg.begin_function("bump", Type::Void, &[]).unwrap();
    let count = cg.variable("this.count").unwrap();
    assert_eq!(count.address, 7000);
    assert!(matches!(
        cg.variable("count"),
        Err(Error::ScopeError { .. })
    ));
    cg.end_function().unwrap();
    cg.end_class().unwrap();

    let bump = cg.functions().get("Counter.bump").unwrap();
    assert_eq!(bump.this_fields.len(), 1);
    let shadow = bump.this_fields[0].shadow;
    // The method's write-back precedes its ENDSUB
    assert_eq!(
        ops_from(&cg, 2),
        vec![Operation::OptAssign, Operation::EndSub]
    );

    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    cg.declare_variable("c", Type::Class("Counter".into()), &[]).unwrap();
    let field = cg.variable("c.count").unwrap();
    assert!(matches!(
        cg.variable("c"),
        Err(Error::TypeMismatch { .. })
    ));

    let start = cg.quadruples().next_index();
    let site = cg.begin_call("c.bump").unwrap();
    assert_eq!(site.function(), "Counter.bump");
    cg.end_call(site).unwrap();
    assert_eq!(
        ops_from(&cg, start),
        vec![
            Operation::Era,
            Operation::OptParam,
            Operation::Gosub,
            Operation::OptAssign
        ]
    );
    let restore = cg.quadruples().get(start + 3).unwrap();
    assert_eq!(restore.left, Some(shadow));
    assert_eq!(restore.result, Target::Address(field.address));
}

#[test]
fn test_inherited_methods_and_members() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_class("A", None).unwrap();
    cg.declare_variable("x", Type::Int, &[]).unwrap();
    cg.begin_function("get", Type::Int, &[]).unwrap();
    let x = cg.variable("this.x").unwrap();
    cg.return_value(Some(x)).unwrap();
    cg.end_function().unwrap();
    cg.end_class().unwrap();

    cg.begin_class("B", Some("A")).unwrap();
    cg.declare_variable("y", Type::Float, &[]).unwrap();
    assert!(matches!(
        cg.declare_variable("y", Type::Int, &[]),
        Err(Error::DuplicateEntity { .. })
    ));
    assert!(matches!(
        cg.declare_variable("self_ref", Type::Class("B".into()), &[]),
        Err(Error::TypeMismatch { .. })
    ));
    cg.end_class().unwrap();

    cg.begin_function(MAIN, Type::Int, &[]).unwrap();
    cg.declare_variable("b", Type::Class("B".into()), &[]).unwrap();
    assert_eq!(cg.variable("b.x").unwrap().ty, Type::Int);
    assert_eq!(cg.variable("b.y").unwrap().ty, Type::Float);
    let site = cg.begin_call("b.get").unwrap();
    assert_eq!(site.function(), "A.get");
    let value = cg.end_call_value(site).unwrap();
    assert_eq!(value.ty, Type::Int);
}

#[test]
fn test_methods_cannot_be_forward_declared() {
    let mut cg = CodeGenerator::new(MemoryLayout::default());
    cg.begin_program("test").unwrap();
    cg.begin_class("A", None).unwrap();
    assert!(matches!(
        cg.declare_function("m", Type::Void, &[]),
        Err(Error::SemanticError { .. })
    ));
}

#[test]
fn test_constants_are_pooled() {
    let mut cg = in_main();
    let a = cg.constant(Value::Int(42)).unwrap();
    let b = cg.constant(Value::Int(42)).unwrap();
    let c = cg.constant(Value::Float(42.0)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a.address, c.address);
}

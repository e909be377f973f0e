/// End-to-end tests: source → Compiler → Artifact → VirtualMachine
use oopl::compiler::{Artifact, CompileOptions, Compiler};
use oopl::runtime::VirtualMachine;
use oopl::{Error, ErrorPhase, Value};

fn compile(source: &str) -> oopl::Result<Artifact> {
    Compiler::new(CompileOptions::default())
        .compile(source)
        .map(|compiled| compiled.artifact)
}

fn run_with_input(source: &str, input: &str) -> oopl::Result<(Option<Value>, String)> {
    let artifact = compile(source)?;
    let mut vm = VirtualMachine::with_io(artifact, input.as_bytes(), Vec::new())?;
    let result = vm.run()?;
    let output = String::from_utf8(vm.into_output()).unwrap();
    Ok((result, output))
}

fn run(source: &str) -> oopl::Result<(Option<Value>, String)> {
    run_with_input(source, "")
}

#[test]
fn test_e2e_arithmetic_precedence() {
    let source = r#"
        program p;
        int main() {
            int x;
            x = 2 + 3 * 4;
            print(x);
            return 0;
        }
    "#;
    let (result, output) = run(source).unwrap();
    assert_eq!(output, "14");
    assert_eq!(result, Some(Value::Int(0)));
}

#[test]
fn test_e2e_mixed_arithmetic_and_strings() {
    let source = r#"
        program p;
        int main() {
            float f;
            string s;
            f = 7.0 / 2;
            s = "a" + "b";
            print(f, " ", s, " ", 7 / 2, " ", -3 + 1);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "3.5 ab 3 -2");
}

#[test]
fn test_e2e_if_elseif_else() {
    let source = r#"
        program p;
        void classify(int n) {
            if (n < 0) {
                print("neg");
            } elseif (n == 0) {
                print("zero");
            } else {
                print("pos");
            }
        }
        int main() {
            classify(-5);
            classify(0);
            classify(7);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "negzeropos");
}

#[test]
fn test_e2e_while_and_break() {
    let source = r#"
        program p;
        int main() {
            int i;
            i = 0;
            while (true) {
                if (i == 3) {
                    break;
                }
                i = i + 1;
            }
            print(i);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "3");
}

#[test]
fn test_e2e_break_exits_innermost_loop() {
    let source = r#"
        program p;
        int main() {
            int j, n;
            n = 0;
            while (n < 3) {
                for (j = 0; j < 10; j = j + 1) {
                    if (j == 2) {
                        break;
                    }
                    print(j);
                }
                n = n + 1;
            }
            print("|", n);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "010101|3");
}

#[test]
fn test_e2e_for_loop_with_arrays() {
    let source = r#"
        program p;
        int main() {
            int a[5];
            int i, total;
            total = 0;
            for (i = 0; i < 5; i = i + 1) {
                a[i] = i * i;
            }
            for (i = 0; i < 5; i = i + 1) {
                total = total + a[i];
            }
            print(a[4], ",", total);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "16,30");
}

#[test]
fn test_e2e_two_dimensional_array() {
    let source = r#"
        program p;
        int m[2][3];
        int main() {
            int r, c;
            for (r = 0; r < 2; r = r + 1) {
                for (c = 0; c < 3; c = c + 1) {
                    m[r][c] = r * 10 + c;
                }
            }
            print(m[1][2], " ", m[0][1]);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "12 1");
}

#[test]
fn test_e2e_out_of_bounds() {
    let source = r#"
        program p;
        int main() {
            int a[3];
            a[3] = 1;
            return 0;
        }
    "#;
    let err = run(source).unwrap_err();
    assert_eq!(
        err,
        Error::IndexOutOfBounds {
            index: 3,
            lower: 0,
            upper: 3
        }
    );
    assert_eq!(err.phase(), ErrorPhase::Runtime);
}

#[test]
fn test_e2e_recursion() {
    let source = r#"
        program p;
        int fact(int n) {
            if (n <= 1) {
                return 1;
            }
            return n * fact(n - 1);
        }
        int main() {
            print(fact(5));
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "120");
}

#[test]
fn test_e2e_main_without_executed_return_has_no_result() {
    let source = r#"
        program p;
        int f() {
            return 7;
        }
        int main() {
            print(f());
            if (false) {
                return 1;
            }
        }
    "#;
    let (result, output) = run(source).unwrap();
    assert_eq!(output, "7");
    assert_eq!(result, None);
}

#[test]
fn test_e2e_print_float_keeps_point() {
    let source = r#"
        program p;
        int main() {
            float f;
            f = 2;
            print(f, " ", 1.0 + 1, " ", 4 / 2);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "2.0 2.0 2");
}

#[test]
fn test_e2e_forward_declaration_mutual_recursion() {
    let source = r#"
        program p;
        bool is_even(int n);
        bool is_odd(int n) {
            if (n == 0) {
                return false;
            }
            return is_even(n - 1);
        }
        bool is_even(int n) {
            if (n == 0) {
                return true;
            }
            return is_odd(n - 1);
        }
        int main() {
            if (is_even(10)) {
                print("even");
            } else {
                print("odd");
            }
            print(is_odd(7));
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "eventrue");
}

#[test]
fn test_e2e_globals_shared_across_calls() {
    let source = r#"
        program p;
        int counter;
        void bump() {
            counter = counter + 1;
        }
        int main() {
            counter = 0;
            bump();
            bump();
            print(counter);
            return counter;
        }
    "#;
    let (result, output) = run(source).unwrap();
    assert_eq!(output, "2");
    assert_eq!(result, Some(Value::Int(2)));
}

#[test]
fn test_e2e_method_mutation_visible_to_caller() {
    let source = r#"
        program p;
        class Point {
            int x;
            int y;
            void shift(int d) {
                this.x = this.x + d;
                this.y = this.y + d;
            }
            void twice(int d) {
                this.shift(d);
                this.shift(d);
            }
            int sum() {
                return this.x + this.y;
            }
        }
        int main() {
            Point p;
            p.x = 1;
            p.y = 2;
            p.shift(5);
            print(p.x, ",", p.y, ";");
            p.twice(1);
            print(p.sum());
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "6,7;17");
}

#[test]
fn test_e2e_inheritance() {
    let source = r#"
        program p;
        class Counter {
            int n;
            void inc() {
                this.n = this.n + 1;
            }
        }
        class Labeled : Counter {
            string label;
            void show() {
                print(this.label, "=", this.n);
            }
        }
        int main() {
            Labeled c;
            c.n = 0;
            c.label = "hits";
            c.inc();
            c.inc();
            c.show();
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "hits=2");
}

#[test]
fn test_e2e_nested_object_fields() {
    let source = r#"
        program p;
        class Inner { int v; }
        class Outer { Inner inner; float w; }
        int main() {
            Outer o;
            o.inner.v = 5;
            o.w = 0.5;
            print(o.inner.v + o.w);
            return 0;
        }
    "#;
    let (_, output) = run(source).unwrap();
    assert_eq!(output, "5.5");
}

#[test]
fn test_e2e_read_input() {
    let source = r#"
        program p;
        int main() {
            string name;
            read(name);
            print("hi ", name);
            return 0;
        }
    "#;
    let (_, output) = run_with_input(source, "bob\n").unwrap();
    assert_eq!(output, "hi bob");
}

#[test]
fn test_e2e_uninitialized_variable() {
    let source = r#"
        program p;
        int main() {
            int x;
            print("a");
            print(x);
            print("b");
            return 0;
        }
    "#;
    let artifact = compile(source).unwrap();
    let mut output = Vec::new();
    let err = VirtualMachine::with_io(artifact, "".as_bytes(), &mut output)
        .unwrap()
        .run()
        .unwrap_err();
    assert_eq!(err, Error::UninitializedVariable { address: 7000 });
    assert_eq!(String::from_utf8(output).unwrap(), "a");
}

#[test]
fn test_e2e_division_by_zero() {
    let source = r#"
        program p;
        int main() {
            int z;
            z = 0;
            print(1 / z);
            return 0;
        }
    "#;
    assert_eq!(run(source).unwrap_err(), Error::DivisionByZero);
}

#[test]
fn test_e2e_implicit_declaration() {
    let source = r#"
        program p;
        int f(int x);
        int main() {
            return f(1);
        }
    "#;
    let err = compile(source).unwrap_err();
    assert_eq!(
        err.root(),
        &Error::ImplicitDeclaration {
            name: "f".to_string()
        }
    );
    assert_eq!(err.phase(), ErrorPhase::Compile);
}

#[test]
fn test_e2e_compile_errors() {
    let missing_semicolon = "program p;\nint main() {\n  int x\n  return 0;\n}";
    match compile(missing_semicolon).unwrap_err() {
        Error::SyntaxError { line, col, .. } => assert_eq!((line, col), (4, 3)),
        other => panic!("expected syntax error, got {:?}", other),
    }

    let bad_condition = "program p; int main() { while (1) { } return 0; }";
    assert!(matches!(
        compile(bad_condition).unwrap_err().root(),
        Error::TypeMismatch { .. }
    ));

    let stray_break = "program p; int main() { break; return 0; }";
    assert!(matches!(
        compile(stray_break).unwrap_err().root(),
        Error::ScopeError { .. }
    ));

    let missing_return = "program p; int f() { print(1); } int main() { return 0; }";
    assert!(matches!(
        compile(missing_return).unwrap_err().root(),
        Error::SemanticError { .. }
    ));

    let no_main = "program p; void f() { }";
    assert!(matches!(
        compile(no_main).unwrap_err().root(),
        Error::SemanticError { .. }
    ));
}

#[test]
fn test_e2e_class_declaration_order() {
    let member_after_method = r#"
        program p;
        class A {
            void set() {
                this.y = 4;
            }
            int y;
        }
        int main() { return 0; }
    "#;
    match compile(member_after_method).unwrap_err().root() {
        Error::SemanticError { message } => {
            assert!(message.contains("'this.y'"));
            assert!(message.contains("declared before"));
        }
        other => panic!("expected semantic error, got {:?}", other),
    }

    let method_before_definition = r#"
        program p;
        class A {
            int n;
            void a() {
                this.b();
            }
            void b() {
                this.n = 1;
            }
        }
        int main() { return 0; }
    "#;
    match compile(method_before_definition).unwrap_err().root() {
        Error::SemanticError { message } => assert!(message.contains("'A.b'")),
        other => panic!("expected semantic error, got {:?}", other),
    }

    let unknown_method = r#"
        program p;
        class A { int n; }
        int main() {
            A a;
            a.missing();
            return 0;
        }
    "#;
    assert_eq!(
        compile(unknown_method).unwrap_err().root(),
        &Error::undeclared("A.missing")
    );
}

#[test]
fn test_e2e_artifact_text_round_trip() {
    let source = r#"
        program p;
        int main() {
            string s;
            s = "say \"hi\"\n";
            print(s, 2.25);
            return 0;
        }
    "#;
    let compiled = Compiler::new(CompileOptions {
        verbose: true,
        ..CompileOptions::default()
    })
    .compile(source)
    .unwrap();

    let loaded = Artifact::parse(&compiled.text).unwrap();
    assert_eq!(loaded, compiled.artifact);

    let mut vm = VirtualMachine::with_io(loaded, "".as_bytes(), Vec::new()).unwrap();
    vm.run().unwrap();
    assert_eq!(
        String::from_utf8(vm.into_output()).unwrap(),
        "say \"hi\"\n2.25"
    );
}

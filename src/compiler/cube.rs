//! # Operator compatibility table
//!
//! Maps `(left type, operation, right type)` to the result type. Anything not
//! in the table is a type mismatch. Built once on first use.

use std::collections::HashMap;

use super::ir::Operation;
use super::types::Type;
use crate::error::{Error, Result};

type CubeKey = (Type, Operation, Type);

const ARITHMETIC: [Operation; 4] = [
    Operation::Plus,
    Operation::Minus,
    Operation::Times,
    Operation::Divides,
];

const ORDERING: [Operation; 4] = [
    Operation::Lt,
    Operation::Gt,
    Operation::LtEq,
    Operation::GtEq,
];

const EQUALITY: [Operation; 2] = [Operation::Eq, Operation::Diff];

lazy_static::lazy_static! {
    /// Result type of every legal operator application
    static ref CUBE: HashMap<CubeKey, Type> = build_cube();
}

fn build_cube() -> HashMap<CubeKey, Type> {
    let mut cube = HashMap::new();
    let numeric = [Type::Int, Type::Float];

    for left in &numeric {
        for right in &numeric {
            let widened = if *left == Type::Float || *right == Type::Float {
                Type::Float
            } else {
                Type::Int
            };
            for op in ARITHMETIC {
                cube.insert((left.clone(), op, right.clone()), widened.clone());
            }
            for op in ORDERING.iter().chain(EQUALITY.iter()) {
                cube.insert((left.clone(), *op, right.clone()), Type::Bool);
            }
            // Assignment takes the target's type
            cube.insert((left.clone(), Operation::Assign, right.clone()), left.clone());
        }
    }

    cube.insert((Type::String, Operation::Plus, Type::String), Type::String);
    cube.insert((Type::String, Operation::Assign, Type::String), Type::String);
    for op in ORDERING.iter().chain(EQUALITY.iter()) {
        cube.insert((Type::String, *op, Type::String), Type::Bool);
    }

    for op in EQUALITY.iter().chain([Operation::And, Operation::Or].iter()) {
        cube.insert((Type::Bool, *op, Type::Bool), Type::Bool);
    }
    cube.insert((Type::Bool, Operation::Assign, Type::Bool), Type::Bool);

    cube
}

/// Result type of `left op right`
pub fn result_type(left: &Type, op: Operation, right: &Type) -> Result<Type> {
    CUBE.get(&(left.clone(), op, right.clone()))
        .cloned()
        .ok_or_else(|| {
            Error::type_mismatch(format!(
                "operator '{}' cannot be applied to {} and {}",
                op, left, right
            ))
        })
}

/// True when `left op right` is legal
pub fn is_legal(left: &Type, op: Operation, right: &Type) -> bool {
    CUBE.contains_key(&(left.clone(), op, right.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(
            result_type(&Type::Int, Operation::Plus, &Type::Int).unwrap(),
            Type::Int
        );
        assert_eq!(
            result_type(&Type::Int, Operation::Times, &Type::Float).unwrap(),
            Type::Float
        );
        assert_eq!(
            result_type(&Type::Int, Operation::Divides, &Type::Int).unwrap(),
            Type::Int
        );
        assert_eq!(
            result_type(&Type::Float, Operation::Lt, &Type::Int).unwrap(),
            Type::Bool
        );
    }

    #[test]
    fn test_assignment_uses_target_type() {
        assert_eq!(
            result_type(&Type::Int, Operation::Assign, &Type::Float).unwrap(),
            Type::Int
        );
        assert_eq!(
            result_type(&Type::Float, Operation::Assign, &Type::Int).unwrap(),
            Type::Float
        );
        assert!(!is_legal(&Type::String, Operation::Assign, &Type::Int));
        assert!(!is_legal(&Type::Bool, Operation::Assign, &Type::Int));
    }

    #[test]
    fn test_misses_are_type_mismatches() {
        let err = result_type(&Type::Bool, Operation::Plus, &Type::Int).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(!is_legal(&Type::Int, Operation::And, &Type::Int));
        assert!(!is_legal(&Type::String, Operation::Minus, &Type::String));
        assert!(is_legal(&Type::String, Operation::Plus, &Type::String));
        assert!(is_legal(&Type::Bool, Operation::Or, &Type::Bool));
        let class = Type::Class("Point".into());
        assert!(!is_legal(&class, Operation::Assign, &class));
    }
}

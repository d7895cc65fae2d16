//! Stack machine executing RPN programs.

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::error::EvalError;

use super::config::{ExprConfig, Function};
use super::rpn::Instr;

/// Variable bindings supplied by the caller at evaluation time
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Scope for () {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

impl<S: BuildHasher> Scope for HashMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for [(&str, f64)] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<const N: usize> Scope for [(&str, f64); N] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.as_slice().lookup(name)
    }
}

/// A stack entry: either a number or the marker left by a resolved function name
enum Slot<'c> {
    Value(f64),
    Marker(&'c str, &'c Function),
}

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn pop_value(stack: &mut Vec<Slot<'_>>) -> Result<f64, EvalError> {
    match stack.pop() {
        Some(Slot::Value(v)) => Ok(v),
        _ => Err(EvalError::InvalidOperand),
    }
}

pub fn eval_rpn<S: Scope + ?Sized>(
    program: &[Instr],
    scope: &S,
    config: &ExprConfig,
) -> Result<f64, EvalError> {
    let mut stack: Vec<Slot<'_>> = Vec::with_capacity(program.len());
    let mut args: Vec<f64> = Vec::new();

    for instr in program {
        match instr {
            Instr::Number(v) => stack.push(Slot::Value(finite(*v)?)),
            Instr::Name(name) => {
                // Constants were folded at compile time; variables shadow functions
                if let Some(v) = scope.lookup(name) {
                    if !v.is_finite() {
                        return Err(EvalError::InvalidVariable(name.to_string()));
                    }
                    stack.push(Slot::Value(v));
                } else if let Some(function) = config.function(name) {
                    stack.push(Slot::Marker(&**name, function));
                } else {
                    return Err(EvalError::UnknownIdentifier(name.to_string()));
                }
            }
            Instr::Call => {
                args.clear();
                let (name, function) = loop {
                    match stack.pop() {
                        Some(Slot::Value(v)) => args.push(v),
                        Some(Slot::Marker(name, function)) => break (name, function),
                        None => return Err(EvalError::MalformedCall),
                    }
                };
                args.reverse();
                let value = function.call(name, &args)?;
                stack.push(Slot::Value(finite(value)?));
            }
            Instr::Negate => {
                let a = pop_value(&mut stack)?;
                stack.push(Slot::Value(-a));
            }
            Instr::Binary(op) => {
                let b = pop_value(&mut stack)?;
                let a = pop_value(&mut stack)?;
                stack.push(Slot::Value(finite(op.apply(a, b))?));
            }
        }
    }

    match stack.as_slice() {
        [Slot::Value(v)] => finite(*v),
        _ => Err(EvalError::MalformedExpression { depth: stack.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::config::BinaryOp;
    use std::sync::Arc;

    #[test]
    fn test_marker_resolution_and_call() {
        let config = ExprConfig::default();
        let program = vec![
            Instr::Name(Arc::from("max")),
            Instr::Number(1.0),
            Instr::Number(5.0),
            Instr::Number(3.0),
            Instr::Call,
        ];
        assert_eq!(eval_rpn(&program, &(), &config), Ok(5.0));
    }

    #[test]
    fn test_call_without_marker() {
        let program = vec![Instr::Number(1.0), Instr::Call];
        assert_eq!(
            eval_rpn(&program, &(), &ExprConfig::default()),
            Err(EvalError::MalformedCall)
        );
    }

    #[test]
    fn test_marker_as_operand() {
        let program = vec![
            Instr::Name(Arc::from("sin")),
            Instr::Number(1.0),
            Instr::Binary(BinaryOp::Add),
        ];
        assert_eq!(
            eval_rpn(&program, &(), &ExprConfig::default()),
            Err(EvalError::InvalidOperand)
        );
    }

    #[test]
    fn test_variable_shadows_function() {
        let program = vec![Instr::Name(Arc::from("sin"))];
        assert_eq!(
            eval_rpn(&program, &[("sin", 2.0)], &ExprConfig::default()),
            Ok(2.0)
        );
    }

    #[test]
    fn test_non_finite_variable() {
        let program = vec![Instr::Name(Arc::from("x"))];
        assert_eq!(
            eval_rpn(&program, &[("x", f64::NAN)], &ExprConfig::default()),
            Err(EvalError::InvalidVariable("x".to_string()))
        );
    }
}

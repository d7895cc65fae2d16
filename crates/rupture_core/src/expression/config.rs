//! Function, constant and operator tables used when compiling formulas.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::EvalError;

/// Upper bound on formula length, to bound parse cost
pub const MAX_EXPRESSION_LEN: usize = 100_000;

/// Native implementation of a formula function
pub type MathFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Variadic,
}

/// A named function callable from a formula as `name(arg, ...)`
#[derive(Clone)]
pub struct Function {
    arity: Arity,
    f: MathFn,
}

impl Function {
    pub fn new(arity: Arity, f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            arity,
            f: Arc::new(f),
        }
    }

    /// Wrap a one-argument function such as `f64::sin`
    pub fn unary(f: fn(f64) -> f64) -> Self {
        Self::new(Arity::Exact(1), move |args| f(args[0]))
    }

    /// Function accepting any number of arguments
    pub fn variadic(f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Self::new(Arity::Variadic, f)
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Invoke with `args` in source order. Arity is checked before the call.
    pub fn call(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        if let Arity::Exact(expected) = self.arity
            && args.len() != expected
        {
            return Err(EvalError::Arity {
                function: name.to_string(),
                expected,
                found: args.len(),
            });
        }
        Ok((self.f)(args))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '^' => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 3,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }

    fn slot(self) -> usize {
        match self {
            BinaryOp::Add => 0,
            BinaryOp::Sub => 1,
            BinaryOp::Mul => 2,
            BinaryOp::Div => 3,
            BinaryOp::Pow => 4,
        }
    }
}

/// Which binary operators a formula may use. A disabled operator is an
/// unknown symbol at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSet {
    enabled: [bool; 5],
}

impl OperatorSet {
    pub fn all() -> Self {
        Self { enabled: [true; 5] }
    }

    pub fn none() -> Self {
        Self { enabled: [false; 5] }
    }

    #[must_use]
    pub fn with(mut self, op: BinaryOp, enabled: bool) -> Self {
        self.enabled[op.slot()] = enabled;
        self
    }

    pub fn is_enabled(&self, op: BinaryOp) -> bool {
        self.enabled[op.slot()]
    }
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Compilation environment for formulas.
///
/// Starts from the built-in functions (`sin`, `cos`, `tan`, `sqrt`, `abs`,
/// `ln`, `log`, `exp`, `min`, `max`) and constants (`pi`, `e`); entries added
/// with [`ExprConfig::with_function`] / [`ExprConfig::with_constant`] override
/// built-ins of the same name.
#[derive(Debug, Clone)]
pub struct ExprConfig {
    functions: FxHashMap<String, Function>,
    constants: FxHashMap<String, f64>,
    operators: OperatorSet,
}

impl ExprConfig {
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, function: Function) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    #[must_use]
    pub fn with_constant(mut self, name: impl Into<String>, value: f64) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_operators(mut self, operators: OperatorSet) -> Self {
        self.operators = operators;
        self
    }

    #[must_use]
    pub fn disable(mut self, op: BinaryOp) -> Self {
        self.operators = self.operators.with(op, false);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<f64> {
        self.constants.get(name).copied()
    }

    pub fn operators(&self) -> OperatorSet {
        self.operators
    }
}

impl Default for ExprConfig {
    fn default() -> Self {
        let mut functions = FxHashMap::default();
        functions.insert("sin".to_string(), Function::unary(f64::sin));
        functions.insert("cos".to_string(), Function::unary(f64::cos));
        functions.insert("tan".to_string(), Function::unary(f64::tan));
        functions.insert("sqrt".to_string(), Function::unary(f64::sqrt));
        functions.insert("abs".to_string(), Function::unary(f64::abs));
        functions.insert("ln".to_string(), Function::unary(f64::ln));
        functions.insert("log".to_string(), Function::unary(f64::ln));
        functions.insert("exp".to_string(), Function::unary(f64::exp));
        functions.insert(
            "min".to_string(),
            Function::variadic(|args| args.iter().copied().fold(f64::INFINITY, f64::min)),
        );
        functions.insert(
            "max".to_string(),
            Function::variadic(|args| args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        );

        let mut constants = FxHashMap::default();
        constants.insert("pi".to_string(), std::f64::consts::PI);
        constants.insert("e".to_string(), std::f64::consts::E);

        Self {
            functions,
            constants,
            operators: OperatorSet::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_set_toggle() {
        let ops = OperatorSet::all().with(BinaryOp::Pow, false);
        assert!(!ops.is_enabled(BinaryOp::Pow));
        assert!(ops.is_enabled(BinaryOp::Add));

        let none = OperatorSet::none().with(BinaryOp::Mul, true);
        assert!(none.is_enabled(BinaryOp::Mul));
        assert!(!none.is_enabled(BinaryOp::Sub));
    }

    #[test]
    fn test_unary_arity_checked() {
        let config = ExprConfig::default();
        let sin = config.function("sin").unwrap();
        assert_eq!(sin.call("sin", &[0.0]), Ok(0.0));
        assert!(matches!(
            sin.call("sin", &[1.0, 2.0]),
            Err(EvalError::Arity { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_custom_entries_override_builtins() {
        let config = ExprConfig::default()
            .with_constant("pi", 3.0)
            .with_function("double", Function::unary(|x| 2.0 * x));
        assert_eq!(config.constant("pi"), Some(3.0));
        assert_eq!(config.function("double").unwrap().call("double", &[4.0]), Ok(8.0));
    }
}

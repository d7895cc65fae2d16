//! Safe arithmetic formula interpreter.
//!
//! Formulas are tokenized, converted to reverse-Polish form with the
//! shunting-yard algorithm and run on a small stack machine. No code is ever
//! executed besides the arithmetic operators and the functions registered in
//! [`ExprConfig`].
//!
//! ```ignore
//! use rupture_core::expression::Expression;
//!
//! let expr = Expression::compile("2 * x + sin(pi / 4)")?;
//! let a = expr.eval(&[("x", 1.0)])?;
//! let b = expr.eval(&[("x", 2.0)])?; // no re-parse
//! ```
//!
//! Name lookup order at evaluation: constants, then caller variables, then
//! functions. Every intermediate value must be finite.

mod config;
mod eval;
mod rpn;
mod token;

use std::fmt;
use std::sync::{Arc, LazyLock};

pub use config::{Arity, BinaryOp, ExprConfig, Function, MAX_EXPRESSION_LEN, MathFn, OperatorSet};
pub use eval::Scope;
pub use token::{Token, tokenize};

use crate::error::{EvalError, SyntaxError};

use rpn::Instr;

static DEFAULT_CONFIG: LazyLock<Arc<ExprConfig>> =
    LazyLock::new(|| Arc::new(ExprConfig::default()));

/// A formula compiled once and evaluated many times.
///
/// Cloning is cheap: the program and configuration are shared.
#[derive(Clone)]
pub struct Expression {
    source: Arc<str>,
    program: Arc<[Instr]>,
    config: Arc<ExprConfig>,
}

impl Expression {
    /// Compile with the built-in functions, constants and operators
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        Self::compile_with(source, DEFAULT_CONFIG.clone())
    }

    pub fn compile_with(source: &str, config: Arc<ExprConfig>) -> Result<Self, SyntaxError> {
        let len = source.chars().count();
        if len > MAX_EXPRESSION_LEN {
            return Err(SyntaxError::TooLong {
                len,
                max: MAX_EXPRESSION_LEN,
            });
        }

        let tokens = tokenize(source)?;
        let program = rpn::to_rpn(&tokens, &config)?;

        Ok(Self {
            source: Arc::from(source),
            program: Arc::from(program),
            config,
        })
    }

    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, EvalError> {
        eval::eval_rpn(&self.program, scope, &self.config)
    }

}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

/// Errors from the one-shot [`evaluate`] helper
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    Syntax(SyntaxError),
    Eval(EvalError),
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Syntax(e) => write!(f, "{e}"),
            ExpressionError::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExpressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExpressionError::Syntax(e) => Some(e),
            ExpressionError::Eval(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for ExpressionError {
    fn from(e: SyntaxError) -> Self {
        ExpressionError::Syntax(e)
    }
}

impl From<EvalError> for ExpressionError {
    fn from(e: EvalError) -> Self {
        ExpressionError::Eval(e)
    }
}

/// Compile and evaluate `source` once
pub fn evaluate<S: Scope + ?Sized>(
    source: &str,
    scope: &S,
    config: Option<Arc<ExprConfig>>,
) -> Result<f64, ExpressionError> {
    let config = config.unwrap_or_else(|| DEFAULT_CONFIG.clone());
    let expr = Expression::compile_with(source, config)?;
    Ok(expr.eval(scope)?)
}

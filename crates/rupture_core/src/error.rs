use std::fmt;

use crate::stress::Component;

/// Errors raised while tokenizing or parsing a formula
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// Formula exceeds the maximum accepted length
    TooLong { len: usize, max: usize },
    /// No token matches at this character offset
    UnexpectedCharacter { offset: usize, found: char },
    /// A symbol that is not (or no longer) an enabled operator
    UnknownSymbol(String),
    UnmatchedParenthesis,
    /// A comma with no enclosing `(`
    MisplacedComma,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::TooLong { len, max } => {
                write!(f, "expression too long ({len} characters, max {max})")
            }
            SyntaxError::UnexpectedCharacter { offset, found } => {
                write!(f, "unexpected character '{found}' at position {offset}")
            }
            SyntaxError::UnknownSymbol(symbol) => write!(f, "unknown symbol \"{symbol}\""),
            SyntaxError::UnmatchedParenthesis => write!(f, "unmatched parentheses"),
            SyntaxError::MisplacedComma => {
                write!(f, "misplaced comma (missing parentheses)")
            }
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Errors raised while executing a compiled formula
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UnknownIdentifier(String),
    /// A caller-supplied variable is NaN or infinite
    InvalidVariable(String),
    /// An intermediate or final value is NaN or infinite
    NonFinite,
    /// A call instruction found no function marker on the stack
    MalformedCall,
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },
    /// An operator or function received a function marker instead of a number
    InvalidOperand,
    /// The program did not leave exactly one number on the stack
    MalformedExpression { depth: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownIdentifier(name) => write!(f, "unknown identifier: {name}"),
            EvalError::InvalidVariable(name) => write!(f, "invalid variable: {name}"),
            EvalError::NonFinite => write!(f, "non-finite result (NaN/Inf)"),
            EvalError::MalformedCall => write!(f, "malformed function call"),
            EvalError::Arity {
                function,
                expected,
                found,
            } => write!(
                f,
                "function {function} expects {expected} argument(s), got {found}"
            ),
            EvalError::InvalidOperand => write!(f, "invalid operand"),
            EvalError::MalformedExpression { depth } => {
                write!(f, "malformed expression (final stack depth {depth})")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Errors from the stress field, tagged with the failing magnitude formula
#[derive(Debug, Clone, PartialEq)]
pub enum StressError {
    Syntax {
        component: Component,
        source: SyntaxError,
    },
    Eval {
        component: Component,
        source: EvalError,
    },
}

impl fmt::Display for StressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StressError::Syntax { component, source } => {
                write!(f, "cannot compile {component} formula: {source}")
            }
            StressError::Eval { component, source } => {
                write!(f, "cannot evaluate {component} formula: {source}")
            }
        }
    }
}

impl std::error::Error for StressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StressError::Syntax { source, .. } => Some(source),
            StressError::Eval { source, .. } => Some(source),
        }
    }
}

/// Setup errors, raised before any sweep starts
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownAxis(String),
    UnknownParameter(String),
    /// Sample count below 2
    InvalidSampling(usize),
    InvalidBounds { min: f64, max: f64 },
    /// No fault facets loaded
    EmptyGeometry,
    /// `n^dims` grid points do not fit in memory
    GridTooLarge { n: usize, dims: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownAxis(name) => {
                write!(f, "unknown axis name {name}, must be either x, y or z")
            }
            ConfigError::UnknownParameter(name) => write!(f, "unknown sweep parameter {name}"),
            ConfigError::InvalidSampling(n) => {
                write!(f, "sample count must be at least 2 (got {n})")
            }
            ConfigError::InvalidBounds { min, max } => {
                write!(f, "invalid axis bounds [{min}, {max}]")
            }
            ConfigError::EmptyGeometry => write!(f, "no fault geometry loaded"),
            ConfigError::GridTooLarge { n, dims } => {
                write!(f, "{n} samples over {dims} axes is too many grid points")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from the triangle-mesh collaborator and the facet accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    PositionsNotTriplets(usize),
    IndicesNotTriplets(usize),
    IndexOutOfRange {
        face: usize,
        index: usize,
        vertices: usize,
    },
    /// Face with zero area, so no normal can be defined
    DegenerateFace(usize),
    LengthMismatch { normals: usize, areas: usize },
    NonFinite(usize),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::PositionsNotTriplets(len) => {
                write!(f, "position array length {len} is not a multiple of 3")
            }
            GeometryError::IndicesNotTriplets(len) => {
                write!(f, "index array length {len} is not a multiple of 3")
            }
            GeometryError::IndexOutOfRange {
                face,
                index,
                vertices,
            } => write!(
                f,
                "face {face} references vertex {index} but only {vertices} vertices exist"
            ),
            GeometryError::DegenerateFace(face) => write!(f, "face {face} is degenerate"),
            GeometryError::LengthMismatch { normals, areas } => {
                write!(f, "{normals} normals but {areas} areas")
            }
            GeometryError::NonFinite(face) => write!(f, "face {face} has non-finite data"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Errors that abort a sweep (cancellation is reported separately, not here)
#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    Config(ConfigError),
    Stress(StressError),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Config(e) => write!(f, "configuration error: {e}"),
            SweepError::Stress(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Config(e) => Some(e),
            SweepError::Stress(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SweepError {
    fn from(e: ConfigError) -> Self {
        SweepError::Config(e)
    }
}

impl From<StressError> for SweepError {
    fn from(e: StressError) -> Self {
        SweepError::Stress(e)
    }
}

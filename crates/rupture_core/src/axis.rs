//! Binding of a sweep dimension to one physical parameter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::{SweepParam, SweepParameters};

/// Sweep dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisLetter {
    X,
    Y,
    Z,
}

impl AxisLetter {
    pub fn index(self) -> usize {
        match self {
            AxisLetter::X => 0,
            AxisLetter::Y => 1,
            AxisLetter::Z => 2,
        }
    }
}

impl fmt::Display for AxisLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisLetter::X => write!(f, "x"),
            AxisLetter::Y => write!(f, "y"),
            AxisLetter::Z => write!(f, "z"),
        }
    }
}

impl FromStr for AxisLetter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(AxisLetter::X),
            "y" => Ok(AxisLetter::Y),
            "z" => Ok(AxisLetter::Z),
            _ => Err(ConfigError::UnknownAxis(s.to_string())),
        }
    }
}

/// Declarative form of an axis, as found in run files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub parameter: SweepParam,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub reverse: bool,
}

/// Maps a sweep index to a value in `[min, max]` and writes it into the bound
/// parameter. `value(0)` is `min` and `value(n - 1)` is `max` (swapped when
/// reversed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    param: SweepParam,
    n: usize,
    min: f64,
    max: f64,
    reverse: bool,
}

impl Axis {
    pub fn new(
        param: SweepParam,
        n: usize,
        min: f64,
        max: f64,
        reverse: bool,
    ) -> Result<Self, ConfigError> {
        check_sampling(n)?;
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::InvalidBounds { min, max });
        }
        Ok(Self {
            param,
            n,
            min,
            max,
            reverse,
        })
    }

    /// Known-valid axis for built-in defaults
    pub(crate) const fn preset(param: SweepParam, n: usize, min: f64, max: f64) -> Self {
        Self {
            param,
            n,
            min,
            max,
            reverse: false,
        }
    }

    pub fn from_config(config: &AxisConfig, n: usize) -> Result<Self, ConfigError> {
        Self::new(config.parameter, n, config.min, config.max, config.reverse)
    }

    pub fn set_sampling(&mut self, n: usize) -> Result<(), ConfigError> {
        check_sampling(n)?;
        self.n = n;
        Ok(())
    }

    pub fn value(&self, i: usize) -> f64 {
        let step = if self.reverse { self.n - 1 - i } else { i };
        self.min + step as f64 * (self.max - self.min) / (self.n - 1) as f64
    }

    /// Write `value(i)` into the bound parameter
    pub fn update(&self, i: usize, params: &mut SweepParameters) {
        params.set(self.param, self.value(i));
    }

    /// All sample values in index order
    pub fn values(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.value(i)).collect()
    }

    pub fn param(&self) -> SweepParam {
        self.param
    }

    pub fn sampling(&self) -> usize {
        self.n
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn label(&self) -> String {
        format!("{} [{}, {}]", self.param, self.min, self.max)
    }
}

fn check_sampling(n: usize) -> Result<(), ConfigError> {
    if n < 2 {
        return Err(ConfigError::InvalidSampling(n));
    }
    Ok(())
}

//! Physical scalars a sweep may vary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A scalar an axis can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParam {
    /// Friction coefficient μ
    Friction,
    /// Cohesion Co
    Cohesion,
    /// Pore-pressure ratio λ
    Lambda,
    /// Pore pressure Pr
    Pressure,
    /// Poisson ratio ν
    Poisson,
    /// Stress azimuth θ in degrees
    Theta,
    /// Stress ratio, visible to stress formulas as `R`
    #[serde(rename = "R", alias = "ratio")]
    Ratio,
}

impl SweepParam {
    pub const ALL: [SweepParam; 7] = [
        SweepParam::Friction,
        SweepParam::Cohesion,
        SweepParam::Lambda,
        SweepParam::Pressure,
        SweepParam::Poisson,
        SweepParam::Theta,
        SweepParam::Ratio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SweepParam::Friction => "friction",
            SweepParam::Cohesion => "cohesion",
            SweepParam::Lambda => "lambda",
            SweepParam::Pressure => "pressure",
            SweepParam::Poisson => "poisson",
            SweepParam::Theta => "theta",
            SweepParam::Ratio => "R",
        }
    }
}

impl fmt::Display for SweepParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SweepParam {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friction" => Ok(SweepParam::Friction),
            "cohesion" => Ok(SweepParam::Cohesion),
            "lambda" => Ok(SweepParam::Lambda),
            "pressure" => Ok(SweepParam::Pressure),
            "poisson" => Ok(SweepParam::Poisson),
            "theta" => Ok(SweepParam::Theta),
            "R" | "ratio" => Ok(SweepParam::Ratio),
            _ => Err(ConfigError::UnknownParameter(s.to_string())),
        }
    }
}

/// Current values of every sweepable scalar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepParameters {
    pub friction: f64,
    pub cohesion: f64,
    pub lambda: f64,
    pub pressure: f64,
    pub poisson: f64,
    pub theta: f64,
    #[serde(rename = "R", alias = "ratio")]
    pub ratio: f64,
}

impl SweepParameters {
    pub fn get(&self, param: SweepParam) -> f64 {
        match param {
            SweepParam::Friction => self.friction,
            SweepParam::Cohesion => self.cohesion,
            SweepParam::Lambda => self.lambda,
            SweepParam::Pressure => self.pressure,
            SweepParam::Poisson => self.poisson,
            SweepParam::Theta => self.theta,
            SweepParam::Ratio => self.ratio,
        }
    }

    pub fn set(&mut self, param: SweepParam, value: f64) {
        let slot = match param {
            SweepParam::Friction => &mut self.friction,
            SweepParam::Cohesion => &mut self.cohesion,
            SweepParam::Lambda => &mut self.lambda,
            SweepParam::Pressure => &mut self.pressure,
            SweepParam::Poisson => &mut self.poisson,
            SweepParam::Theta => &mut self.theta,
            SweepParam::Ratio => &mut self.ratio,
        };
        *slot = value;
    }
}

impl Default for SweepParameters {
    fn default() -> Self {
        Self {
            friction: 0.0,
            cohesion: 0.0,
            lambda: 0.0,
            pressure: 0.0,
            poisson: 0.25,
            theta: 0.0,
            ratio: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_every_param() {
        let mut params = SweepParameters::default();
        for (i, param) in SweepParam::ALL.into_iter().enumerate() {
            params.set(param, i as f64 + 0.5);
        }
        for (i, param) in SweepParam::ALL.into_iter().enumerate() {
            assert_eq!(params.get(param), i as f64 + 0.5);
        }
    }

    #[test]
    fn test_param_names_round_trip() {
        for param in SweepParam::ALL {
            assert_eq!(param.name().parse::<SweepParam>(), Ok(param));
        }
        assert_eq!("ratio".parse::<SweepParam>(), Ok(SweepParam::Ratio));
        assert_eq!(
            "mu".parse::<SweepParam>(),
            Err(ConfigError::UnknownParameter("mu".to_string()))
        );
    }
}

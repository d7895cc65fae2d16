//! Andersonian remote stress defined by three magnitude formulas and an
//! azimuth.
//!
//! The principal tensor is diagonal in (minor horizontal, major horizontal,
//! vertical) order and is rotated about the vertical axis by `θ` degrees:
//! `σ = R · diag(Sh, SH, Sv) · Rᵗ`. Formulas see the evaluation point as
//! `x`, `y`, `z` and the stress ratio parameter as `R`.

use std::fmt;
use std::sync::Arc;

use crate::error::StressError;
use crate::expression::{ExprConfig, Expression, Scope};
use crate::math::{Mat3, Vec3, diagonal, rotate_forward};

/// Which magnitude formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// SH
    MajorHorizontal,
    /// Sh
    MinorHorizontal,
    /// Sv
    Vertical,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::MajorHorizontal,
        Component::MinorHorizontal,
        Component::Vertical,
    ];

    fn slot(self) -> usize {
        match self {
            Component::MajorHorizontal => 0,
            Component::MinorHorizontal => 1,
            Component::Vertical => 2,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::MajorHorizontal => write!(f, "SH"),
            Component::MinorHorizontal => write!(f, "Sh"),
            Component::Vertical => write!(f, "Sv"),
        }
    }
}

/// Rotation about the vertical axis by `theta` degrees
pub fn azimuth_rotation(theta: f64) -> Mat3 {
    let (sin, cos) = theta.to_radians().sin_cos();
    [[cos, sin, 0.0], [-sin, cos, 0.0], [0.0, 0.0, 1.0]]
}

/// Formula variables: the evaluation point and the stress ratio
struct PointScope {
    point: Vec3,
    ratio: f64,
}

impl Scope for PointScope {
    fn lookup(&self, name: &str) -> Option<f64> {
        match name {
            "x" => Some(self.point[0]),
            "y" => Some(self.point[1]),
            "z" => Some(self.point[2]),
            "R" => Some(self.ratio),
            _ => None,
        }
    }
}

/// The three magnitude formulas, compiled
#[derive(Debug, Clone)]
pub struct CompiledStress {
    magnitudes: [Expression; 3],
}

impl CompiledStress {
    /// Compile formulas given in (SH, Sh, Sv) order
    pub fn compile(formulas: [&str; 3], config: &Arc<ExprConfig>) -> Result<Self, StressError> {
        let compile = |component: Component| {
            Expression::compile_with(formulas[component.slot()], config.clone())
                .map_err(|source| StressError::Syntax { component, source })
        };
        Ok(Self {
            magnitudes: [
                compile(Component::MajorHorizontal)?,
                compile(Component::MinorHorizontal)?,
                compile(Component::Vertical)?,
            ],
        })
    }

    /// Principal magnitudes (SH, Sh, Sv) at `point`
    pub fn principal_at(&self, point: &Vec3, ratio: f64) -> Result<Vec3, StressError> {
        let scope = PointScope {
            point: *point,
            ratio,
        };
        let mut out = [0.0; 3];
        for component in Component::ALL {
            out[component.slot()] = self.magnitudes[component.slot()]
                .eval(&scope)
                .map_err(|source| StressError::Eval { component, source })?;
        }
        Ok(out)
    }

    /// Full tensor at `point` for the given azimuth rotation
    pub fn tensor_at(&self, point: &Vec3, ratio: f64, rotation: &Mat3) -> Result<Mat3, StressError> {
        let [sh_max, sh_min, sv] = self.principal_at(point, ratio)?;
        Ok(rotate_forward(rotation, &diagonal(&[sh_min, sh_max, sv])))
    }
}

/// Owns the formula strings and the azimuth, recompiling lazily.
///
/// Formula setters bump a version counter; [`StressField::compile`] rebuilds
/// the programs only when the counter moved since the last compile. The
/// rotation matrix is rebuilt eagerly whenever the angle changes.
#[derive(Debug, Clone)]
pub struct StressField {
    formulas: [String; 3],
    theta: f64,
    ratio: f64,
    rotation: Mat3,
    config: Arc<ExprConfig>,
    version: u64,
    compiled: Option<(u64, CompiledStress)>,
}

impl StressField {
    pub fn new(sh_max: &str, sh_min: &str, sv: &str, theta: f64) -> Self {
        Self {
            formulas: [sh_max.to_string(), sh_min.to_string(), sv.to_string()],
            theta,
            ratio: 0.0,
            rotation: azimuth_rotation(theta),
            config: Arc::new(ExprConfig::default()),
            version: 0,
            compiled: None,
        }
    }

    /// Use a custom formula environment (forces recompilation)
    #[must_use]
    pub fn with_config(mut self, config: Arc<ExprConfig>) -> Self {
        self.config = config;
        self.version += 1;
        self
    }

    pub fn set_formula(&mut self, component: Component, formula: &str) {
        let slot = &mut self.formulas[component.slot()];
        if slot.as_str() != formula {
            *slot = formula.to_string();
            self.version += 1;
        }
    }

    pub fn set_sh_max(&mut self, formula: &str) {
        self.set_formula(Component::MajorHorizontal, formula);
    }

    pub fn set_sh_min(&mut self, formula: &str) {
        self.set_formula(Component::MinorHorizontal, formula);
    }

    pub fn set_sv(&mut self, formula: &str) {
        self.set_formula(Component::Vertical, formula);
    }

    /// Azimuth in degrees
    pub fn set_theta(&mut self, theta: f64) {
        if theta != self.theta {
            self.theta = theta;
            self.rotation = azimuth_rotation(theta);
        }
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio;
    }

    pub fn formula(&self, component: Component) -> &str {
        &self.formulas[component.slot()]
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn rotation(&self) -> &Mat3 {
        &self.rotation
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when a formula changed since the last successful compile
    pub fn is_stale(&self) -> bool {
        !matches!(&self.compiled, Some((v, _)) if *v == self.version)
    }

    pub fn compile(&mut self) -> Result<&CompiledStress, StressError> {
        if self.is_stale() {
            self.compiled = None;
        }
        let entry = match self.compiled.take() {
            Some(entry) => entry,
            None => {
                let [sh_max, sh_min, sv] = &self.formulas;
                let compiled = CompiledStress::compile(
                    [sh_max.as_str(), sh_min.as_str(), sv.as_str()],
                    &self.config,
                )?;
                tracing::debug!(
                    version = self.version,
                    "compiled stress formulas SH={sh_max:?} Sh={sh_min:?} Sv={sv:?}"
                );
                (self.version, compiled)
            }
        };
        Ok(&self.compiled.insert(entry).1)
    }

    /// Stress tensor at `point`, compiling first if needed
    pub fn stress_at(&mut self, point: &Vec3) -> Result<Mat3, StressError> {
        let rotation = self.rotation;
        let ratio = self.ratio;
        self.compile()?.tensor_at(point, ratio, &rotation)
    }
}

impl Default for StressField {
    fn default() -> Self {
        Self::new("0", "0", "1", 0.0)
    }
}

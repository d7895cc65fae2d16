//! YAML run description.
//!
//! ```yaml
//! dims: 2d
//! samples: 20
//! stress:
//!   sh_max: "2 + R"
//!   sh_min: "1"
//!   sv: "0.025 * 1000"
//! params:
//!   friction: 0.6
//!   poisson: 0.25
//! axes:
//!   x: { parameter: R, min: 0, max: 3 }
//!   y: { parameter: theta, min: 0, max: 180 }
//! faults:
//!   - rectangle: { width: 10, height: 5, cells_x: 8, cells_y: 4, dip: 60, strike: 30 }
//! ```

use std::path::Path;

use color_eyre::eyre::{WrapErr, eyre};
use rupture_core::{
    AxisConfig, AxisLetter, DEFAULT_SAMPLING, Dims, RuptureEnvelope, SweepParameters,
    geometry::{Mesh, rectangle},
};
use serde::{Deserialize, Serialize};

/// The three magnitude formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub sh_max: String,
    pub sh_min: String,
    pub sv: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            sh_max: "0".to_string(),
            sh_min: "0".to_string(),
            sv: "1".to_string(),
        }
    }
}

/// Axis bindings; unset axes keep the engine defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub x: Option<AxisConfig>,
    pub y: Option<AxisConfig>,
    pub z: Option<AxisConfig>,
}

/// One fault surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultConfig {
    /// Regular triangulated rectangle, tilted by dip then strike (degrees)
    Rectangle {
        width: f64,
        height: f64,
        #[serde(default = "one")]
        cells_x: usize,
        #[serde(default = "one")]
        cells_y: usize,
        #[serde(default)]
        dip: f64,
        #[serde(default)]
        strike: f64,
    },
    /// Explicit triangle mesh
    Mesh { positions: Vec<f64>, indices: Vec<u32> },
}

fn one() -> usize {
    1
}

impl FaultConfig {
    pub fn mesh(&self) -> Mesh {
        match self {
            FaultConfig::Rectangle {
                width,
                height,
                cells_x,
                cells_y,
                dip,
                strike,
            } => rectangle(*width, *height, *cells_x, *cells_y).tilted(*dip, *strike),
            FaultConfig::Mesh { positions, indices } => Mesh {
                positions: positions.clone(),
                indices: indices.clone(),
            },
        }
    }
}

/// Everything needed to set up and run one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub dims: Dims,
    pub samples: usize,
    pub stress: StressConfig,
    pub params: SweepParameters,
    pub axes: AxesConfig,
    pub faults: Vec<FaultConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dims: Dims::Two,
            samples: DEFAULT_SAMPLING,
            stress: StressConfig::default(),
            params: SweepParameters::default(),
            axes: AxesConfig::default(),
            faults: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read run file {}", path.display()))?;
        Self::from_yaml(&yaml).map_err(|e| eyre!("invalid run file {}: {e}", path.display()))
    }

    /// Configure an engine; sampling is applied before the axes so that axis
    /// errors point at the axis rather than the sample count
    pub fn build(&self) -> color_eyre::Result<RuptureEnvelope> {
        let mut envelope = RuptureEnvelope::new();
        envelope
            .set_sampling(self.samples)
            .wrap_err("invalid sample count")?;

        let axes = [
            (AxisLetter::X, &self.axes.x),
            (AxisLetter::Y, &self.axes.y),
            (AxisLetter::Z, &self.axes.z),
        ];
        for (letter, axis) in axes {
            if let Some(axis) = axis {
                envelope
                    .configure_axis(letter, axis)
                    .wrap_err_with(|| format!("invalid {letter} axis"))?;
            }
        }

        envelope.set_params(self.params);
        envelope.set_sh_max(&self.stress.sh_max);
        envelope.set_sh_min(&self.stress.sh_min);
        envelope.set_sv(&self.stress.sv);

        for (i, fault) in self.faults.iter().enumerate() {
            let mesh = fault.mesh();
            let added = envelope
                .add_fault(&mesh.positions, &mesh.indices)
                .wrap_err_with(|| format!("invalid fault #{i}"))?;
            tracing::info!(fault = i, faces = added, "fault loaded");
        }

        // surface formula errors before the worker starts
        envelope
            .compile_stress()
            .wrap_err("invalid stress formula")?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rupture_core::SweepParam;
    use std::io::Write;

    const RUN: &str = r#"
dims: 3d
samples: 4
stress:
  sh_max: "2 + R"
  sh_min: "1"
  sv: "3"
params:
  friction: 0.6
  R: 0.5
axes:
  x: { parameter: R, min: 0, max: 3 }
  y: { parameter: theta, min: 0, max: 180, reverse: true }
  z: { parameter: cohesion, min: 0, max: 1 }
faults:
  - rectangle: { width: 10, height: 5, cells_x: 4, cells_y: 2, dip: 60 }
  - mesh:
      positions: [0, 0, 0, 1, 0, 0, 0, 1, 1]
      indices: [0, 1, 2]
"#;

    #[test]
    fn test_parse_run_file() {
        let config = RunConfig::from_yaml(RUN).unwrap();
        assert_eq!(config.dims, Dims::Three);
        assert_eq!(config.samples, 4);
        assert_eq!(config.params.friction, 0.6);
        assert_eq!(config.params.ratio, 0.5);
        assert_eq!(config.params.poisson, 0.25);
        let y = config.axes.y.unwrap();
        assert_eq!(y.parameter, SweepParam::Theta);
        assert!(y.reverse);
        assert_eq!(config.faults.len(), 2);
    }

    #[test]
    fn test_load_and_build() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RUN.as_bytes()).unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        let envelope = config.build().unwrap();
        assert_eq!(envelope.sampling(), 4);
        assert_eq!(envelope.geometry().len(), 17);
        assert_eq!(envelope.axis(AxisLetter::Z).param(), SweepParam::Cohesion);
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = RunConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_bad_formula_is_reported_at_build() {
        let mut config = RunConfig::from_yaml(RUN).unwrap();
        config.stress.sv = "(3".to_string();
        assert!(config.build().is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read run file"));
    }
}

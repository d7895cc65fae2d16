//! Rupture-envelope estimation for faults under a remote Andersonian stress.
//!
//! This crate sweeps up to three physical parameters over a regular grid and,
//! for every grid point, reports the area-weighted fraction of fault facets
//! whose shear traction exceeds a Mohr–Coulomb threshold. It provides:
//! - A safe formula interpreter for the stress magnitudes (`SH`, `Sh`, `Sv`)
//! - A lazily recompiled stress field rotated by an azimuth
//! - Axes binding sweep dimensions to typed parameters
//! - 2D/3D sweeps, chunked for cooperative hosts or parallel with rayon
//! - Progress reporting with cooperative cancellation
//!
//! # Example
//!
//! ```ignore
//! use rupture_core::{ProgressReporter, RuptureEnvelope, geometry};
//!
//! let mut envelope = RuptureEnvelope::new();
//! let mesh = geometry::rectangle(10.0, 5.0, 8, 4).tilted(60.0, 30.0);
//! envelope.add_fault(&mesh.positions, &mesh.indices)?;
//! envelope.set_sh_max("2 + R");
//! envelope.set_sh_min("1");
//! envelope.set_sv("3");
//! envelope.set_axis("x", "R", 0.0, 3.0, false)?;
//! envelope.set_axis("y", "theta", 0.0, 180.0, false)?;
//! envelope.set_sampling(20)?;
//!
//! let report = envelope.run_2d(&ProgressReporter::new())?;
//! let grid = envelope.square().unwrap();
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod envelope;
pub mod error;
pub mod expression;
pub mod math;
pub mod progress;
pub mod stress;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod axis;
pub mod geometry;
pub mod grid;
pub mod params;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use axis::{Axis, AxisConfig, AxisLetter};
pub use envelope::{
    DEFAULT_SAMPLING, Dims, EnergyTerms, RunStatus, RuptureEnvelope, Sweep, SweepReport,
    SweepStatus,
};
pub use error::{
    ConfigError, EvalError, GeometryError, StressError, SweepError, SyntaxError,
};
pub use expression::{ExprConfig, Expression};
pub use geometry::{FaceSet, FaultGeometry, Mesh};
pub use grid::SweepGrid;
pub use params::{SweepParam, SweepParameters};
pub use progress::{CancelHandle, ProgressReporter};
pub use stress::{Component, StressField};

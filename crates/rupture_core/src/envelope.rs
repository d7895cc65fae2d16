//! Rupture-envelope sweeps.
//!
//! A [`RuptureEnvelope`] owns the remote stress, the accumulated fault facets,
//! the physical scalars and three axes. Each grid point binds the axes, resolves
//! the traction on every facet and reports the area-weighted fraction of facets
//! whose shear traction exceeds the Mohr–Coulomb threshold
//! `C = (|tn| − Pr) · μ · (1 − λ) + Co`.
//!
//! Sweeps are driven through a [`Sweep`] cursor so that a host can interleave
//! other work between chunks of grid points. `run_2d` and `run_3d` drive the
//! cursor to the end in one call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisConfig, AxisLetter};
use crate::error::{ConfigError, GeometryError, StressError, SweepError};
use crate::expression::ExprConfig;
use crate::geometry::{FaceSet, FaultGeometry, faces_from_mesh};
use crate::grid::SweepGrid;
use crate::math::{Mat3, Vec3, norm, normal_and_shear};
use crate::params::{SweepParam, SweepParameters};
use crate::progress::ProgressReporter;
use crate::stress::{CompiledStress, Component, StressField};

// TODO: evaluate at each facet centroid once faces carry their centroids
/// Stress is sampled here for every facet
const REFERENCE_POINT: Vec3 = [0.0, 0.0, 0.0];

pub const DEFAULT_SAMPLING: usize = 10;

/// Number of swept axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dims {
    /// x and y
    #[serde(rename = "2d", alias = "2D")]
    Two,
    /// x, y and z
    #[serde(rename = "3d", alias = "3D")]
    Three,
}

impl Dims {
    pub fn count(self) -> usize {
        match self {
            Dims::Two => 2,
            Dims::Three => 3,
        }
    }

    /// Grid points for `n` samples per axis; `None` on overflow
    pub fn points(self, n: usize) -> Option<usize> {
        n.checked_pow(self.count() as u32)
    }
}

/// Checked grid size; the grid must fit in a single `Vec<f64>`
fn grid_points(dims: Dims, n: usize) -> Result<usize, ConfigError> {
    const MAX_POINTS: usize = isize::MAX as usize / std::mem::size_of::<f64>();
    dims.points(n)
        .filter(|&total| total <= MAX_POINTS)
        .ok_or(ConfigError::GridTooLarge {
            n,
            dims: dims.count(),
        })
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    /// Stopped early; slots past the last evaluated point hold NaN
    Cancelled,
}

/// Result of [`Sweep::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Running,
    Finished(RunStatus),
}

/// Summary of a finished run; the grid itself is kept on the envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    pub status: RunStatus,
    pub dims: Dims,
    pub completed: usize,
    pub total: usize,
    /// Smallest and largest value written, if any
    pub range: Option<(f64, f64)>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Per-point functional with its diagnostic energies.
///
/// All three are weighted by `area / max_area` and summed over ruptured faces.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyTerms {
    pub ruptured_fraction: f64,
    /// `(1 + ν)(|ts| − C)²`
    pub distortional: f64,
    /// `(1 − 2ν)(λ|tn|)²`
    pub volumetric: f64,
}

impl EnergyTerms {
    const UNDEFINED: EnergyTerms = EnergyTerms {
        ruptured_fraction: f64::NAN,
        distortional: f64::NAN,
        volumetric: f64::NAN,
    };
}

/// Evaluate the functional for one set of parameters
fn point_energy(
    compiled: &CompiledStress,
    rotation: &Mat3,
    params: &SweepParameters,
    geometry: &FaultGeometry,
) -> Result<EnergyTerms, StressError> {
    let max_area = geometry.max_area();
    if max_area <= 0.0 {
        return Ok(EnergyTerms::UNDEFINED);
    }

    let stress = compiled.tensor_at(&REFERENCE_POINT, params.ratio, rotation)?;
    let mut terms = EnergyTerms::default();
    for (normal, area) in geometry.faces() {
        let (tn, ts) = normal_and_shear(&stress, normal);
        let ttn = norm(&tn);
        let tts = norm(&ts);
        let threshold =
            (ttn - params.pressure) * params.friction * (1.0 - params.lambda) + params.cohesion;
        if tts > threshold {
            let weight = area / max_area;
            terms.ruptured_fraction += weight;
            terms.distortional += (1.0 + params.poisson) * (tts - threshold).powi(2) * weight;
            terms.volumetric +=
                (1.0 - 2.0 * params.poisson) * (params.lambda * ttn).powi(2) * weight;
        }
    }
    Ok(terms)
}

/// Grid position of `flat` for an `n`-per-axis row-major grid
fn grid_position(flat: usize, n: usize, dims: Dims) -> [usize; 3] {
    match dims {
        Dims::Two => [flat / n, flat % n, 0],
        Dims::Three => [flat / (n * n), (flat / n) % n, flat % n],
    }
}

/// The sweep engine
#[derive(Debug, Clone)]
pub struct RuptureEnvelope {
    axes: [Axis; 3],
    n: usize,
    params: SweepParameters,
    stress: StressField,
    geometry: FaultGeometry,
    square: Option<SweepGrid<f64>>,
    cube: Option<SweepGrid<f64>>,
}

impl Default for RuptureEnvelope {
    fn default() -> Self {
        let n = DEFAULT_SAMPLING;
        Self {
            axes: [
                Axis::preset(SweepParam::Ratio, n, 0.0, 3.0),
                Axis::preset(SweepParam::Theta, n, 0.0, 180.0),
                Axis::preset(SweepParam::Friction, n, 0.0, 1.0),
            ],
            n,
            params: SweepParameters::default(),
            stress: StressField::default(),
            geometry: FaultGeometry::default(),
            square: None,
            cube: None,
        }
    }
}

impl RuptureEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Scalars and formulas
    // =========================================================================

    pub fn set_param(&mut self, param: SweepParam, value: f64) {
        self.params.set(param, value);
        match param {
            SweepParam::Theta => self.stress.set_theta(value),
            SweepParam::Ratio => self.stress.set_ratio(value),
            _ => {}
        }
    }

    pub fn set_params(&mut self, params: SweepParameters) {
        self.params = params;
        self.stress.set_theta(params.theta);
        self.stress.set_ratio(params.ratio);
    }

    pub fn set_friction(&mut self, value: f64) {
        self.set_param(SweepParam::Friction, value);
    }

    pub fn set_cohesion(&mut self, value: f64) {
        self.set_param(SweepParam::Cohesion, value);
    }

    pub fn set_lambda(&mut self, value: f64) {
        self.set_param(SweepParam::Lambda, value);
    }

    pub fn set_pressure(&mut self, value: f64) {
        self.set_param(SweepParam::Pressure, value);
    }

    pub fn set_poisson(&mut self, value: f64) {
        self.set_param(SweepParam::Poisson, value);
    }

    pub fn set_theta(&mut self, degrees: f64) {
        self.set_param(SweepParam::Theta, degrees);
    }

    pub fn set_ratio(&mut self, value: f64) {
        self.set_param(SweepParam::Ratio, value);
    }

    pub fn set_sh_max(&mut self, formula: &str) {
        self.stress.set_formula(Component::MajorHorizontal, formula);
    }

    pub fn set_sh_min(&mut self, formula: &str) {
        self.stress.set_formula(Component::MinorHorizontal, formula);
    }

    pub fn set_sv(&mut self, formula: &str) {
        self.stress.set_formula(Component::Vertical, formula);
    }

    pub fn params(&self) -> &SweepParameters {
        &self.params
    }

    pub fn stress(&self) -> &StressField {
        &self.stress
    }

    /// Replace the functions, constants and operators visible to the formulas
    pub fn set_expr_config(&mut self, config: Arc<ExprConfig>) {
        self.stress = std::mem::take(&mut self.stress).with_config(config);
    }

    /// Compile the stress formulas now rather than at the first evaluation
    pub fn compile_stress(&mut self) -> Result<(), StressError> {
        self.stress.compile().map(|_| ())
    }

    // =========================================================================
    // Axes
    // =========================================================================

    /// Bind axis `letter` (`x`, `y` or `z`) to the parameter called `parameter`
    pub fn set_axis(
        &mut self,
        letter: &str,
        parameter: &str,
        min: f64,
        max: f64,
        reverse: bool,
    ) -> Result<(), ConfigError> {
        let letter: AxisLetter = letter.parse()?;
        let config = AxisConfig {
            parameter: parameter.parse()?,
            min,
            max,
            reverse,
        };
        self.configure_axis(letter, &config)
    }

    pub fn configure_axis(
        &mut self,
        letter: AxisLetter,
        config: &AxisConfig,
    ) -> Result<(), ConfigError> {
        let axis = Axis::from_config(config, self.n)?;
        tracing::debug!(axis = %letter, "bound to {}", axis.label());
        self.axes[letter.index()] = axis;
        Ok(())
    }

    /// Samples per axis, shared by all three
    pub fn set_sampling(&mut self, n: usize) -> Result<(), ConfigError> {
        for axis in &mut self.axes {
            axis.set_sampling(n)?;
        }
        self.n = n;
        Ok(())
    }

    pub fn sampling(&self) -> usize {
        self.n
    }

    pub fn axis(&self, letter: AxisLetter) -> &Axis {
        &self.axes[letter.index()]
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Append the facets of a triangulated fault; returns the number added
    pub fn add_fault(&mut self, positions: &[f64], indices: &[u32]) -> Result<usize, GeometryError> {
        let faces = faces_from_mesh(positions, indices)?;
        Ok(self.add_faces(faces))
    }

    /// Append precomputed facets
    pub fn add_faces(&mut self, faces: FaceSet) -> usize {
        let added = self.geometry.add(faces);
        tracing::debug!(
            added,
            total = self.geometry.len(),
            max_area = self.geometry.max_area(),
            "fault facets loaded"
        );
        added
    }

    /// Drop every loaded facet
    pub fn reset(&mut self) {
        self.geometry.reset();
    }

    pub fn geometry(&self) -> &FaultGeometry {
        &self.geometry
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Ruptured-area fraction for the current parameters; NaN with no facets
    pub fn energy(&mut self) -> Result<f64, SweepError> {
        Ok(self.energy_terms()?.ruptured_fraction)
    }

    pub fn energy_terms(&mut self) -> Result<EnergyTerms, SweepError> {
        if self.geometry.is_empty() {
            return Ok(EnergyTerms::UNDEFINED);
        }
        let rotation = *self.stress.rotation();
        let compiled = self.stress.compile()?;
        Ok(point_energy(
            compiled,
            &rotation,
            &self.params,
            &self.geometry,
        )?)
    }

    /// Prepare a run over `dims` axes; nothing is evaluated until
    /// [`Sweep::advance`] is called
    pub fn sweep(
        &mut self,
        dims: Dims,
        progress: &ProgressReporter,
    ) -> Result<Sweep<'_>, SweepError> {
        if self.geometry.is_empty() {
            return Err(ConfigError::EmptyGeometry.into());
        }
        let total = grid_points(dims, self.n)?;
        let compiled = self.stress.compile()?.clone();
        progress.reset(total);
        tracing::debug!(
            ?dims,
            n = self.n,
            total,
            faces = self.geometry.len(),
            "sweep started"
        );

        Ok(Sweep {
            grid: SweepGrid::new(vec![self.n; dims.count()], f64::NAN),
            envelope: self,
            progress: progress.clone(),
            compiled,
            dims,
            next: 0,
            status: None,
            failure: None,
        })
    }

    pub fn run_2d(&mut self, progress: &ProgressReporter) -> Result<SweepReport, SweepError> {
        self.run(Dims::Two, progress)
    }

    pub fn run_3d(&mut self, progress: &ProgressReporter) -> Result<SweepReport, SweepError> {
        self.run(Dims::Three, progress)
    }

    pub fn run(&mut self, dims: Dims, progress: &ProgressReporter) -> Result<SweepReport, SweepError> {
        let mut sweep = self.sweep(dims, progress)?;
        sweep.advance(usize::MAX)?;
        sweep.finish()
    }

    /// Evaluate all grid points on the rayon pool.
    ///
    /// Each point works on its own copy of the parameters, so the envelope's
    /// scalars are left as they were. Cancellation skips points that have not
    /// started yet.
    #[cfg(feature = "parallel")]
    pub fn run_parallel(
        &mut self,
        dims: Dims,
        progress: &ProgressReporter,
    ) -> Result<SweepReport, SweepError> {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use rayon::prelude::*;

        use crate::stress::azimuth_rotation;

        if self.geometry.is_empty() {
            return Err(ConfigError::EmptyGeometry.into());
        }
        let total = grid_points(dims, self.n)?;
        let compiled = self.stress.compile()?.clone();
        progress.reset(total);
        tracing::debug!(?dims, n = self.n, total, "parallel sweep started");

        let n = self.n;
        let base = self.params;
        let axes = &self.axes[..dims.count()];
        let geometry = &self.geometry;
        let evaluated = AtomicUsize::new(0);
        let mut grid = SweepGrid::new(vec![n; dims.count()], f64::NAN);

        grid.data_mut()
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(flat, slot)| -> Result<(), StressError> {
                if progress.is_cancelled() {
                    return Ok(());
                }
                let mut params = base;
                let position = grid_position(flat, n, dims);
                for (axis, &i) in axes.iter().zip(&position) {
                    axis.update(i, &mut params);
                }
                let rotation = azimuth_rotation(params.theta);
                *slot = point_energy(&compiled, &rotation, &params, geometry)?.ruptured_fraction;
                evaluated.fetch_add(1, Ordering::Relaxed);
                progress.tick(1);
                Ok(())
            })?;

        let completed = evaluated.into_inner();
        let status = if completed == total {
            RunStatus::Completed
        } else {
            RunStatus::Cancelled
        };
        Ok(self.store(dims, grid, status, completed))
    }

    fn store(
        &mut self,
        dims: Dims,
        grid: SweepGrid<f64>,
        status: RunStatus,
        completed: usize,
    ) -> SweepReport {
        let report = SweepReport {
            status,
            dims,
            completed,
            total: grid.len(),
            range: grid.min_max(),
        };
        match status {
            RunStatus::Completed => match report.range {
                Some((min, max)) => tracing::debug!(?dims, min, max, "sweep finished"),
                None => tracing::debug!(?dims, "sweep finished"),
            },
            RunStatus::Cancelled => tracing::warn!(
                ?dims,
                completed,
                total = report.total,
                "sweep cancelled, results are incomplete"
            ),
        }
        match dims {
            Dims::Two => self.square = Some(grid),
            Dims::Three => self.cube = Some(grid),
        }
        report
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Grid of the last 2D run, shape `[n, n]`
    pub fn square(&self) -> Option<&SweepGrid<f64>> {
        self.square.as_ref()
    }

    /// Grid of the last 3D run, shape `[n, n, n]`
    pub fn cube(&self) -> Option<&SweepGrid<f64>> {
        self.cube.as_ref()
    }

    pub fn take_square(&mut self) -> Option<SweepGrid<f64>> {
        self.square.take()
    }

    pub fn take_cube(&mut self) -> Option<SweepGrid<f64>> {
        self.cube.take()
    }
}

/// An in-progress run.
///
/// Grid points are visited x outermost, z innermost. An axis writes its
/// parameter when all inner indices are zero, so the parameters persist
/// between chunks exactly as in a single pass.
pub struct Sweep<'a> {
    envelope: &'a mut RuptureEnvelope,
    progress: ProgressReporter,
    compiled: CompiledStress,
    dims: Dims,
    grid: SweepGrid<f64>,
    next: usize,
    status: Option<RunStatus>,
    /// Set once a point fails to evaluate; the run cannot continue
    failure: Option<StressError>,
}

impl Sweep<'_> {
    /// Evaluate up to `chunk` more grid points.
    ///
    /// Cancellation is checked before every point. An evaluation error stops
    /// the run for good: later calls return the same error and [`Sweep::finish`]
    /// discards the partial grid.
    pub fn advance(&mut self, chunk: usize) -> Result<SweepStatus, SweepError> {
        if let Some(e) = &self.failure {
            return Err(e.clone().into());
        }
        if let Some(status) = self.status {
            return Ok(SweepStatus::Finished(status));
        }

        let total = self.grid.len();
        let end = self.next.saturating_add(chunk).min(total);
        while self.next < end {
            if self.progress.is_cancelled() {
                self.status = Some(RunStatus::Cancelled);
                return Ok(SweepStatus::Finished(RunStatus::Cancelled));
            }
            let flat = self.next;
            self.bind_axes(flat);

            let envelope = &*self.envelope;
            let terms = point_energy(
                &self.compiled,
                envelope.stress.rotation(),
                &envelope.params,
                &envelope.geometry,
            );
            let value = match terms {
                Ok(terms) => terms.ruptured_fraction,
                Err(e) => {
                    self.failure = Some(e.clone());
                    return Err(e.into());
                }
            };
            self.grid.data_mut()[flat] = value;
            self.next += 1;
            self.progress.tick(1);
        }

        if self.next == total {
            self.status = Some(RunStatus::Completed);
            return Ok(SweepStatus::Finished(RunStatus::Completed));
        }
        Ok(SweepStatus::Running)
    }

    fn bind_axes(&mut self, flat: usize) {
        let d = self.dims.count();
        let position = grid_position(flat, self.envelope.n, self.dims);
        for level in 0..d {
            if position[level + 1..d].iter().all(|&i| i == 0) {
                let axis = self.envelope.axes[level];
                let param = axis.param();
                axis.update(position[level], &mut self.envelope.params);
                match param {
                    SweepParam::Theta => self.envelope.stress.set_theta(self.envelope.params.theta),
                    SweepParam::Ratio => self.envelope.stress.set_ratio(self.envelope.params.ratio),
                    _ => {}
                }
            }
        }
    }

    pub fn completed(&self) -> usize {
        self.next
    }

    pub fn total(&self) -> usize {
        self.grid.len()
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Store the grid on the envelope. A run stopped before reaching the end
    /// is reported as cancelled. A failed run stores nothing and returns its
    /// evaluation error.
    pub fn finish(self) -> Result<SweepReport, SweepError> {
        if let Some(e) = self.failure {
            tracing::warn!(completed = self.next, "sweep failed, partial grid discarded");
            return Err(e.into());
        }
        let status = self.status.unwrap_or(RunStatus::Cancelled);
        Ok(self.envelope.store(self.dims, self.grid, status, self.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_fault() -> RuptureEnvelope {
        let mut envelope = RuptureEnvelope::new();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        envelope.add_faces(FaceSet::new(vec![[s, 0.0, s]], vec![1.0]).unwrap());
        envelope.set_sh_max("2");
        envelope.set_sh_min("1");
        envelope.set_sv("3");
        envelope
    }

    #[test]
    fn test_energy_without_geometry_is_nan() {
        let mut envelope = RuptureEnvelope::new();
        assert!(envelope.energy().unwrap().is_nan());
    }

    #[test]
    fn test_energy_threshold() {
        // |ts| = 1 and |tn| = 2 on this facet
        let mut envelope = flat_fault();
        envelope.set_friction(0.4);
        envelope.set_cohesion(0.1);
        assert_eq!(envelope.energy().unwrap(), 1.0);

        envelope.set_cohesion(0.3);
        assert_eq!(envelope.energy().unwrap(), 0.0);
    }

    #[test]
    fn test_energy_terms() {
        let mut envelope = flat_fault();
        envelope.set_friction(0.25);
        envelope.set_lambda(0.5);
        envelope.set_poisson(0.25);
        // C = 2 * 0.25 * 0.5 = 0.25
        let terms = envelope.energy_terms().unwrap();
        assert_eq!(terms.ruptured_fraction, 1.0);
        assert!((terms.distortional - 1.25 * 0.75f64.powi(2)).abs() < 1e-12);
        assert!((terms.volumetric - 0.5 * 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_chunked_matches_single_pass() {
        let progress = ProgressReporter::new();
        let mut a = flat_fault();
        a.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
        a.set_axis("y", "theta", 0.0, 90.0, true).unwrap();
        a.set_sampling(6).unwrap();
        let mut b = a.clone();

        a.run_2d(&progress).unwrap();

        let mut sweep = b.sweep(Dims::Two, &progress).unwrap();
        let mut chunks = 0;
        while sweep.advance(7).unwrap() == SweepStatus::Running {
            chunks += 1;
        }
        let report = sweep.finish().unwrap();
        assert!(report.is_complete());
        assert_eq!(chunks, 5);
        assert_eq!(a.square(), b.square());
    }

    #[test]
    fn test_early_finish_reports_cancelled() {
        let mut envelope = flat_fault();
        let progress = ProgressReporter::new();
        let mut sweep = envelope.sweep(Dims::Two, &progress).unwrap();
        sweep.advance(3).unwrap();
        let report = sweep.finish().unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.completed, 3);
        assert_eq!(envelope.square().unwrap().written(), 3);
    }

    #[test]
    fn test_failed_point_is_not_a_cancellation() {
        let mut envelope = flat_fault();
        // Sweep scalars are not visible to the stress formulas
        envelope.set_sv("1 / friction");
        envelope.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
        envelope.set_sampling(4).unwrap();
        let progress = ProgressReporter::new();

        let mut sweep = envelope.sweep(Dims::Two, &progress).unwrap();
        let first = sweep.advance(10).unwrap_err();
        assert!(matches!(first, SweepError::Stress(_)), "{first:?}");
        assert!(sweep.has_failed());
        assert_eq!(sweep.completed(), 0);

        // The cursor does not retry the failing point
        assert_eq!(sweep.advance(10).unwrap_err(), first);
        assert_eq!(sweep.finish().unwrap_err(), first);
        assert!(envelope.square().is_none());
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let mut envelope = flat_fault();
        envelope.set_sampling(usize::MAX / 2).unwrap();
        let progress = ProgressReporter::new();
        assert_eq!(
            envelope.sweep(Dims::Two, &progress).err(),
            Some(SweepError::Config(ConfigError::GridTooLarge { n: usize::MAX / 2, dims: 2 }))
        );
        #[cfg(feature = "parallel")]
        assert!(matches!(
            envelope.run_parallel(Dims::Three, &progress),
            Err(SweepError::Config(ConfigError::GridTooLarge { dims: 3, .. }))
        ));

        assert_eq!(Dims::Two.points(1 << 20), Some(1 << 40));
        assert_eq!(Dims::Three.points(1 << 22), None);
    }

    #[test]
    fn test_grid_position() {
        assert_eq!(grid_position(7, 3, Dims::Two), [2, 1, 0]);
        assert_eq!(grid_position(23, 3, Dims::Three), [2, 1, 2]);
    }
}

//! Tests for grid sweeps
//!
//! These tests verify that:
//! - A 2D sweep on a single inclined facet matches the Mohr–Coulomb threshold
//!   evaluated by hand
//! - The functional is non-negative, bounded, and zero when nothing ruptures
//! - Cancellation stops the run early without touching the rest of the grid
//! - Axis configuration errors surface before any sweep starts

use std::f64::consts::FRAC_1_SQRT_2;

use crate::envelope::{Dims, RunStatus, RuptureEnvelope};
use crate::error::{ConfigError, SweepError};
use crate::geometry::{FaceSet, rectangle};
use crate::progress::ProgressReporter;

/// One facet dipping 45° (|tn| = 2, |ts| = 1 under diag(1, 2, 3)) plus a
/// horizontal facet twice as large that carries no shear
fn inclined_fault() -> RuptureEnvelope {
    let mut envelope = RuptureEnvelope::new();
    envelope.add_faces(
        FaceSet::new(
            vec![[FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2], [0.0, 0.0, 1.0]],
            vec![1.0, 2.0],
        )
        .unwrap(),
    );
    envelope.set_sh_max("2");
    envelope.set_sh_min("1");
    envelope.set_sv("3");
    envelope.set_theta(0.0);
    envelope
}

#[test]
fn test_hand_computed_friction_cohesion_grid() {
    let mut envelope = inclined_fault();
    envelope.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
    envelope.set_axis("y", "cohesion", 0.05, 0.85, false).unwrap();
    envelope.set_sampling(5).unwrap();

    let report = envelope.run_2d(&ProgressReporter::new()).unwrap();
    assert!(report.is_complete());
    assert_eq!((report.completed, report.total), (25, 25));
    assert_eq!(report.range, Some((0.0, 0.5)));

    // rupture iff 1 > 2μ + Co; the facet weighs 1 / 2 of the largest area
    #[rustfmt::skip]
    let expected = [
        0.5, 0.5, 0.5, 0.5, 0.5,
        0.5, 0.5, 0.5, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0,
    ];
    let grid = envelope.square().unwrap();
    assert_eq!((grid.dim_x(), grid.dim_y(), grid.dim_z()), (5, 5, 0));
    assert_eq!(grid.data(), &expected);

    // non-increasing in both friction and cohesion
    for i in 0..5 {
        for j in 1..5 {
            assert!(grid.get(&[i, j]) <= grid.get(&[i, j - 1]));
            assert!(grid.get(&[j, i]) <= grid.get(&[j - 1, i]));
        }
    }
}

#[test]
fn test_no_rupture_when_cohesion_dominates() {
    let mut envelope = inclined_fault();
    envelope.set_cohesion(10.0);
    envelope.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
    envelope.set_axis("y", "lambda", 0.0, 1.0, false).unwrap();
    envelope.set_sampling(4).unwrap();

    let report = envelope.run_2d(&ProgressReporter::new()).unwrap();
    assert_eq!(report.range, Some((0.0, 0.0)));
}

#[test]
fn test_functional_is_bounded() {
    let mut envelope = RuptureEnvelope::new();
    for (dip, strike) in [(30.0, 0.0), (60.0, 45.0), (80.0, 120.0)] {
        let mesh = rectangle(4.0, 2.0, 4, 2).tilted(dip, strike);
        envelope.add_fault(&mesh.positions, &mesh.indices).unwrap();
    }
    envelope.set_sh_max("1 + R");
    envelope.set_sh_min("0.5");
    envelope.set_sv("1");
    envelope.set_axis("x", "R", 0.0, 3.0, false).unwrap();
    envelope.set_axis("y", "theta", 0.0, 180.0, false).unwrap();
    envelope.set_axis("z", "friction", 0.0, 1.0, true).unwrap();
    envelope.set_sampling(6).unwrap();

    let report = envelope.run_3d(&ProgressReporter::new()).unwrap();
    assert!(report.is_complete());
    let cube = envelope.cube().unwrap();
    assert_eq!(cube.shape(), &[6, 6, 6]);

    // weights are area / max_area, so the sum is bounded by total / max
    let geometry = envelope.geometry();
    let bound = geometry.total_area() / geometry.max_area();
    let (min, max) = report.range.unwrap();
    assert!(min >= 0.0);
    assert!(max <= bound + 1e-9);
    assert!(cube.data().iter().all(|v| v.is_finite()));
}

#[test]
fn test_cancel_after_ten_percent() {
    let progress = ProgressReporter::new();
    let handle = progress.cancel_handle();
    let progress = progress.with_observer(move |current| {
        if current >= 10 {
            handle.cancel();
        }
    });

    let mut envelope = inclined_fault();
    envelope.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
    envelope.set_axis("y", "cohesion", 0.0, 1.0, false).unwrap();

    let report = envelope.run_2d(&progress).unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.total, 100);
    assert_eq!(report.completed, 10);
    assert_eq!(progress.current(), 10);

    let grid = envelope.square().unwrap();
    assert_eq!(grid.len(), 100);
    assert!(grid.data()[..10].iter().all(|v| !v.is_nan()));
    assert!(grid.data()[10..].iter().all(|v| v.is_nan()));
}

#[test]
fn test_empty_geometry_fails_before_running() {
    let mut envelope = RuptureEnvelope::new();
    let progress = ProgressReporter::new();
    assert_eq!(
        envelope.run_2d(&progress).unwrap_err(),
        SweepError::Config(ConfigError::EmptyGeometry)
    );
    assert!(envelope.square().is_none());
    assert_eq!(progress.total(), 0);
}

#[test]
fn test_axis_configuration_errors() {
    let mut envelope = RuptureEnvelope::new();
    assert_eq!(
        envelope.set_axis("w", "friction", 0.0, 1.0, false),
        Err(ConfigError::UnknownAxis("w".to_string()))
    );
    assert_eq!(
        envelope.set_axis("x", "viscosity", 0.0, 1.0, false),
        Err(ConfigError::UnknownParameter("viscosity".to_string()))
    );
    assert_eq!(
        envelope.set_sampling(1),
        Err(ConfigError::InvalidSampling(1))
    );
    assert_eq!(envelope.sampling(), 10);
}

#[test]
fn test_take_moves_result_out() {
    let mut envelope = inclined_fault();
    envelope.set_sampling(3).unwrap();
    envelope.run_2d(&ProgressReporter::new()).unwrap();
    let grid = envelope.take_square().unwrap();
    assert_eq!(grid.len(), 9);
    assert!(envelope.square().is_none());
}

#[test]
fn test_reset_clears_geometry() {
    let mut envelope = inclined_fault();
    envelope.reset();
    assert!(envelope.geometry().is_empty());
    assert!(envelope.energy().unwrap().is_nan());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let mut sequential = inclined_fault();
    sequential.set_axis("x", "friction", 0.0, 1.0, false).unwrap();
    sequential.set_axis("y", "theta", 0.0, 180.0, false).unwrap();
    sequential.set_axis("z", "cohesion", 0.0, 0.5, false).unwrap();
    sequential.set_sampling(7).unwrap();
    let mut parallel = sequential.clone();

    let progress = ProgressReporter::new();
    sequential.run(Dims::Three, &progress).unwrap();
    let report = parallel.run_parallel(Dims::Three, &progress).unwrap();

    assert!(report.is_complete());
    assert_eq!(progress.current(), 343);
    assert_eq!(sequential.cube(), parallel.cube());
}

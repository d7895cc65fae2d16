//! Plain-text rendering of sweep grids.

use std::fmt::Write;

use rupture_core::{Axis, RunStatus, SweepGrid, SweepReport};

/// Table of a 2D grid: one row per x sample, one column per y sample
pub fn render_square(grid: &SweepGrid<f64>, x: &Axis, y: &Axis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "rows: {}", x.label());
    let _ = writeln!(out, "cols: {}", y.label());
    write_table(&mut out, grid.data(), x, y);
    out
}

/// One table per z sample
pub fn render_cube(grid: &SweepGrid<f64>, x: &Axis, y: &Axis, z: &Axis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "rows: {}", x.label());
    let _ = writeln!(out, "cols: {}", y.label());
    for k in 0..grid.dim_z() {
        let Some(slice) = grid.slice_2d(k) else {
            break;
        };
        let _ = writeln!(out, "\n{} = {}", z.param(), format_value(z.value(k)));
        write_table(&mut out, &slice, x, y);
    }
    out
}

fn write_table(out: &mut String, values: &[f64], x: &Axis, y: &Axis) {
    let cols = y.sampling();
    let _ = write!(out, "{:>10}", "");
    for v in y.values() {
        let _ = write!(out, " {:>8}", format_value(v));
    }
    out.push('\n');

    for (i, row) in values.chunks(cols).enumerate() {
        let _ = write!(out, "{:>10}", format_value(x.value(i)));
        for v in row {
            let cell = if v.is_nan() {
                "-".to_string()
            } else {
                format!("{v:.4}")
            };
            let _ = write!(out, " {cell:>8}");
        }
        out.push('\n');
    }
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e6 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

/// One-line outcome summary
pub fn summary(report: &SweepReport) -> String {
    let status = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled",
    };
    let range = match report.range {
        Some((min, max)) => format!("min {min:.4}, max {max:.4}"),
        None => "no values".to_string(),
    };
    format!(
        "{status}: {}/{} points, {range}",
        report.completed, report.total
    )
}

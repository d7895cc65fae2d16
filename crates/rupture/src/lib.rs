//! Command-line host for rupture_core.
//!
//! Loads a YAML run description, runs the sweep on a background worker with
//! progress reporting and an optional timeout, and prints the resulting grid.

pub mod config;
pub mod logging;
pub mod report;
pub mod worker;

pub use config::{FaultConfig, RunConfig};
pub use logging::init_logging;
pub use worker::{SweepRequest, SweepResponse, SweepWorker};

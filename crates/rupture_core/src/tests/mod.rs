//! Integration tests for the rupture engine
//!
//! Tests are organized by topic:
//! - `expression` - Formula parsing, precedence and evaluation
//! - `stress` - Stress field assembly, rotation and lazy recompilation
//! - `sweep` - Grid sweeps, hand-checked envelopes and cancellation

mod sweep;

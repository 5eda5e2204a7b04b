//! The two-process capture pipeline: transport client piping into the viewer.

pub mod leg;
pub mod process_pipeline;

pub use leg::{Leg, LegRole};
pub use process_pipeline::{Pipeline, REAP_GRACE};

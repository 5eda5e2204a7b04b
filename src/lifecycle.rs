//! Session lifecycle: run modes, signal routing and pipeline supervision.

pub mod signals;
pub mod supervisor;
pub mod types;

pub use signals::{SignalRouter, TerminationSignal};
pub use supervisor::LifecycleController;
pub use types::{Completion, DrainReason, LifecycleState, RunMode, SessionOutcome};

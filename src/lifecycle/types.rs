use super::signals::TerminationSignal;
use crate::configuration::Config;
use crate::error_handling::types::EXIT_FAILURE;
use crate::pipeline::Pipeline;
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

/// Interval at which an unbounded session checks whether a leg has exited.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long the controller stays in charge of a running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Supervise until the viewer exits or the limit elapses, whichever is first.
    Bounded(Duration),
    /// Supervise until either leg exits or a signal arrives.
    Unbounded { poll_interval: Duration },
}

impl RunMode {
    /// A timeout bounds the session; a packet count alone does not, since the
    /// remote capture tool stops by itself once the count is reached.
    pub fn from_config(config: &Config) -> Self {
        match config.timeout_secs {
            Some(secs) => RunMode::Bounded(Duration::from_secs(secs)),
            None => RunMode::Unbounded {
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Spawning,
    Running,
    Draining,
    Terminated,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Spawning, Running)
                | (Spawning, Terminated)
                | (Running, Draining)
                | (Running, Terminated)
                | (Draining, Terminated)
        )
    }
}

/// Why a session stopped supervising its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainReason {
    SinkExited(ExitStatus),
    SourceExited(ExitStatus),
    Signal(TerminationSignal),
    WaitFailed(String),
}

impl DrainReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            // closing the viewer is how the operator ends a session
            DrainReason::SinkExited(_) => 0,
            DrainReason::SourceExited(status) if status.success() => 0,
            DrainReason::SourceExited(_) => EXIT_FAILURE,
            DrainReason::Signal(signal) if signal.is_operator_request() => 0,
            DrainReason::Signal(_) => EXIT_FAILURE,
            DrainReason::WaitFailed(_) => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for DrainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainReason::SinkExited(status) => write!(f, "viewer exited with {}", status),
            DrainReason::SourceExited(status) => write!(f, "transport exited with {}", status),
            DrainReason::Signal(signal) => write!(f, "received {}", signal.name()),
            DrainReason::WaitFailed(e) => write!(f, "lost track of the pipeline: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The bounded run limit elapsed; the pipeline was left running.
    TimeoutReached,
    Drained(DrainReason),
}

/// Result of a supervised session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub exit_code: i32,
    pub completion: Completion,
    pub elapsed: chrono::Duration,
    /// Human-readable cause of a failed session, with the transport's last
    /// stderr lines.
    pub failure: Option<String>,
    /// Pipeline handed back un-torn-down when the run limit elapsed.
    pub detached: Option<Pipeline>,
}

//! Command builder.
//!
//! Turns a validated [`Config`](crate::configuration::Config) into the two
//! artifacts a session needs: the command line executed on the remote host and
//! the argument list of the local viewer.

pub mod remote;
pub mod viewer;

use crate::configuration::Config;

pub use remote::{list_interfaces_command, remote_command, CAPTURE_TOOL};
pub use viewer::viewer_args;

/// Everything needed to start the capture pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    pub remote: String,
    pub viewer_args: Vec<String>,
}

impl CaptureCommand {
    pub fn build(config: &Config) -> Self {
        Self {
            remote: remote_command(config),
            viewer_args: viewer_args(config),
        }
    }
}

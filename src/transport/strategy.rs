use crate::configuration::TransportKind;
use std::path::Path;
use tokio::process::Command;

/// How one remote shell client family is invoked.
///
/// Implementations only assemble [`Command`]s; callers decide how the standard
/// streams are wired and own the resulting processes.
pub trait TransportStrategy: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Path of the client binary.
    fn client(&self) -> &Path;

    /// Whether host trust must be established by a separate handshake before the
    /// capture session starts.
    fn requires_preflight(&self) -> bool;

    /// Invocation running `remote_command` without ever prompting the operator.
    fn batch_command(&self, remote_command: &str) -> Command;

    /// Invocation running `remote_command` that may read a prompt answer from stdin.
    fn interactive_command(&self, remote_command: &str) -> Command;

    /// Arguments making the client print its version and exit.
    fn version_args(&self) -> &'static [&'static str] {
        &["-V"]
    }
}

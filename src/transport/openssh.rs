use super::strategy::TransportStrategy;
use crate::configuration::{Config, TransportKind};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// OpenSSH client used on Linux and macOS.
///
/// Unknown host keys are accepted and cached by `ssh` itself on first contact
/// (`StrictHostKeyChecking=accept-new`), so no separate pre-flight is needed.
/// Batch invocations never prompt: the session runs outside the terminal's
/// foreground process group and a password prompt would stall it.
#[derive(Debug, Clone)]
pub struct OpenSshTransport {
    client: PathBuf,
    login: String,
    port: Option<u16>,
    compress: bool,
}

impl OpenSshTransport {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: config.transport_path.clone(),
            login: config.login(),
            port: config.port,
            compress: config.compress,
        }
    }

    fn command(&self, batch: bool, remote_command: &str) -> Command {
        let mut cmd = Command::new(&self.client);
        if batch {
            cmd.arg("-o").arg("BatchMode=yes");
        }
        cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if self.compress {
            cmd.arg("-C");
        }
        cmd.arg(&self.login).arg(remote_command);
        cmd
    }
}

impl TransportStrategy for OpenSshTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ssh
    }

    fn client(&self) -> &Path {
        &self.client
    }

    fn requires_preflight(&self) -> bool {
        false
    }

    fn batch_command(&self, remote_command: &str) -> Command {
        self.command(true, remote_command)
    }

    fn interactive_command(&self, remote_command: &str) -> Command {
        self.command(false, remote_command)
    }
}

use super::strategy::TransportStrategy;
use crate::configuration::{Config, TransportKind};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// PuTTY `plink`, the client used on Windows.
///
/// In batch mode plink refuses hosts whose key is not cached, so the trust
/// handshake has to run before the capture session.
#[derive(Debug, Clone)]
pub struct PlinkTransport {
    client: PathBuf,
    login: String,
    port: Option<u16>,
    compress: bool,
}

impl PlinkTransport {
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
            cmd.arg("-batch");
        }
        cmd.arg("-ssh");
        if let Some(port) = self.port {
            cmd.arg("-P").arg(port.to_string());
        }
        if self.compress {
            cmd.arg("-C");
        }
        cmd.arg(&self.login).arg(remote_command);
        cmd
    }
}

impl TransportStrategy for PlinkTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Plink
    }

    fn client(&self) -> &Path {
        &self.client
    }

    fn requires_preflight(&self) -> bool {
        true
    }

    fn batch_command(&self, remote_command: &str) -> Command {
        self.command(true, remote_command)
    }

    fn interactive_command(&self, remote_command: &str) -> Command {
        self.command(false, remote_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn plink_config() -> Config {
        Config {
            transport: TransportKind::Plink,
            transport_path: PathBuf::from("plink.exe"),
            ..Config::for_tests()
        }
    }

    #[test]
    fn batch_mode_is_explicit() {
        let transport = PlinkTransport::from_config(&plink_config());
        assert_eq!(
            args_of(&transport.batch_command("echo ok")),
            vec!["-batch", "-ssh", "root@192.0.2.10", "echo ok"]
        );
        assert_eq!(
            args_of(&transport.interactive_command("echo ok")),
            vec!["-ssh", "root@192.0.2.10", "echo ok"]
        );
    }

    #[test]
    fn uses_uppercase_port_flag() {
        let transport = PlinkTransport::from_config(&Config {
            port: Some(2200),
            compress: true,
            ..plink_config()
        });
        assert_eq!(
            args_of(&transport.batch_command("x")),
            vec!["-batch", "-ssh", "-P", "2200", "-C", "root@192.0.2.10", "x"]
        );
    }
}

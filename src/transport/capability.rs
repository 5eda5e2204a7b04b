//! Checks that the external programs of a session can actually be run.

use crate::error_handling::types::TransportError;
use log::{debug, trace};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Version probe arguments understood by Wireshark.
pub const VIEWER_VERSION_ARGS: [&str; 1] = ["-v"];

/// Runs `program` with `version_args` and returns the first line it printed.
///
/// A program that cannot be spawned is reported as [`TransportError::NotFound`];
/// one that exits unsuccessfully as [`TransportError::NotFunctional`].
pub async fn probe(
    role: &str,
    program: &Path,
    version_args: &[&str],
) -> Result<String, TransportError> {
    trace!("Probing {} at {}", role, program.display());

    let output = Command::new(program)
        .args(version_args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                TransportError::NotFound(format!("{} ({})", role, program.display()))
            }
            _ => TransportError::NotFunctional(format!(
                "{} ({}): {}",
                role,
                program.display(),
                e
            )),
        })?;

    if !output.status.success() {
        debug!("Unable to detect {}: {}", role, output.status);
        return Err(TransportError::NotFunctional(format!(
            "{} ({}) exited with {}",
            role,
            program.display(),
            output.status
        )));
    }

    // ssh reports its version on stderr
    let version = [&output.stdout, &output.stderr]
        .iter()
        .map(|stream| String::from_utf8_lossy(stream))
        .filter_map(|text| text.lines().next().map(|l| l.trim().to_string()))
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    debug!("Detected {} version {}", role, version);
    Ok(version)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testsupport::write_script;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn reports_version_from_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let client = write_script(dir.path(), "ssh", "echo 'OpenSSH_9.6p1, OpenSSL 3.0.13' >&2");

        let version = probe("ssh", &client, &["-V"]).await.unwrap();
        assert_eq!(version, "OpenSSH_9.6p1, OpenSSL 3.0.13");
    }

    #[tokio::test]
    #[serial]
    async fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        match probe("wireshark", &dir.path().join("absent"), &["-v"]).await {
            Err(TransportError::NotFound(msg)) => assert!(msg.contains("wireshark")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn failing_program_is_not_functional() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = write_script(dir.path(), "wireshark", "exit 3");

        assert!(matches!(
            probe("wireshark", &viewer, &VIEWER_VERSION_ARGS).await,
            Err(TransportError::NotFunctional(_))
        ));
    }
}

use super::leg::{Leg, LegRole};
use crate::capture_command::CaptureCommand;
use crate::error_handling::types::PipelineError;
use crate::transport::TransportStrategy;
use log::{debug, error, trace, warn};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

/// How long teardown waits for a signalled process before giving up on it.
pub const REAP_GRACE: Duration = Duration::from_secs(2);

/// Debug level from which child diagnostics are forwarded to the log.
const FORWARD_STDERR_LEVEL: u8 = 2;

/// Transport stderr lines kept for the failure report.
pub const STDERR_TAIL_LINES: usize = 5;

/// How long a failure report waits for the transport stderr to reach EOF.
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Transport process whose stdout has not been handed to a viewer yet.
#[derive(Debug)]
pub(crate) struct PendingSource {
    leg: Leg,
    stdout: Option<ChildStdout>,
    stderr_tail: Option<JoinHandle<Vec<String>>>,
}

impl PendingSource {
    pub(crate) fn leg(&self) -> &Leg {
        &self.leg
    }
}

/// Transport client and viewer joined by a pipe.
///
/// Both processes run in their own process group, so a Ctrl+C typed in the
/// terminal only reaches `remoteshark`, which then decides what to stop.
#[derive(Debug)]
pub struct Pipeline {
    source: Leg,
    sink: Leg,
    stderr_tail: Option<JoinHandle<Vec<String>>>,
    torn_down: bool,
}

impl Pipeline {
    /// Spawns the transport running `command.remote`, then the viewer reading
    /// its stdout.
    ///
    /// If the viewer cannot be spawned the transport is killed and reaped before
    /// the error is returned, so a failed start leaves no process behind.
    pub async fn start(
        transport: &dyn TransportStrategy,
        command: &CaptureCommand,
        viewer: &Path,
        debug_level: u8,
    ) -> Result<Self, PipelineError> {
        let source = spawn_source(transport, &command.remote)?;
        Self::attach_sink(source, command, viewer, debug_level).await
    }

    pub(crate) async fn attach_sink(
        source: PendingSource,
        command: &CaptureCommand,
        viewer: &Path,
        debug_level: u8,
    ) -> Result<Self, PipelineError> {
        let PendingSource {
            leg: mut source,
            stdout,
            stderr_tail,
        } = source;

        let stdin = match stdout.map(|out| -> io::Result<Stdio> { out.try_into() }) {
            Some(Ok(stdio)) => stdio,
            Some(Err(e)) => {
                abandon(&mut source).await;
                return Err(PipelineError::IoError(e));
            }
            None => {
                abandon(&mut source).await;
                return Err(PipelineError::StreamUnavailable);
            }
        };

        let mut sink_cmd = Command::new(viewer);
        sink_cmd
            .args(&command.viewer_args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(diagnostics(debug_level));
        detach(&mut sink_cmd);

        debug!(
            "Spawning {} {}",
            viewer.display(),
            command.viewer_args.join(" ")
        );
        let spawned = sink_cmd.spawn();
        // releases our copy of the pipe's read end
        drop(sink_cmd);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn {}: {}", viewer.display(), e);
                abandon(&mut source).await;
                return Err(PipelineError::SinkSpawnFailed(e));
            }
        };
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(LegRole::Sink, stderr, 0);
        }

        Ok(Self {
            source,
            sink: Leg::new(LegRole::Sink, child),
            stderr_tail,
            torn_down: false,
        })
    }

    pub fn source(&self) -> &Leg {
        &self.source
    }

    pub fn sink(&self) -> &Leg {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut Leg {
        &mut self.sink
    }

    /// Returns the first leg found to have exited, sink first.
    pub fn poll_exits(&mut self) -> io::Result<Option<(LegRole, ExitStatus)>> {
        if let Some(status) = self.sink.poll_exit()? {
            return Ok(Some((LegRole::Sink, status)));
        }
        if let Some(status) = self.source.poll_exit()? {
            return Ok(Some((LegRole::Source, status)));
        }
        Ok(None)
    }

    /// Last lines the transport wrote to stderr.
    ///
    /// Waits briefly for the stream to close, so call it once the transport
    /// has exited or been torn down. Only the first call returns the lines.
    pub async fn source_diagnostics(&mut self) -> Vec<String> {
        match self.stderr_tail.take() {
            Some(handle) => match tokio::time::timeout(STDERR_DRAIN_GRACE, handle).await {
                Ok(Ok(lines)) => lines,
                Ok(Err(e)) => {
                    debug!("stderr monitoring for transport failed: {}", e);
                    Vec::new()
                }
                Err(_) => {
                    debug!("transport stderr still open");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Stops the transport and, when `stop_viewer` is set, the viewer.
    ///
    /// Best effort and idempotent: failures are logged, and calls after the
    /// first one return immediately.
    pub async fn teardown(&mut self, stop_viewer: bool) {
        if self.torn_down {
            trace!("Pipeline already torn down");
            return;
        }
        self.torn_down = true;

        let mut legs = vec![&mut self.source];
        if stop_viewer {
            legs.push(&mut self.sink);
        } else {
            debug!("Leaving the viewer running");
        }

        for leg in legs {
            if let Err(e) = leg.terminate() {
                warn!("Failed to terminate {}: {}", leg.role(), e);
                continue;
            }
            leg.reap(REAP_GRACE).await;
        }
    }
}

/// Spawns the transport with its stdout piped and its stderr monitored.
pub(crate) fn spawn_source(
    transport: &dyn TransportStrategy,
    remote_command: &str,
) -> Result<PendingSource, PipelineError> {
    let mut source_cmd = transport.batch_command(remote_command);
    // stderr is always read: forwarded at high debug levels, kept for failure reports
    source_cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    detach(&mut source_cmd);

    debug!(
        "Spawning {} {}",
        transport.client().display(),
        remote_command
    );
    let mut child = source_cmd.spawn().map_err(|e| {
        error!("Failed to spawn {}: {}", transport.client().display(), e);
        PipelineError::SourceSpawnFailed(e)
    })?;

    let stderr_tail = child
        .stderr
        .take()
        .map(|stderr| forward_stderr(LegRole::Source, stderr, STDERR_TAIL_LINES));
    let stdout = child.stdout.take();

    Ok(PendingSource {
        leg: Leg::new(LegRole::Source, child),
        stdout,
        stderr_tail,
    })
}

fn diagnostics(debug_level: u8) -> Stdio {
    if debug_level >= FORWARD_STDERR_LEVEL {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

/// Reads `stderr` to EOF, logging each line at debug level and keeping the
/// last `keep` of them.
fn forward_stderr(role: LegRole, stderr: ChildStderr, keep: usize) -> JoinHandle<Vec<String>> {
    let mut reader = BufReader::new(stderr).lines();
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(keep);
        while let Ok(Some(line)) = reader.next_line().await {
            debug!("[{}][stderr] {}", role, line);
            if keep > 0 {
                if tail.len() == keep {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        trace!("stderr monitoring ended for {}", role);
        tail.into_iter().collect()
    })
}

async fn abandon(source: &mut Leg) {
    if let Err(e) = source.kill().await {
        warn!("Failed to stop {}: {}", source.role(), e);
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::configuration::{Config, TransportKind};
    use crate::testsupport::{process_alive, write_script, RUN_LAST_ARG};
    use crate::transport;
    use serial_test::serial;
    use std::path::PathBuf;

    fn transport_at(path: PathBuf) -> Box<dyn TransportStrategy> {
        transport::select(&Config {
            transport: TransportKind::Ssh,
            transport_path: path,
            ..Config::for_tests()
        })
    }

    fn command(remote: &str) -> CaptureCommand {
        CaptureCommand {
            remote: remote.to_string(),
            viewer_args: vec!["-k".to_string(), "-i".to_string(), "-".to_string()],
        }
    }

    #[tokio::test]
    #[serial]
    async fn capture_bytes_reach_the_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("received");
        let ssh = write_script(dir.path(), "ssh", RUN_LAST_ARG);
        let viewer = write_script(
            dir.path(),
            "wireshark",
            &format!("cat > '{}'", out.display()),
        );

        let mut pipeline = Pipeline::start(
            transport_at(ssh).as_ref(),
            &command("printf 'pcap-bytes'"),
            &viewer,
            0,
        )
        .await
        .unwrap();

        let status = pipeline.sink_mut().wait().await.unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "pcap-bytes");

        pipeline.teardown(false).await;
        assert!(pipeline.is_torn_down());
    }

    #[tokio::test]
    #[serial]
    async fn viewer_spawn_failure_stops_the_transport() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("source.pid");
        let ssh = write_script(
            dir.path(),
            "ssh",
            &format!(
                "echo $$ > '{0}.tmp' && mv '{0}.tmp' '{0}'\nexec sleep 30",
                pidfile.display()
            ),
        );

        let source = spawn_source(transport_at(ssh).as_ref(), "ignored").unwrap();
        let spawned_pid = source.leg().pid().unwrap();

        let mut written = None;
        for _ in 0..50 {
            if let Ok(pid) = std::fs::read_to_string(&pidfile) {
                written = Some(pid.trim().parse::<u32>().unwrap());
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let pid = written.expect("transport never started");
        assert_eq!(pid, spawned_pid);
        assert!(process_alive(pid));

        let result = Pipeline::attach_sink(
            source,
            &command("ignored"),
            &dir.path().join("no-such-viewer"),
            0,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::SinkSpawnFailed(_))));
        assert!(!process_alive(pid));
    }

    #[tokio::test]
    #[serial]
    async fn transport_stderr_tail_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ssh = write_script(
            dir.path(),
            "ssh",
            "for i in 1 2 3 4 5 6 7; do echo \"line $i\" >&2; done\nexit 255",
        );
        let viewer = write_script(dir.path(), "wireshark", "exec sleep 30");

        let mut pipeline = Pipeline::start(
            transport_at(ssh).as_ref(),
            &command("ignored"),
            &viewer,
            0,
        )
        .await
        .unwrap();
        let mut exited = None;
        for _ in 0..50 {
            exited = pipeline.poll_exits().unwrap();
            if exited.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(matches!(exited, Some((LegRole::Source, _))));
        pipeline.teardown(true).await;

        let lines = pipeline.source_diagnostics().await;
        assert_eq!(lines.len(), STDERR_TAIL_LINES);
        assert_eq!(lines.first().unwrap(), "line 3");
        assert_eq!(lines.last().unwrap(), "line 7");
        assert!(pipeline.source_diagnostics().await.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn missing_transport_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = write_script(dir.path(), "wireshark", "cat > /dev/null");

        let result = Pipeline::start(
            transport_at(dir.path().join("no-such-ssh")).as_ref(),
            &command("ignored"),
            &viewer,
            0,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::SourceSpawnFailed(_))));
    }

    #[tokio::test]
    #[serial]
    async fn teardown_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let ssh = write_script(dir.path(), "ssh", "exec sleep 30");
        let viewer = write_script(dir.path(), "wireshark", "exec sleep 30");

        let mut pipeline = Pipeline::start(
            transport_at(ssh).as_ref(),
            &command("ignored"),
            &viewer,
            2,
        )
        .await
        .unwrap();
        let source_pid = pipeline.source().pid().unwrap();
        let sink_pid = pipeline.sink().pid().unwrap();

        pipeline.teardown(true).await;
        pipeline.teardown(true).await;

        assert!(pipeline.source().exit_status().is_some());
        assert!(pipeline.sink().exit_status().is_some());
        assert!(!process_alive(source_pid));
        assert!(!process_alive(sink_pid));
    }

    #[tokio::test]
    #[serial]
    async fn viewer_survives_default_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let ssh = write_script(dir.path(), "ssh", "exec sleep 30");
        let viewer = write_script(dir.path(), "wireshark", "exec sleep 30");

        let mut pipeline = Pipeline::start(
            transport_at(ssh).as_ref(),
            &command("ignored"),
            &viewer,
            0,
        )
        .await
        .unwrap();

        pipeline.teardown(false).await;
        assert!(pipeline.source().exit_status().is_some());
        assert!(pipeline.poll_exits().unwrap().is_some());
        assert!(pipeline.sink_mut().poll_exit().unwrap().is_none());

        pipeline.sink_mut().kill().await.unwrap();
    }
}

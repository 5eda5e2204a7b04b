use super::signals::SignalRouter;
use super::types::{Completion, DrainReason, LifecycleState, RunMode, SessionOutcome};
use crate::configuration::Config;
use crate::pipeline::{LegRole, Pipeline};
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};

/// Supervises a running pipeline until it must be drained.
///
/// The controller owns the pipeline for the whole session. In bounded mode it
/// waits on the viewer with a deadline; in unbounded mode it polls both legs.
/// Any termination signal preempts either wait. Draining tears the pipeline
/// down exactly once; a bounded session whose limit elapses hands the pipeline
/// back untouched instead.
#[derive(Debug)]
pub struct LifecycleController {
    mode: RunMode,
    stop_viewer: bool,
    report_elapsed: bool,
    state: LifecycleState,
}

impl LifecycleController {
    pub fn new(mode: RunMode, stop_viewer: bool, report_elapsed: bool) -> Self {
        Self {
            mode,
            stop_viewer,
            report_elapsed,
            state: LifecycleState::Spawning,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RunMode::from_config(config),
            config.close_viewer,
            config.debug >= 1,
        )
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Supervises `pipeline`, whose session clock started at `started`.
    pub async fn run(
        &mut self,
        mut pipeline: Pipeline,
        started: DateTime<Utc>,
        signals: &mut SignalRouter,
    ) -> SessionOutcome {
        self.transition(LifecycleState::Running);

        if let RunMode::Unbounded { .. } = self.mode {
            println!("Press Ctrl+C to terminate capture and exit");
        }

        let completion = tokio::select! {
            completion = watch(&mut pipeline, self.mode) => completion,
            signal = signals.recv() => {
                info!("Received {}", signal.name());
                Completion::Drained(DrainReason::Signal(signal))
            }
        };

        let elapsed = Utc::now() - started;
        if self.report_elapsed {
            info!(
                "Session ran for {}.{:03}s",
                elapsed.num_seconds(),
                elapsed.num_milliseconds() % 1000
            );
        }

        match completion {
            Completion::TimeoutReached => {
                info!("Capture time limit reached, leaving the pipeline running");
                self.transition(LifecycleState::Terminated);
                SessionOutcome {
                    exit_code: 0,
                    completion: Completion::TimeoutReached,
                    elapsed,
                    failure: None,
                    detached: Some(pipeline),
                }
            }
            Completion::Drained(reason) => {
                self.transition(LifecycleState::Draining);
                debug!("Draining session: {:?}", reason);
                pipeline.teardown(self.stop_viewer).await;

                let failure = if reason.exit_code() != 0 {
                    Some(report_failure(&reason, &mut pipeline).await)
                } else {
                    None
                };
                self.transition(LifecycleState::Terminated);
                SessionOutcome {
                    exit_code: reason.exit_code(),
                    completion: Completion::Drained(reason),
                    elapsed,
                    failure,
                    detached: None,
                }
            }
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state.can_transition_to(next) {
            trace!("Lifecycle {:?} -> {:?}", self.state, next);
            self.state = next;
        } else {
            warn!("Ignoring lifecycle transition {:?} -> {:?}", self.state, next);
        }
    }
}

/// Logs why the session failed, followed by what the transport last said.
async fn report_failure(reason: &DrainReason, pipeline: &mut Pipeline) -> String {
    error!("Capture session failed: {}", reason);
    let diagnostics = pipeline.source_diagnostics().await;
    for line in &diagnostics {
        error!("[transport] {}", line);
    }

    let mut report = reason.to_string();
    for line in diagnostics {
        report.push('\n');
        report.push_str(&line);
    }
    report
}

async fn watch(pipeline: &mut Pipeline, mode: RunMode) -> Completion {
    match mode {
        RunMode::Bounded(limit) => {
            match tokio::time::timeout(limit, pipeline.sink_mut().wait()).await {
                Err(_) => Completion::TimeoutReached,
                Ok(Ok(status)) => Completion::Drained(DrainReason::SinkExited(status)),
                Ok(Err(e)) => Completion::Drained(DrainReason::WaitFailed(e.to_string())),
            }
        }
        RunMode::Unbounded { poll_interval } => {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                match pipeline.poll_exits() {
                    Ok(Some((LegRole::Sink, status))) => {
                        return Completion::Drained(DrainReason::SinkExited(status))
                    }
                    Ok(Some((LegRole::Source, status))) => {
                        return Completion::Drained(DrainReason::SourceExited(status))
                    }
                    Ok(None) => {}
                    Err(e) => return Completion::Drained(DrainReason::WaitFailed(e.to_string())),
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::capture_command::CaptureCommand;
    use crate::configuration::Config;
    use crate::lifecycle::signals::TerminationSignal;
    use crate::testsupport::{process_alive, write_script};
    use crate::transport;
    use serial_test::serial;
    use std::path::Path;
    use std::time::Duration;

    async fn pipeline(dir: &Path, source_body: &str, sink_body: &str) -> Pipeline {
        let ssh = write_script(dir, "ssh", source_body);
        let viewer = write_script(dir, "wireshark", sink_body);
        let transport = transport::select(&Config {
            transport_path: ssh,
            ..Config::for_tests()
        });
        let command = CaptureCommand {
            remote: "ignored".to_string(),
            viewer_args: Vec::new(),
        };
        Pipeline::start(transport.as_ref(), &command, &viewer, 0)
            .await
            .unwrap()
    }

    fn unbounded() -> RunMode {
        RunMode::Unbounded {
            poll_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    #[serial]
    async fn source_failure_ends_unbounded_session() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            "echo 'Permission denied (publickey).' >&2\nexit 255",
            "exec sleep 30",
        )
        .await;
        let sink_pid = pipeline.sink().pid().unwrap();

        let mut controller = LifecycleController::new(unbounded(), false, true);
        let outcome = controller
            .run(pipeline, Utc::now(), &mut SignalRouter::inert())
            .await;

        assert_eq!(controller.state(), LifecycleState::Terminated);
        assert_eq!(outcome.exit_code, 1);
        assert!(matches!(
            outcome.completion,
            Completion::Drained(DrainReason::SourceExited(_))
        ));
        assert!(outcome.detached.is_none());

        let failure = outcome.failure.expect("failure should be reported");
        assert!(failure.starts_with("transport exited with exit status: 255"), "{}", failure);
        assert!(failure.contains("Permission denied (publickey)."), "{}", failure);

        // viewer is kept by default
        assert!(process_alive(sink_pid));
        // SAFETY: sink_pid is the viewer spawned above.
        unsafe {
            libc::kill(sink_pid as libc::pid_t, libc::SIGKILL);
        }
    }

    #[tokio::test]
    #[serial]
    async fn closing_the_viewer_ends_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), "exec sleep 30", "exit 0").await;
        let source_pid = pipeline.source().pid().unwrap();

        let mut controller = LifecycleController::new(unbounded(), false, false);
        let outcome = controller
            .run(pipeline, Utc::now(), &mut SignalRouter::inert())
            .await;

        assert_eq!(outcome.exit_code, 0);
        assert!(matches!(
            outcome.completion,
            Completion::Drained(DrainReason::SinkExited(_))
        ));
        assert!(!process_alive(source_pid));
    }

    #[tokio::test]
    #[serial]
    async fn bounded_session_drains_when_viewer_exits_early() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), "exec sleep 30", "exit 0").await;

        let mut controller =
            LifecycleController::new(RunMode::Bounded(Duration::from_secs(10)), true, false);
        let outcome = controller
            .run(pipeline, Utc::now(), &mut SignalRouter::inert())
            .await;

        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.elapsed < chrono::Duration::seconds(10));
        assert!(outcome.detached.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn bounded_session_leaves_pipeline_running_on_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), "exec sleep 30", "exec sleep 30").await;

        let mut controller =
            LifecycleController::new(RunMode::Bounded(Duration::from_millis(200)), false, false);
        let outcome = controller
            .run(pipeline, Utc::now(), &mut SignalRouter::inert())
            .await;

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.completion, Completion::TimeoutReached);
        let mut detached = outcome.detached.expect("pipeline should be handed back");
        assert!(!detached.is_torn_down());
        assert!(detached.poll_exits().unwrap().is_none());

        detached.teardown(true).await;
        assert!(detached.sink().exit_status().is_some());
    }

    #[tokio::test]
    #[serial]
    async fn terminate_signal_drains_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), "exec sleep 30", "exec sleep 30").await;
        let source_pid = pipeline.source().pid().unwrap();
        let sink_pid = pipeline.sink().pid().unwrap();

        let mut signals = SignalRouter::install().unwrap();
        let mut controller = LifecycleController::new(unbounded(), true, false);

        let run = controller.run(pipeline, Utc::now(), &mut signals);
        let raise = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            // SAFETY: SIGTERM is hooked by the router above.
            unsafe {
                libc::kill(libc::getpid(), libc::SIGTERM);
            }
        };
        let (outcome, ()) = tokio::join!(run, raise);

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(
            outcome.completion,
            Completion::Drained(DrainReason::Signal(TerminationSignal::Terminate))
        );
        assert!(!process_alive(source_pid));
        assert!(!process_alive(sink_pid));
    }
}

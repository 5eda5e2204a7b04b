use super::classifier::{classify, ProbeVerdict};
use super::state::{HandshakeState, TrustState};
use crate::error_handling::types::HandshakeError;
use crate::lifecycle::SignalRouter;
use crate::transport::TransportStrategy;
use log::{debug, info, trace, warn};
use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Countdown before an uncached host key is accepted automatically.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

const SENTINEL_PREFIX: &str = "remoteshark::connection-test::";
const AFFIRMATIVE_ANSWER: &[u8] = b"y";

/// Pre-flight connection test for transports that refuse unknown hosts in batch mode.
///
/// The handshake probes the host with a command echoing a per-run sentinel. If
/// the client reports an uncached host key, the operator gets `grace` to abort
/// with Ctrl+C; otherwise the key is accepted by answering the client's prompt
/// and the probe is repeated once.
///
/// A handshake runs at most once; later calls return the recorded result.
#[derive(Debug)]
pub struct TrustHandshake {
    grace: Duration,
    sentinel: String,
    state: HandshakeState,
    trust: TrustState,
}

impl Default for TrustHandshake {
    fn default() -> Self {
        Self::new(GRACE_PERIOD)
    }
}

impl TrustHandshake {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            sentinel: format!("{}{}", SENTINEL_PREFIX, Uuid::new_v4().simple()),
            state: HandshakeState::Idle,
            trust: TrustState::Unknown,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn trust(&self) -> TrustState {
        self.trust
    }

    fn probe_command(&self) -> String {
        format!("echo \"{}\"", self.sentinel)
    }

    pub async fn run(
        &mut self,
        transport: &dyn TransportStrategy,
        signals: &mut SignalRouter,
    ) -> Result<TrustState, HandshakeError> {
        if self.state != HandshakeState::Idle {
            debug!("Handshake already ran, ending in {:?}", self.state);
            return match self.trust {
                TrustState::Trusted => Ok(TrustState::Trusted),
                TrustState::Unknown => Err(HandshakeError::AlreadyAttempted),
            };
        }

        self.transition(HandshakeState::Probing);
        let output = match self.probe(transport, signals).await {
            Ok(output) => output,
            Err(e) => {
                self.transition(HandshakeState::Failed);
                return Err(e);
            }
        };
        let (stdout, stderr) = decode(&output);

        match classify(&self.sentinel, &stdout, &stderr) {
            ProbeVerdict::Trusted => {
                info!("Successful connection to the remote host");
                return Ok(self.trusted());
            }
            ProbeVerdict::Failed => {
                self.transition(HandshakeState::Failed);
                echo_diagnostics(&stdout, &stderr);
                return Err(HandshakeError::ConnectionFailed { stdout, stderr });
            }
            ProbeVerdict::HostKeyNotCached => self.transition(HandshakeState::PromptPending),
        }

        eprintln!("{}", stderr);
        println!(
            "\n\nThis utility will automatically add the host key in {} seconds.",
            self.grace.as_secs()
        );
        println!("Press Ctrl+C to abort...");

        tokio::select! {
            _ = tokio::time::sleep(self.grace) => {}
            signal = signals.recv() => {
                debug!("Host key countdown interrupted by {}", signal.name());
                println!("ABORTED");
                self.transition(HandshakeState::Failed);
                return Err(HandshakeError::Aborted);
            }
        }

        self.transition(HandshakeState::Retrying);
        let output = match self.accept_and_probe(transport, signals).await {
            Ok(output) => output,
            Err(e) => {
                self.transition(HandshakeState::Failed);
                return Err(e);
            }
        };
        let (stdout, stderr) = decode(&output);

        match classify(&self.sentinel, &stdout, &stderr) {
            ProbeVerdict::Trusted => {
                info!("Host key added to the local cache");
                Ok(self.trusted())
            }
            verdict => {
                debug!("Retry after accepting the host key: {:?}", verdict);
                self.transition(HandshakeState::Failed);
                echo_diagnostics(&stdout, &stderr);
                Err(HandshakeError::HostKeyRejected { stdout, stderr })
            }
        }
    }

    async fn probe(
        &self,
        transport: &dyn TransportStrategy,
        signals: &mut SignalRouter,
    ) -> Result<Output, HandshakeError> {
        let mut cmd = transport.batch_command(&self.probe_command());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        trace!("Running connection test through {}", transport.client().display());

        tokio::select! {
            output = cmd.output() => Ok(output?),
            signal = signals.recv() => {
                debug!("Connection test interrupted by {}", signal.name());
                println!("ABORTED");
                Err(HandshakeError::Aborted)
            }
        }
    }

    /// Re-runs the probe interactively, answering the host key prompt.
    async fn accept_and_probe(
        &self,
        transport: &dyn TransportStrategy,
        signals: &mut SignalRouter,
    ) -> Result<Output, HandshakeError> {
        let mut cmd = transport.interactive_command(&self.probe_command());
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        trace!("Accepting host key through {}", transport.client().display());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(AFFIRMATIVE_ANSWER).await {
                Ok(()) => stdin.flush().await.or_else(ignore_broken_pipe)?,
                Err(e) => ignore_broken_pipe(e)?,
            }
            // closing stdin ends the prompt input
            drop(stdin);
        }

        tokio::select! {
            output = child.wait_with_output() => Ok(output?),
            signal = signals.recv() => {
                debug!("Host key acceptance interrupted by {}", signal.name());
                println!("ABORTED");
                Err(HandshakeError::Aborted)
            }
        }
    }

    fn trusted(&mut self) -> TrustState {
        self.transition(HandshakeState::Trusted);
        self.trust = TrustState::Trusted;
        self.trust
    }

    fn transition(&mut self, next: HandshakeState) {
        if self.state.can_transition_to(next) {
            trace!("Handshake {:?} -> {:?}", self.state, next);
            self.state = next;
        } else {
            warn!("Ignoring handshake transition {:?} -> {:?}", self.state, next);
        }
    }
}

/// The client may exit before reading the answer.
fn ignore_broken_pipe(e: std::io::Error) -> std::io::Result<()> {
    if e.kind() == ErrorKind::BrokenPipe {
        debug!("Transport closed its input before the answer was written");
        Ok(())
    } else {
        Err(e)
    }
}

fn decode(output: &Output) -> (String, String) {
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn echo_diagnostics(stdout: &str, stderr: &str) {
    eprintln!("{}", stdout);
    eprintln!("{}", stderr);
}

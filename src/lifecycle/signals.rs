//! Routing of process termination signals into the session teardown path.
//!
//! Once a [`SignalRouter`] is installed the default disposition of the hooked
//! signals is replaced: they no longer kill `remoteshark` and instead surface
//! through [`SignalRouter::recv`], so every stop goes through the same teardown.

use log::{debug, trace};
use std::future::poll_fn;
use std::io;
use std::task::Poll;

#[cfg(unix)]
type SignalStream = tokio::signal::unix::Signal;
#[cfg(windows)]
type SignalStream = tokio::signal::windows::CtrlC;

/// Signals that end a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
    Abort,
    IllegalInstruction,
}

impl TerminationSignal {
    pub fn name(self) -> &'static str {
        match self {
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::Abort => "SIGABRT",
            TerminationSignal::IllegalInstruction => "SIGILL",
        }
    }

    /// Interrupt and terminate are operator requests and end the session successfully.
    pub fn is_operator_request(self) -> bool {
        matches!(
            self,
            TerminationSignal::Interrupt | TerminationSignal::Terminate
        )
    }
}

/// Owns the installed signal streams of the process.
pub struct SignalRouter {
    streams: Vec<(TerminationSignal, SignalStream)>,
}

impl SignalRouter {
    /// Hooks interrupt, terminate, abort and illegal-instruction.
    ///
    /// Interrupt and terminate are mandatory. The runtime refuses to hook some
    /// signals (SIGILL among them); those are logged and keep their default action.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let wanted = [
            (TerminationSignal::Interrupt, SignalKind::interrupt()),
            (TerminationSignal::Terminate, SignalKind::terminate()),
            (TerminationSignal::Abort, SignalKind::from_raw(libc::SIGABRT)),
            (
                TerminationSignal::IllegalInstruction,
                SignalKind::from_raw(libc::SIGILL),
            ),
        ];

        let mut streams = Vec::with_capacity(wanted.len());
        for (kind, signal_kind) in wanted {
            match signal(signal_kind) {
                Ok(stream) => {
                    trace!("Setting the hook {}", kind.name());
                    streams.push((kind, stream));
                }
                Err(e) if kind.is_operator_request() => return Err(e),
                Err(e) => debug!("Cannot hook {}: {}", kind.name(), e),
            }
        }
        Ok(Self { streams })
    }

    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        let stream = tokio::signal::windows::ctrl_c()?;
        trace!("Setting the hook {}", TerminationSignal::Interrupt.name());
        Ok(Self {
            streams: vec![(TerminationSignal::Interrupt, stream)],
        })
    }

    /// A router that never fires.
    pub fn inert() -> Self {
        Self {
            streams: Vec::new(),
        }
    }

    pub fn hooked(&self) -> Vec<TerminationSignal> {
        self.streams.iter().map(|(kind, _)| *kind).collect()
    }

    /// Waits for the next hooked signal.
    pub async fn recv(&mut self) -> TerminationSignal {
        poll_fn(|cx| {
            for (kind, stream) in self.streams.iter_mut() {
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(*kind);
                }
            }
            Poll::Pending
        })
        .await
    }
}

use log::{debug, trace, warn};
use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;

/// Position of a process in the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegRole {
    /// Transport client streaming the remote capture.
    Source,
    /// Local viewer reading the capture.
    Sink,
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegRole::Source => write!(f, "transport"),
            LegRole::Sink => write!(f, "viewer"),
        }
    }
}

/// One spawned process of the pipeline.
///
/// The exit status is cached once observed, so liveness checks, waits and
/// termination can be repeated freely.
#[derive(Debug)]
pub struct Leg {
    role: LegRole,
    child: Child,
    pid: Option<u32>,
    status: Option<ExitStatus>,
    signalled: bool,
}

impl Leg {
    pub fn new(role: LegRole, child: Child) -> Self {
        let pid = child.id();
        trace!("{} started with pid {:?}", role, pid);
        Self {
            role,
            child,
            pid,
            status: None,
            signalled: false,
        }
    }

    pub fn role(&self) -> LegRole {
        self.role
    }

    /// Pid at spawn time; stays available after the process was reaped.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Non-blocking check for termination.
    pub fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            debug!("{} exited with {}", self.role, status);
            self.status = Some(status);
        }
        Ok(status)
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        debug!("{} exited with {}", self.role, status);
        self.status = Some(status);
        Ok(status)
    }

    /// Asks the process to terminate. Does nothing once it exited or was already asked.
    pub fn terminate(&mut self) -> io::Result<()> {
        if self.signalled || self.poll_exit()?.is_some() {
            return Ok(());
        }
        debug!("Terminating {} (pid {:?})", self.role, self.pid);
        send_terminate(&mut self.child)?;
        self.signalled = true;
        Ok(())
    }

    /// Waits up to `grace` for a signalled process to go away.
    pub async fn reap(&mut self, grace: Duration) {
        if !self.signalled || self.status.is_some() {
            return;
        }
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Failed to collect {} exit status: {}", self.role, e),
            Err(_) => warn!(
                "{} (pid {:?}) still running after termination request",
                self.role, self.pid
            ),
        }
    }

    /// Forcefully stops and reaps the process.
    pub async fn kill(&mut self) -> io::Result<()> {
        if self.poll_exit()?.is_some() {
            return Ok(());
        }
        self.child.kill().await?;
        let status = self.child.wait().await?;
        debug!("{} killed: {}", self.role, status);
        self.status = Some(status);
        Ok(())
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    match child.id() {
        Some(pid) => {
            // SAFETY: the child has not been reaped yet, so `pid` still names it.
            let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if ret == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        }
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

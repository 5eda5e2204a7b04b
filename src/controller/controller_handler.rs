use crate::capture_command::CaptureCommand;
use crate::configuration::{Args, Config};
use crate::error_handling::types::*;
use crate::handshake::TrustHandshake;
use crate::interfaces::{list_interfaces, render_table};
use crate::lifecycle::{Completion, LifecycleController, SignalRouter};
use crate::pipeline::Pipeline;
use crate::transport::capability::{probe, VIEWER_VERSION_ARGS};
use crate::transport::{self, TransportStrategy};
use chrono::Utc;
use log::{debug, info, trace};
use std::time::Duration;

/// Drives one `remoteshark` invocation from a validated configuration to an
/// exit code.
///
/// # Session flow
///
/// 1. check that the transport client (and, for captures, the viewer) runs
/// 2. install the signal router
/// 3. run the trust handshake when the transport needs a pre-flight
/// 4. either list the remote interfaces, or build the capture command, start
///    the pipeline and hand it to the lifecycle controller
pub struct Controller {
    pub config: Config,
    transport: Box<dyn TransportStrategy>,
    grace: Duration,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        let transport = transport::select(&config);
        Self {
            config,
            transport,
            grace: crate::handshake::GRACE_PERIOD,
        }
    }

    /// Validates the command line into a configuration and builds the controller.
    pub fn from_args(args: Args) -> Result<Self, ControllerError> {
        Ok(Self::new(Config::from_args(args)?))
    }

    /// Overrides the host key countdown of the trust handshake.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub async fn run(&self) -> Result<i32, ControllerError> {
        trace!("Session configuration: {:?}", self.config);
        self.check_requirements().await?;

        let mut signals = SignalRouter::install().map_err(ControllerError::SignalSetupFailed)?;

        if self.transport.requires_preflight() {
            TrustHandshake::new(self.grace)
                .run(self.transport.as_ref(), &mut signals)
                .await?;
        }

        if self.config.list_interfaces {
            self.list(&mut signals).await
        } else {
            self.capture(&mut signals).await
        }
    }

    async fn check_requirements(&self) -> Result<(), TransportError> {
        probe(
            &self.transport.kind().to_string(),
            self.transport.client(),
            self.transport.version_args(),
        )
        .await?;

        if !self.config.list_interfaces {
            probe("wireshark", &self.config.viewer_path, &VIEWER_VERSION_ARGS).await?;
        }
        Ok(())
    }

    async fn list(&self, signals: &mut SignalRouter) -> Result<i32, ControllerError> {
        let entries = list_interfaces(self.transport.as_ref(), signals).await?;
        print!("{}", render_table(&entries));
        Ok(0)
    }

    async fn capture(&self, signals: &mut SignalRouter) -> Result<i32, ControllerError> {
        let command = CaptureCommand::build(&self.config);
        trace!("Running remote command \"{}\"", command.remote);

        let started = Utc::now();
        let pipeline = Pipeline::start(
            self.transport.as_ref(),
            &command,
            &self.config.viewer_path,
            self.config.debug,
        )
        .await?;
        info!("Capturing on {} from {}", self.config.interface, self.config.host);

        let mut lifecycle = LifecycleController::from_config(&self.config);
        let outcome = lifecycle.run(pipeline, started, signals).await;

        if let Completion::TimeoutReached = outcome.completion {
            // both legs are left to finish on their own
            debug!("Leaving {} and the viewer running", self.transport.client().display());
        }
        Ok(outcome.exit_code)
    }
}

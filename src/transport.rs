//! Transport strategies.
//!
//! One [`TransportStrategy`] implementation exists per remote shell client
//! family. The strategy is chosen once from the configuration and then used to
//! build every transport invocation of the session.

pub mod capability;
pub mod openssh;
pub mod plink;
pub mod strategy;

use crate::configuration::{Config, TransportKind};

pub use openssh::OpenSshTransport;
pub use plink::PlinkTransport;
pub use strategy::TransportStrategy;

/// Builds the transport strategy selected by `config`.
pub fn select(config: &Config) -> Box<dyn TransportStrategy> {
    match config.transport {
        TransportKind::Ssh => Box::new(OpenSshTransport::from_config(config)),
        TransportKind::Plink => Box::new(PlinkTransport::from_config(config)),
    }
}

//! Error taxonomy shared by every stage of a capture session.

pub mod types;

pub use types::{
    ConfigError, ControllerError, HandshakeError, ListError, PipelineError, TransportError,
};

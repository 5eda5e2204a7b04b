pub mod capture_command;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod handshake;
pub mod interfaces;
pub mod lifecycle;
pub mod pipeline;
pub mod transport;

#[cfg(all(test, unix))]
pub(crate) mod testsupport;

//! Session configuration.
//!
//! The command line ([`args::Args`]) and an optional TOML defaults file
//! ([`defaults::FileDefaults`]) are merged and validated once into an immutable
//! [`config::Config`], which every later stage receives by reference.

pub mod args;
pub mod config;
pub mod defaults;
pub mod filter;
pub mod types;

pub use args::Args;
pub use config::Config;
pub use types::{Decompressor, Platform, RemoteFile, TransportKind};

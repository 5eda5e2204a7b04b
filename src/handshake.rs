//! First-contact trust handshake for transports that cannot accept a new host
//! key inside the capture session itself.

pub mod classifier;
pub mod state;
pub mod trust;

pub use classifier::{classify, ProbeVerdict};
pub use state::{HandshakeState, TrustState};
pub use trust::{TrustHandshake, GRACE_PERIOD};

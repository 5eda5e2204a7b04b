//! Best-effort reading of transport client output during the handshake.
//!
//! Only this module looks at the wording of client diagnostics.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    Trusted,
    HostKeyNotCached,
    Failed,
}

static HOST_KEY_NOT_CACHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)host key is not cached").expect("static regex is valid"));

/// The sentinel on stdout wins over anything printed on stderr.
pub fn classify(sentinel: &str, stdout: &str, stderr: &str) -> ProbeVerdict {
    if stdout.contains(sentinel) {
        ProbeVerdict::Trusted
    } else if HOST_KEY_NOT_CACHED.is_match(stderr) {
        ProbeVerdict::HostKeyNotCached
    } else {
        ProbeVerdict::Failed
    }
}

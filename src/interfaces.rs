//! Listing of the capture interfaces available on the remote host.

use crate::capture_command::list_interfaces_command;
use crate::error_handling::types::ListError;
use crate::lifecycle::SignalRouter;
use crate::transport::TransportStrategy;
use log::{debug, trace};
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;

// `3.eth0 (Intel Ethernet) [Up, Running]`; description and flags are optional
static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\.(\S+)(?:\s+\(.*\))?(?:\s+\[(.*)\])?\s*$").expect("static regex is valid")
});

const TABLE_SEPARATOR: &str = "-----------+--------------------------";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InterfaceEntry {
    pub name: String,
    pub status: String,
}

/// Parses `tcpdump --list-interfaces` output, sorted by interface name.
/// Lines that do not look like interface entries are skipped.
pub fn parse_listing(output: &str) -> Vec<InterfaceEntry> {
    let mut entries: Vec<InterfaceEntry> = output
        .lines()
        .filter_map(|line| {
            let caps = LISTING_LINE.captures(line)?;
            Some(InterfaceEntry {
                name: caps[1].to_string(),
                status: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect();
    entries.sort();
    entries
}

pub fn render_table(entries: &[InterfaceEntry]) -> String {
    let mut table = format!("{:>10} | {:>24}\n{}\n", "Interface", "Status", TABLE_SEPARATOR);
    for entry in entries {
        table.push_str(&format!("{:>10} | {:>24}\n", entry.name, entry.status));
    }
    table
}

/// Runs the listing command on the remote host.
pub async fn list_interfaces(
    transport: &dyn TransportStrategy,
    signals: &mut SignalRouter,
) -> Result<Vec<InterfaceEntry>, ListError> {
    let mut cmd = transport.batch_command(&list_interfaces_command());
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("Listing interfaces through {}", transport.client().display());

    let output = tokio::select! {
        output = cmd.output() => output?,
        signal = signals.recv() => {
            debug!("Interface listing interrupted by {}", signal.name());
            return Err(ListError::Interrupted);
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        eprintln!("{}", stderr);
        return Err(ListError::RemoteFailed {
            status: output.status.code(),
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    trace!("Raw interface listing:\n{}", stdout);
    Ok(parse_listing(&stdout))
}

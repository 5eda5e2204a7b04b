use crate::configuration::filter::shell_quote;
use crate::configuration::{Config, RemoteFile};

pub const CAPTURE_TOOL: &str = "tcpdump";
const TIMEOUT_WRAPPER: &str = "timeout";
// capture tool chatter must never reach the pcap stream read by the viewer
const DISCARD_STDERR: &str = "2>/dev/null";

/// Seconds added to the operator timeout to absorb connection setup.
pub const CONNECT_GRACE_SECS: u64 = 1;

/// Remote shell command producing a pcap stream on stdout.
pub fn remote_command(config: &Config) -> String {
    let source = match &config.remote_file {
        Some(file) => file_stream(file, config.packet_count),
        None => live_capture(config),
    };

    match config.timeout_secs {
        Some(secs) => format!(
            "{} {} {}",
            TIMEOUT_WRAPPER,
            secs.saturating_add(CONNECT_GRACE_SECS),
            source
        ),
        None => source,
    }
}

pub fn list_interfaces_command() -> String {
    format!("{} --list-interfaces", CAPTURE_TOOL)
}

fn live_capture(config: &Config) -> String {
    let mut cmd = String::from(CAPTURE_TOOL);
    if let Some(count) = config.packet_count {
        cmd.push_str(&format!(" -c {}", count));
    }
    cmd.push_str(&format!(" -U -n -i \"{}\" -s 0 -q -w -", config.interface));
    if !config.capture_filter.trim().is_empty() {
        cmd.push(' ');
        cmd.push_str(&shell_quote(&config.capture_filter));
    }
    cmd.push(' ');
    cmd.push_str(DISCARD_STDERR);
    cmd
}

/// Streams a recorded capture; a packet limit re-reads it through the capture tool.
fn file_stream(file: &RemoteFile, packet_count: Option<u64>) -> String {
    let mut cmd = format!(
        "{} {} {}",
        file.decompressor.program(),
        shell_quote(&file.path),
        DISCARD_STDERR
    );
    if let Some(count) = packet_count {
        cmd.push_str(&format!(
            " | {} -r - -c {} -U -w - {}",
            CAPTURE_TOOL, count, DISCARD_STDERR
        ));
    }
    cmd
}

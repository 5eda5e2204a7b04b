use super::types::TransportKind;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::path::PathBuf;

/// Command-line surface of `remoteshark`.
///
/// Parsing errors (unknown flags, non-integer counts or timeouts) are reported by
/// clap and end the process with exit status 2.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "remoteshark")]
#[command(version)]
#[command(
    about = "Capture traffic on a remote host over SSH and view it live in a local Wireshark"
)]
pub struct Args {
    /// Remote host, optionally followed by `:path` of a capture file to stream instead
    /// of capturing live (`host:/var/tmp/dump.pcap.gz`)
    #[arg(value_name = "HOST[:REMOTE_FILE]")]
    pub target: Option<String>,

    /// Stop capture after receiving count packets
    #[arg(short = 'c', long)]
    pub count: Option<u64>,

    /// Stop capture after timeout seconds have expired
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// SSH user to connect as (default root)
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// SSH port of the remote host
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Compress the transport stream (default when streaming a remote file)
    #[arg(long, overrides_with = "no_compress")]
    pub compress: bool,

    /// Never compress the transport stream
    #[arg(long, overrides_with = "compress")]
    pub no_compress: bool,

    /// Capture filter, see pcap-filter(7) (default "not port 22")
    #[arg(short = 'f', long)]
    pub filter: Option<String>,

    /// Wireshark display filter applied to the live view
    #[arg(short = 'Y', long)]
    pub display_filter: Option<String>,

    /// Remote interface to listen on (default any)
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Increase debug output; repeat for more detail
    #[arg(short = 'd', long, action = ArgAction::Count)]
    pub debug: u8,

    /// Connect to the remote host and list interfaces available for capturing
    #[arg(long)]
    pub list_interfaces: bool,

    /// Also capture fragmented IPv4 packets that the filter would drop
    #[arg(long)]
    pub fragments: bool,

    /// Remote shell client family (default depends on the local platform)
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Path of the remote shell client binary
    #[arg(long, env = "REMOTESHARK_TRANSPORT_PATH")]
    pub transport_path: Option<PathBuf>,

    /// Path of the Wireshark binary
    #[arg(long, env = "REMOTESHARK_VIEWER_PATH")]
    pub viewer_path: Option<PathBuf>,

    /// TOML file with default values for user, port, interface and filters
    #[arg(long, env = "REMOTESHARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also stop Wireshark when the session ends
    #[arg(long)]
    pub close_viewer: bool,
}

impl Args {
    /// Log verbosity for the requested debug level.
    pub fn log_level(&self) -> LevelFilter {
        level_for_debug(self.debug)
    }
}

pub fn level_for_debug(debug: u8) -> LevelFilter {
    match debug {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

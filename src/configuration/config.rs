use super::args::Args;
use super::defaults::{self, FileDefaults, DEFAULT_FILTER, DEFAULT_INTERFACE, DEFAULT_USER};
use super::filter::{validate_filter, validate_interface, with_fragments};
use super::types::{Platform, RemoteFile, TransportKind};
use crate::error_handling::types::ConfigError;
use log::{debug, trace};
use std::net::{IpAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Validated, immutable settings of one capture session.
///
/// A `Config` is built once from the command line (and the optional defaults file)
/// before any process is spawned, then handed by reference to the command builder,
/// the trust handshake, the pipeline and the lifecycle controller.
///
/// # Fields Overview
///
/// - `host` / `address`: remote host as given by the operator and its resolved address
/// - `user`, `port`: login used by the transport client
/// - `packet_count`, `timeout_secs`: optional run limits; zero values are normalised to `None`
/// - `capture_filter`: pcap filter, already checked against the denylist
/// - `interface`: remote interface passed to the capture tool
/// - `display_filter`: optional filter applied by the local viewer
/// - `remote_file`: optional pre-recorded capture streamed instead of a live capture
/// - `compress`: request transport compression; on by default for remote files
/// - `debug`: verbosity level, higher is chattier
/// - `transport`, `transport_path`, `viewer_path`: external programs
/// - `close_viewer`: whether teardown also stops the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub address: IpAddr,
    pub user: String,
    pub port: Option<u16>,
    pub packet_count: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub capture_filter: String,
    pub interface: String,
    pub display_filter: Option<String>,
    pub remote_file: Option<RemoteFile>,
    pub compress: bool,
    pub debug: u8,
    pub list_interfaces: bool,
    pub transport: TransportKind,
    pub transport_path: PathBuf,
    pub viewer_path: PathBuf,
    pub close_viewer: bool,
}

impl Config {
    /// Builds the session configuration for the local platform.
    ///
    /// Reads the defaults file named by `--config`, if any, then validates host,
    /// interface, filter and remote file reference.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileDefaults::from_file(path)?,
            None => FileDefaults::default(),
        };
        Self::build(args, file, Platform::current())
    }

    pub(crate) fn build(
        args: Args,
        file: FileDefaults,
        platform: Platform,
    ) -> Result<Self, ConfigError> {
        let target = args
            .target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingHost)?;
        let (host, remote_path) = split_target(target)?;
        let address = resolve_host(&host)?;

        let remote_file = match remote_path {
            Some(path) => Some(parse_remote_file(&path)?),
            None => None,
        };

        let interface = args
            .interface
            .or(file.interface)
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
        validate_interface(&interface)?;

        let raw_filter = args
            .filter
            .or(file.filter)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        validate_filter(&raw_filter)?;
        let capture_filter = if args.fragments {
            with_fragments(&raw_filter)
        } else {
            raw_filter
        };

        let compress = if args.no_compress {
            false
        } else {
            args.compress || remote_file.is_some()
        };

        let transport = args
            .transport
            .or(file.transport)
            .unwrap_or_else(|| platform.default_transport());
        let transport_path = args
            .transport_path
            .or(file.transport_path)
            .unwrap_or_else(|| defaults::transport_path(transport, platform));
        let viewer_path = args
            .viewer_path
            .or(file.viewer_path)
            .unwrap_or_else(|| defaults::viewer_path(platform));

        let config = Config {
            host,
            address,
            user: args
                .user
                .or(file.user)
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            port: args.port.or(file.port),
            packet_count: args.count.filter(|c| *c > 0),
            timeout_secs: args.timeout.filter(|t| *t > 0),
            capture_filter,
            interface,
            display_filter: args
                .display_filter
                .or(file.display_filter)
                .filter(|f| !f.trim().is_empty()),
            remote_file,
            compress,
            debug: args.debug,
            list_interfaces: args.list_interfaces,
            transport,
            transport_path,
            viewer_path,
            close_viewer: args.close_viewer,
        };

        trace!("Current config: {:?}", config);
        Ok(config)
    }

    /// `user@host` login passed to the transport client.
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Splits `host[:remoteFile]`; bare and bracketed IPv6 addresses are supported.
fn split_target(target: &str) -> Result<(String, Option<String>), ConfigError> {
    if target.parse::<IpAddr>().is_ok() {
        return Ok((target.to_string(), None));
    }

    if let Some(rest) = target.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            ConfigError::UnresolvableHost(target.to_string())
        })?;
        return match tail {
            "" => Ok((host.to_string(), None)),
            _ => match tail.strip_prefix(':') {
                Some(path) => Ok((host.to_string(), Some(path.to_string()))),
                None => Err(ConfigError::UnresolvableHost(target.to_string())),
            },
        };
    }

    match target.split_once(':') {
        Some((host, path)) => Ok((host.to_string(), Some(path.to_string()))),
        None => Ok((target.to_string(), None)),
    }
}

fn parse_remote_file(path: &str) -> Result<RemoteFile, ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::BadRemoteFile(
            "remote file path cannot be empty".to_string(),
        ));
    }
    if path.contains('\'') {
        return Err(ConfigError::BadRemoteFile(format!(
            "'{}': remote file path cannot contain single quotes",
            path
        )));
    }
    Ok(RemoteFile::new(path))
}

fn resolve_host(host: &str) -> Result<IpAddr, ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::MissingHost);
    }

    if let Ok(address) = host.parse::<IpAddr>() {
        debug!("Detected host ({}) as an IP address", host);
        return Ok(address);
    }

    let resolved = (host, 0u16)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
        .ok_or_else(|| ConfigError::UnresolvableHost(host.to_string()))?;
    debug!("Resolved host ({}) to {}", host, resolved);
    Ok(resolved)
}

#[cfg(test)]
impl Config {
    /// Minimal live-capture configuration for unit tests.
    pub(crate) fn for_tests() -> Self {
        Config {
            host: "192.0.2.10".to_string(),
            address: IpAddr::from([192, 0, 2, 10]),
            user: DEFAULT_USER.to_string(),
            port: None,
            packet_count: None,
            timeout_secs: None,
            capture_filter: DEFAULT_FILTER.to_string(),
            interface: DEFAULT_INTERFACE.to_string(),
            display_filter: None,
            remote_file: None,
            compress: false,
            debug: 0,
            list_interfaces: false,
            transport: TransportKind::Ssh,
            transport_path: PathBuf::from("ssh"),
            viewer_path: PathBuf::from("wireshark"),
            close_viewer: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::Decompressor;
    use clap::Parser;

    fn build(argv: &[&str]) -> Result<Config, ConfigError> {
        let mut full = vec!["remoteshark"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap_or_else(|e| panic!("{}", e));
        Config::build(args, FileDefaults::default(), Platform::Linux)
    }

    #[test]
    fn applies_builtin_defaults() {
        let config = build(&["192.0.2.1"]).unwrap();

        assert_eq!(config.user, "root");
        assert_eq!(config.interface, "any");
        assert_eq!(config.capture_filter, "not port 22");
        assert_eq!(config.transport, TransportKind::Ssh);
        assert_eq!(config.login(), "root@192.0.2.1");
        assert!(config.remote_file.is_none());
        assert!(!config.compress);
    }

    #[test]
    fn missing_host_is_rejected() {
        match build(&["-c", "3"]) {
            Err(ConfigError::MissingHost) => {}
            other => panic!("expected MissingHost, got {:?}", other),
        }
    }

    #[test]
    fn denylisted_filter_fails_construction() {
        match build(&["-f", "port 22; reboot", "192.0.2.1"]) {
            Err(ConfigError::ForbiddenFilterCharacter(';')) => {}
            other => panic!("expected filter rejection, got {:?}", other),
        }
    }

    #[test]
    fn fragments_flag_rewrites_filter() {
        let config = build(&["--fragments", "-f", "tcp", "192.0.2.1"]).unwrap();
        assert_eq!(
            config.capture_filter,
            "(tcp) or ( ip[6:2] & 0x3fff != 0x0000 )"
        );
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let config = build(&["-c", "0", "-t", "0", "192.0.2.1"]).unwrap();
        assert_eq!(config.packet_count, None);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn remote_file_enables_compression() {
        let config = build(&["192.0.2.1:/var/tmp/dump.pcap.gz"]).unwrap();
        assert_eq!(config.host, "192.0.2.1");
        let file = config.remote_file.clone().unwrap();
        assert_eq!(file.path, "/var/tmp/dump.pcap.gz");
        assert_eq!(file.decompressor, Decompressor::Gzip);
        assert!(config.compress);
    }

    #[test]
    fn compression_can_be_disabled_for_remote_files() {
        let config = build(&["--no-compress", "192.0.2.1:/tmp/a.pcap"]).unwrap();
        assert!(!config.compress);
    }

    #[test]
    fn ipv6_targets() {
        let bare = build(&["2001:db8::1"]).unwrap();
        assert_eq!(bare.host, "2001:db8::1");
        assert!(bare.remote_file.is_none());

        let bracketed = build(&["[2001:db8::1]:/tmp/a.pcap.bz2"]).unwrap();
        assert_eq!(bracketed.host, "2001:db8::1");
        assert_eq!(
            bracketed.remote_file.unwrap().decompressor,
            Decompressor::Bzip2
        );
    }

    #[test]
    fn remote_file_path_is_validated() {
        assert!(matches!(
            build(&["192.0.2.1:"]),
            Err(ConfigError::BadRemoteFile(_))
        ));
        assert!(matches!(
            build(&["192.0.2.1:/tmp/it's.pcap"]),
            Err(ConfigError::BadRemoteFile(_))
        ));
    }

    #[test]
    fn bad_interface_is_rejected() {
        assert!(matches!(
            build(&["-i", "eth0 eth1", "192.0.2.1"]),
            Err(ConfigError::BadInterface(_))
        ));
    }

    #[test]
    fn localhost_resolves() {
        let config = build(&["localhost"]).unwrap();
        assert!(config.address.is_loopback());
    }

    #[test]
    fn command_line_overrides_file_defaults() {
        let args = Args::try_parse_from(["remoteshark", "-u", "cli", "192.0.2.1"]).unwrap();
        let file = FileDefaults {
            user: Some("file".to_string()),
            interface: Some("eth2".to_string()),
            transport: Some(TransportKind::Plink),
            ..FileDefaults::default()
        };

        let config = Config::build(args, file, Platform::Linux).unwrap();
        assert_eq!(config.user, "cli");
        assert_eq!(config.interface, "eth2");
        assert_eq!(config.transport, TransportKind::Plink);
        assert_eq!(config.transport_path, PathBuf::from("plink"));
    }

    #[test]
    fn file_filter_is_validated_too() {
        let args = Args::try_parse_from(["remoteshark", "192.0.2.1"]).unwrap();
        let file = FileDefaults {
            filter: Some("port `id`".to_string()),
            ..FileDefaults::default()
        };
        assert!(matches!(
            Config::build(args, file, Platform::Linux),
            Err(ConfigError::ForbiddenFilterCharacter('`'))
        ));
    }
}

use clap::ValueEnum;
use serde::Deserialize;

/// Remote shell client family used for the transport leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// OpenSSH `ssh`; trust caching happens inside the session process.
    Ssh,
    /// PuTTY `plink`; needs a separate host key pre-flight.
    Plink,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Ssh => write!(f, "ssh"),
            TransportKind::Plink => write!(f, "plink"),
        }
    }
}

/// Local operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    pub fn default_transport(self) -> TransportKind {
        match self {
            Platform::Windows => TransportKind::Plink,
            _ => TransportKind::Ssh,
        }
    }
}

/// Remote stream decompressor, chosen by the capture file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decompressor {
    Gzip,
    Bzip2,
    Passthrough,
}

impl Decompressor {
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(".gz") {
            Decompressor::Gzip
        } else if path.ends_with(".bz2") {
            Decompressor::Bzip2
        } else {
            Decompressor::Passthrough
        }
    }

    /// Remote program that writes the decoded file to stdout.
    pub fn program(self) -> &'static str {
        match self {
            Decompressor::Gzip => "gzip -dc",
            Decompressor::Bzip2 => "bzip2 -dc",
            Decompressor::Passthrough => "cat",
        }
    }
}

/// A capture file already recorded on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub decompressor: Decompressor,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let decompressor = Decompressor::for_path(&path);
        Self { path, decompressor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_selects_decompressor() {
        assert_eq!(RemoteFile::new("/tmp/a.pcap.gz").decompressor, Decompressor::Gzip);
        assert_eq!(RemoteFile::new("/tmp/a.pcap.bz2").decompressor, Decompressor::Bzip2);
        assert_eq!(RemoteFile::new("/tmp/a.pcap").decompressor, Decompressor::Passthrough);
        assert_eq!(RemoteFile::new("/tmp/gz").decompressor, Decompressor::Passthrough);
    }

    #[test]
    fn windows_defaults_to_plink() {
        assert_eq!(Platform::Windows.default_transport(), TransportKind::Plink);
        assert_eq!(Platform::Linux.default_transport(), TransportKind::Ssh);
        assert_eq!(Platform::MacOs.default_transport(), TransportKind::Ssh);
    }
}

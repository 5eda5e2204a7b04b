use super::types::{Platform, TransportKind};
use crate::error_handling::types::ConfigError;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_INTERFACE: &str = "any";
pub const DEFAULT_FILTER: &str = "not port 22";

const MAC_WIRESHARK_PATH: &str = "/Applications/Wireshark.app/Contents/MacOS/Wireshark";
const WIN_WIRESHARK_PATH: &str = r"Wireshark\Wireshark.exe";
const WIN_PLINK_PATH: &str = r"PuTTY\plink.exe";

/// Operator defaults read from a TOML file.
///
/// Every key is optional; command-line values take precedence.
///
/// ```toml
/// user = "capture"
/// port = 2222
/// interface = "eth0"
/// filter = "not port 22 and not arp"
/// display_filter = "http"
/// transport = "ssh"
/// viewer_path = "/usr/local/bin/wireshark"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDefaults {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub interface: Option<String>,
    pub filter: Option<String>,
    pub display_filter: Option<String>,
    pub transport: Option<TransportKind>,
    pub transport_path: Option<PathBuf>,
    pub viewer_path: Option<PathBuf>,
}

impl FileDefaults {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let defaults = Self::from_toml(&content)?;
        debug!("Loaded defaults from {}", path.display());
        Ok(defaults)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

/// Default location of the transport client for `kind` on `platform`.
pub fn transport_path(kind: TransportKind, platform: Platform) -> PathBuf {
    match kind {
        TransportKind::Ssh => PathBuf::from("ssh"),
        TransportKind::Plink => {
            if platform == Platform::Windows {
                if let Some(found) = program_files_candidate(WIN_PLINK_PATH) {
                    return found;
                }
            }
            PathBuf::from("plink")
        }
    }
}

/// Default location of the packet viewer on `platform`.
pub fn viewer_path(platform: Platform) -> PathBuf {
    match platform {
        Platform::MacOs => PathBuf::from(MAC_WIRESHARK_PATH),
        Platform::Windows => program_files_candidate(WIN_WIRESHARK_PATH)
            .unwrap_or_else(|| PathBuf::from("Wireshark.exe")),
        Platform::Linux | Platform::Other => PathBuf::from("wireshark"),
    }
}

/// First existing `relative` path under the 64-bit then 32-bit program directories.
fn program_files_candidate(relative: &str) -> Option<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(|base| PathBuf::from(base).join(relative))
        .find(|candidate| candidate.exists())
}

use std::fmt;

/// Exit status for generic failures and aborted sessions.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for malformed command-line arguments.
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingHost,
    UnresolvableHost(String),
    ForbiddenFilterCharacter(char),
    BadInterface(String),
    BadRemoteFile(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingHost => write!(f, "No host was specified"),
            ConfigError::UnresolvableHost(h) => write!(f, "Cannot resolve host {}", h),
            ConfigError::ForbiddenFilterCharacter(c) => write!(
                f,
                "PCAP filter cannot contain '{}'; semicolon (;), backslash (\\), dash (-), dollar sign ($), backtick (`) and double quotes (\") are not allowed",
                c
            ),
            ConfigError::BadInterface(e) => write!(f, "Interface error: {}", e),
            ConfigError::BadRemoteFile(e) => write!(f, "Remote file error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum TransportError {
    NotFound(String),
    NotFunctional(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound(e) => write!(f, "Required program not found: {}", e),
            TransportError::NotFunctional(e) => write!(f, "Required program is not usable: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug)]
pub enum HandshakeError {
    /// The host key warning persisted after the automatic acceptance.
    HostKeyRejected { stdout: String, stderr: String },
    ConnectionFailed { stdout: String, stderr: String },
    /// The operator interrupted the handshake.
    Aborted,
    /// A previous run of the handshake did not establish trust.
    AlreadyAttempted,
    IoError(std::io::Error),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::HostKeyRejected { .. } => {
                write!(f, "Error occurred while attempting to add the host key")
            }
            HandshakeError::ConnectionFailed { .. } => {
                write!(f, "Error while testing connection to the remote host")
            }
            HandshakeError::Aborted => write!(f, "Host key acceptance aborted by operator"),
            HandshakeError::AlreadyAttempted => {
                write!(f, "Connection test already failed for this session")
            }
            HandshakeError::IoError(e) => write!(f, "Handshake IO error: {}", e),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<std::io::Error> for HandshakeError {
    fn from(err: std::io::Error) -> Self {
        HandshakeError::IoError(err)
    }
}

#[derive(Debug)]
pub enum PipelineError {
    SourceSpawnFailed(std::io::Error),
    SinkSpawnFailed(std::io::Error),
    StreamUnavailable,
    IoError(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::SourceSpawnFailed(e) => {
                write!(f, "Failed to start the transport process: {}", e)
            }
            PipelineError::SinkSpawnFailed(e) => {
                write!(f, "Failed to start the viewer process: {}", e)
            }
            PipelineError::StreamUnavailable => {
                write!(f, "Transport process did not expose its output stream")
            }
            PipelineError::IoError(e) => write!(f, "Pipeline IO error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err)
    }
}

#[derive(Debug)]
pub enum ListError {
    RemoteFailed { status: Option<i32>, stderr: String },
    Interrupted,
    IoError(std::io::Error),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::RemoteFailed { status, .. } => match status {
                Some(code) => write!(f, "Listing interfaces failed with exit status {}", code),
                None => write!(f, "Listing interfaces was terminated by a signal"),
            },
            ListError::Interrupted => write!(f, "Listing interfaces interrupted by operator"),
            ListError::IoError(e) => write!(f, "Interface listing IO error: {}", e),
        }
    }
}

impl std::error::Error for ListError {}

impl From<std::io::Error> for ListError {
    fn from(err: std::io::Error) -> Self {
        ListError::IoError(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    TransportError(TransportError),
    HandshakeError(HandshakeError),
    PipelineError(PipelineError),
    ListError(ListError),
    SignalSetupFailed(std::io::Error),
}

impl ControllerError {
    /// Process exit status reported for this failure.
    ///
    /// An operator abort during the host key countdown is an expected stop.
    pub fn exit_code(&self) -> i32 {
        match self {
            ControllerError::HandshakeError(HandshakeError::Aborted) => 0,
            ControllerError::ListError(ListError::Interrupted) => 0,
            _ => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::TransportError(e) => write!(f, "Transport error: {}", e),
            ControllerError::HandshakeError(e) => write!(f, "Handshake error: {}", e),
            ControllerError::PipelineError(e) => write!(f, "Pipeline error: {}", e),
            ControllerError::ListError(e) => write!(f, "Interface listing error: {}", e),
            ControllerError::SignalSetupFailed(e) => {
                write!(f, "Unable to install signal handlers: {}", e)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<TransportError> for ControllerError {
    fn from(err: TransportError) -> Self {
        ControllerError::TransportError(err)
    }
}

impl From<HandshakeError> for ControllerError {
    fn from(err: HandshakeError) -> Self {
        ControllerError::HandshakeError(err)
    }
}

impl From<PipelineError> for ControllerError {
    fn from(err: PipelineError) -> Self {
        ControllerError::PipelineError(err)
    }
}

impl From<ListError> for ControllerError {
    fn from(err: ListError) -> Self {
        ControllerError::ListError(err)
    }
}

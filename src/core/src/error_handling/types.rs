use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    NotInRange(String),
    InvalidCipher(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::InvalidCipher(e) => write!(f, "Cipher configuration error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Failures while reading or writing a length-prefixed frame.
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    /// The stream ended inside a length field or a payload.
    Truncated { expected: usize, received: usize },
    /// The length field is negative or above the configured maximum.
    InvalidLength(i64),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "Frame IO error: {}", e),
            FrameError::Truncated { expected, received } => write!(
                f,
                "Truncated frame: expected {} bytes, received {}",
                expected, received
            ),
            FrameError::InvalidLength(len) => write!(f, "Invalid frame length: {}", len),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err)
    }
}

#[derive(Debug)]
pub enum CodecError {
    InvalidUtf8(std::string::FromUtf8Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidUtf8(e) => write!(f, "Decoded payload is not UTF-8: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Debug)]
pub enum GateError {
    Codec(CodecError),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Codec(e) => write!(f, "Payload decode failed: {}", e),
        }
    }
}

impl std::error::Error for GateError {}

impl From<CodecError> for GateError {
    fn from(err: CodecError) -> Self {
        GateError::Codec(err)
    }
}

/// Reasons a single client session ends abnormally.
#[derive(Debug)]
pub enum SessionError {
    Frame(FrameError),
    Gate(GateError),
    IdleTimeout(u64),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Frame(e) => write!(f, "Frame error: {}", e),
            SessionError::Gate(e) => write!(f, "Gate error: {}", e),
            SessionError::IdleTimeout(secs) => write!(f, "No frame received within {}s", secs),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        SessionError::Frame(err)
    }
}

impl From<GateError> for SessionError {
    fn from(err: GateError) -> Self {
        SessionError::Gate(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}

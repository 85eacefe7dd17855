use serde::Deserialize;

/// Listening socket and transport limits.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Largest payload accepted in a single frame, in bytes.
    pub max_frame_size: usize,
    /// Seconds a worker waits for the next frame before closing the session. `0` disables it.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 5555,
            max_frame_size: 1024 * 1024,
            idle_timeout_secs: 0,
        }
    }
}

/// Text and routing constants used by the frame gate.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct GatingConfig {
    pub block_notice: String,
    pub default_route: String,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            block_notice: String::from("Traffic blocked due to suspicious activity"),
            default_route: String::from("10.0.0.1"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    #[default]
    Plain,
    Xor,
}

#[derive(Debug, PartialEq, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CipherConfig {
    pub kind: CipherKind,
    pub key: String,
}

/// Read-only status API.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8000,
        }
    }
}

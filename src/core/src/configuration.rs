pub mod config;
pub mod types;

pub use config::Config;
pub use types::{CipherConfig, CipherKind, GatingConfig, ServerConfig, WebConfig};

//! Payload codecs applied between the framing layer and the gate.
//!
//! The gate only ever sees decoded text; which codec produced it is a configuration
//! choice.

use std::sync::Arc;

use crate::configuration::types::{CipherConfig, CipherKind};
use crate::error_handling::types::{CodecError, ConfigError};

pub trait PayloadCipher: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError>;

    fn encode(&self, text: &str) -> Vec<u8>;
}

/// Payloads travel as raw UTF-8.
#[derive(Debug, Default, Clone)]
pub struct PlainCipher;

impl PayloadCipher for PlainCipher {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(CodecError::InvalidUtf8)
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }
}

/// Repeating-key XOR over UTF-8 text. Obfuscation only.
#[derive(Debug, Clone)]
pub struct XorCipher {
    key: Vec<u8>,
}

impl XorCipher {
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::InvalidCipher(
                "xor cipher requires a non-empty key".to_string(),
            ));
        }
        Ok(Self { key })
    }

    fn apply(&self, bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl PayloadCipher for XorCipher {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(self.apply(bytes)).map_err(CodecError::InvalidUtf8)
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        self.apply(text.as_bytes())
    }
}

/// Builds the codec selected by the `[cipher]` configuration table.
pub fn cipher_from_config(config: &CipherConfig) -> Result<Arc<dyn PayloadCipher>, ConfigError> {
    match config.kind {
        CipherKind::Plain => Ok(Arc::new(PlainCipher)),
        CipherKind::Xor => Ok(Arc::new(XorCipher::new(config.key.as_bytes())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_cipher_passes_text_through() {
        let cipher = PlainCipher;
        assert_eq!(cipher.encode("10.0.0.5:22"), b"10.0.0.5:22".to_vec());
        assert_eq!(cipher.decode(b"hello").unwrap(), "hello");
    }

    #[test]
    fn plain_cipher_rejects_invalid_utf8() {
        let cipher = PlainCipher;
        assert!(matches!(
            cipher.decode(&[0xff, 0xfe, 0x00]),
            Err(CodecError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn xor_cipher_decodes_what_it_encodes() {
        let cipher = XorCipher::new("k3y").unwrap();
        let encoded = cipher.encode("route me via 10.0.0.5:443");
        assert_ne!(encoded, b"route me via 10.0.0.5:443".to_vec());
        assert_eq!(cipher.decode(&encoded).unwrap(), "route me via 10.0.0.5:443");
    }

    #[test]
    fn xor_cipher_requires_key() {
        assert!(matches!(
            XorCipher::new(""),
            Err(ConfigError::InvalidCipher(_))
        ));
    }

    #[test]
    fn config_selects_cipher() {
        let plain = cipher_from_config(&CipherConfig::default()).unwrap();
        assert_eq!(plain.name(), "plain");

        let xor = cipher_from_config(&CipherConfig {
            kind: CipherKind::Xor,
            key: "secret".to_string(),
        })
        .unwrap();
        assert_eq!(xor.name(), "xor");

        assert!(cipher_from_config(&CipherConfig {
            kind: CipherKind::Xor,
            key: String::new(),
        })
        .is_err());
    }
}

//! TCP transport of the relay: framing, payload codecs and the connection listener.

pub mod cipher;
pub mod framing;
pub mod network_listener;

pub use cipher::{cipher_from_config, PayloadCipher, PlainCipher, XorCipher};
pub use framing::FrameCodec;
pub use network_listener::{handle_connection, NetworkListener};

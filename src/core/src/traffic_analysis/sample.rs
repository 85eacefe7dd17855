use chrono::{DateTime, Utc};
use serde::Serialize;

/// One observed unit of traffic for a client.
///
/// Samples are never mutated after construction and are shared between the history and
/// any snapshot through `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample {
    observed_at: DateTime<Utc>,
    byte_size: usize,
    source_address: String,
    destination_address: String,
    port: i64,
}

impl TrafficSample {
    /// Builds a sample stamped with the current wall-clock time.
    pub fn new(
        byte_size: usize,
        source_address: impl Into<String>,
        destination_address: impl Into<String>,
        port: i64,
    ) -> Self {
        Self::observed_at(
            Utc::now(),
            byte_size,
            source_address,
            destination_address,
            port,
        )
    }

    pub fn observed_at(
        observed_at: DateTime<Utc>,
        byte_size: usize,
        source_address: impl Into<String>,
        destination_address: impl Into<String>,
        port: i64,
    ) -> Self {
        Self {
            observed_at,
            byte_size,
            source_address: source_address.into(),
            destination_address: destination_address.into(),
            port,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    pub fn port(&self) -> i64 {
        self.port
    }
}

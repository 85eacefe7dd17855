use std::sync::LazyLock;

use regex::Regex;

// The address must not be preceded by a digit or a dot, so `1234.5.6.7` is not read as
// `234.5.6.7`.
static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.])([0-9]{1,3}(?:\.[0-9]{1,3}){3}):([0-9]+)")
        .expect("marker pattern compiles")
});

/// `IPv4:port` reference found inside a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub address: String,
    /// Reported as-is; values outside the TCP port range are kept.
    pub port: i64,
}

/// Returns the first `IPv4:port` marker in `text`.
///
/// Octets are matched textually and not range-checked. A port too large for `i64` is
/// treated as no marker.
pub fn parse_marker(text: &str) -> Option<Marker> {
    let captures = MARKER_PATTERN.captures(text)?;
    let address = captures.get(1)?.as_str().to_string();
    let port = captures.get(2)?.as_str().parse::<i64>().ok()?;
    Some(Marker { address, port })
}

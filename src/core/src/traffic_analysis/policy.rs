use serde::Deserialize;

/// Thresholds and weights driving the risk heuristics and the block decision.
///
/// The defaults are the values the relay has always shipped with; a `[risk]` table in the
/// configuration file may override any of them.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Samples retained per client before the oldest is evicted.
    pub history_capacity: usize,
    /// Scores strictly above this value gate the client's frames.
    pub risk_threshold: f64,
    /// Mean payload size (bytes) above which the payload heuristic fires.
    pub mtu_bytes: u64,
    /// Trailing window, measured from the scoring time, for the burst heuristic.
    pub burst_window_secs: u64,
    /// Samples inside the window above which the burst heuristic fires.
    pub burst_limit: usize,
    /// Ports strictly below this value are treated as suspicious.
    pub privileged_port_ceiling: i64,
    /// Additional ports treated as suspicious regardless of the ceiling.
    pub suspicious_ports: Vec<i64>,
    pub payload_weight: f64,
    pub burst_weight: f64,
    pub port_weight: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            risk_threshold: 0.7,
            mtu_bytes: 1500,
            burst_window_secs: 60,
            burst_limit: 100,
            privileged_port_ceiling: 1024,
            suspicious_ports: vec![22, 3389],
            payload_weight: 0.3,
            burst_weight: 0.2,
            port_weight: 0.3,
        }
    }
}

impl RiskPolicy {
    pub fn is_suspicious_port(&self, port: i64) -> bool {
        port < self.privileged_port_ceiling || self.suspicious_ports.contains(&port)
    }

    /// Strict comparison: a score equal to the threshold is still allowed.
    pub fn exceeds_threshold(&self, score: f64) -> bool {
        score > self.risk_threshold
    }
}

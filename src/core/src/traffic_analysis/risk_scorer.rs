//! Risk scoring over a client's retained traffic history.
//!
//! The score is rebuilt from every retained sample on each call; nothing decays. A single
//! suspicious-port sample keeps contributing until the bounded history evicts it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::policy::RiskPolicy;
use super::sample::TrafficSample;

/// Heuristic that contributed to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskFactor {
    /// Mean payload size over the whole history is above the MTU.
    OversizedPayloads,
    /// Too many samples inside the trailing burst window.
    TrafficBurst,
    /// At least one sample targeted a privileged or remote-access port.
    SuspiciousPorts,
}

/// Score plus the raw figures each heuristic looked at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub mean_payload_size: f64,
    pub recent_samples: usize,
    pub suspicious_port_samples: usize,
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    fn empty() -> Self {
        Self {
            score: 0.0,
            mean_payload_size: 0.0,
            recent_samples: 0,
            suspicious_port_samples: 0,
            factors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    policy: RiskPolicy,
}

impl RiskScorer {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn score<'a, I>(&self, samples: I, now: DateTime<Utc>) -> f64
    where
        I: IntoIterator<Item = &'a TrafficSample>,
    {
        self.assess(samples, now).score
    }

    /// Evaluates the three heuristics in a single pass, relative to `now`.
    pub fn assess<'a, I>(&self, samples: I, now: DateTime<Utc>) -> RiskAssessment
    where
        I: IntoIterator<Item = &'a TrafficSample>,
    {
        let window = Duration::seconds(self.policy.burst_window_secs as i64);

        let mut count = 0usize;
        let mut total_bytes = 0u128;
        let mut recent = 0usize;
        let mut suspicious = 0usize;

        for sample in samples {
            count += 1;
            total_bytes += sample.byte_size() as u128;
            if now.signed_duration_since(sample.timestamp()) < window {
                recent += 1;
            }
            if self.policy.is_suspicious_port(sample.port()) {
                suspicious += 1;
            }
        }

        if count == 0 {
            return RiskAssessment::empty();
        }

        let mean = total_bytes as f64 / count as f64;
        let mut score = 0.0;
        let mut factors = Vec::new();

        if mean > self.policy.mtu_bytes as f64 {
            score += self.policy.payload_weight;
            factors.push(RiskFactor::OversizedPayloads);
        }
        if recent > self.policy.burst_limit {
            score += self.policy.burst_weight;
            factors.push(RiskFactor::TrafficBurst);
        }
        if suspicious > 0 {
            score += self.policy.port_weight;
            factors.push(RiskFactor::SuspiciousPorts);
        }

        RiskAssessment {
            score: f64::min(score, 1.0),
            mean_payload_size: mean,
            recent_samples: recent,
            suspicious_port_samples: suspicious,
            factors,
        }
    }
}

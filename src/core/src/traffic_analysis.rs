//! Per-client traffic observation and risk scoring.
//!
//! - [`TrafficSample`]: one immutable observation (size, endpoints, port, time).
//! - [`TrafficHistory`]: bounded FIFO buffer of samples for one client.
//! - [`RiskScorer`]: pure scoring of a history against a [`RiskPolicy`].

pub mod history;
pub mod policy;
pub mod risk_scorer;
pub mod sample;

pub use history::TrafficHistory;
pub use policy::RiskPolicy;
pub use risk_scorer::{RiskAssessment, RiskFactor, RiskScorer};
pub use sample::TrafficSample;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::traffic_analysis::TrafficHistory;

/// Registry entry for one connected client.
///
/// The history and the score live in the same value so they are inserted and removed
/// together.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    pub history: TrafficHistory,
    /// Absent until the first sample has been scored.
    pub risk_score: Option<f64>,
    pub frames_seen: u64,
    pub frames_blocked: u64,
}

impl SessionEntry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            history: TrafficHistory::with_capacity(history_capacity),
            risk_score: None,
            frames_seen: 0,
            frames_blocked: 0,
        }
    }
}

/// Read-only view of a session, served by the status API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub client_id: String,
    pub session_id: Uuid,
    pub connected_at: DateTime<Utc>,
    pub samples: usize,
    pub risk_score: Option<f64>,
    pub blocked: bool,
    pub frames_seen: u64,
    pub frames_blocked: u64,
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, info};

use crate::session_management::session::{SessionEntry, SessionSummary};
use crate::traffic_analysis::{RiskAssessment, RiskPolicy, RiskScorer, TrafficSample};

/// Concurrent registry of connected clients, keyed by client identifier (`address:port`).
///
/// A single structural lock guards the map. Every operation finishes without awaiting and
/// touches at most one entry's bounded history, so holding the lock across an append and
/// the rescore that follows is cheap and keeps readers from seeing a torn history.
///
/// # Fields Overview
///
/// - `sessions`: client identifier to session entry (history, score, counters)
/// - `scorer`: risk scorer shared by every session, carrying the active [`RiskPolicy`]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    scorer: RiskScorer,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RiskPolicy::default())
    }
}

impl SessionRegistry {
    pub fn new(policy: RiskPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            scorer: RiskScorer::new(policy),
        }
    }

    pub fn shared(policy: RiskPolicy) -> Arc<Self> {
        Arc::new(Self::new(policy))
    }

    pub fn policy(&self) -> &RiskPolicy {
        self.scorer.policy()
    }

    // Entries are always left consistent, so a panic elsewhere never invalidates the map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `client_id`. Returns `false` and leaves the existing entry untouched if
    /// the identifier is already known.
    pub fn create_session(&self, client_id: &str) -> bool {
        let mut sessions = self.lock();
        if sessions.contains_key(client_id) {
            debug!("[{}] session already registered", client_id);
            return false;
        }
        let entry = SessionEntry::new(self.policy().history_capacity);
        info!("[{}] session {} registered", client_id, entry.id);
        sessions.insert(client_id.to_string(), entry);
        true
    }

    /// Appends `sample` to the client's history, rescores it and stores the new score.
    pub fn record_and_score(&self, client_id: &str, sample: TrafficSample) -> f64 {
        self.record_and_assess(client_id, sample).score
    }

    /// Same as [`record_and_score`](Self::record_and_score) but returns the full breakdown.
    ///
    /// An unknown client gets a fresh entry first.
    pub fn record_and_assess(&self, client_id: &str, sample: TrafficSample) -> RiskAssessment {
        let mut sessions = self.lock();
        let entry = sessions.entry(client_id.to_string()).or_insert_with(|| {
            debug!("[{}] sample for unregistered client, creating entry", client_id);
            SessionEntry::new(self.scorer.policy().history_capacity)
        });

        entry.history.append(sample);
        let assessment = self.scorer.assess(entry.history.iter(), Utc::now());
        entry.risk_score = Some(assessment.score);
        assessment
    }

    pub fn current_score(&self, client_id: &str) -> Option<f64> {
        self.lock().get(client_id).and_then(|entry| entry.risk_score)
    }

    /// True when the stored score is strictly above the risk threshold. Unknown clients and
    /// clients without a score are never blocked.
    pub fn is_blocked(&self, client_id: &str) -> bool {
        self.current_score(client_id)
            .map(|score| self.policy().exceeds_threshold(score))
            .unwrap_or(false)
    }

    /// Counts a processed frame for status reporting.
    pub fn note_frame(&self, client_id: &str, blocked: bool) {
        if let Some(entry) = self.lock().get_mut(client_id) {
            entry.frames_seen += 1;
            if blocked {
                entry.frames_blocked += 1;
            }
        }
    }

    /// Removes the client's history and score together. Returns `false` if nothing was
    /// registered.
    pub fn destroy_session(&self, client_id: &str) -> bool {
        match self.lock().remove(client_id) {
            Some(entry) => {
                info!(
                    "[{}] session {} removed after {} frames ({} blocked)",
                    client_id, entry.id, entry.frames_seen, entry.frames_blocked
                );
                true
            }
            None => false,
        }
    }

    pub fn history_len(&self, client_id: &str) -> Option<usize> {
        self.lock().get(client_id).map(|entry| entry.history.len())
    }

    pub fn history_snapshot(&self, client_id: &str) -> Option<Vec<Arc<TrafficSample>>> {
        self.lock()
            .get(client_id)
            .map(|entry| entry.history.snapshot())
    }

    pub fn active_session_count(&self) -> usize {
        self.lock().len()
    }

    pub fn session_summary(&self, client_id: &str) -> Option<SessionSummary> {
        self.lock()
            .get(client_id)
            .map(|entry| self.summarize(client_id, entry))
    }

    /// Summaries of every active session, ordered by client identifier.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let mut list: Vec<SessionSummary> = self
            .lock()
            .iter()
            .map(|(client_id, entry)| self.summarize(client_id, entry))
            .collect();
        list.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        list
    }

    fn summarize(&self, client_id: &str, entry: &SessionEntry) -> SessionSummary {
        SessionSummary {
            client_id: client_id.to_string(),
            session_id: entry.id,
            connected_at: entry.connected_at,
            samples: entry.history.len(),
            risk_score: entry.risk_score,
            blocked: entry
                .risk_score
                .map(|score| self.policy().exceeds_threshold(score))
                .unwrap_or(false),
            frames_seen: entry.frames_seen,
            frames_blocked: entry.frames_blocked,
        }
    }
}

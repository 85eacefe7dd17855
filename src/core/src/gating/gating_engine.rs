//! Per-frame allow/block decisions.
//!
//! [`GatingEngine`] is the only surface the connection shell talks to. It is called at three
//! points of a connection's life:
//!
//! ```text
//! accept ──▶ on_client_connected
//!   frame ──▶ on_frame_received ──▶ GateDecision { Allow | Block, response_text }
//! close  ──▶ on_client_disconnected
//! ```
//!
//! Blocking is re-evaluated on every frame; a blocked client keeps its connection and is
//! let through again as soon as its score drops back under the threshold.

use std::sync::Arc;

use log::{debug, trace, warn};

use super::decision::GateDecision;
use super::marker_parser::parse_marker;
use super::processor::{EchoProcessor, FrameProcessor};
use super::routing::{FixedRoute, RouteSelector};
use crate::configuration::types::GatingConfig;
use crate::error_handling::types::GateError;
use crate::network::cipher::PayloadCipher;
use crate::session_management::SessionRegistry;
use crate::traffic_analysis::TrafficSample;

pub struct GatingEngine {
    registry: Arc<SessionRegistry>,
    cipher: Arc<dyn PayloadCipher>,
    router: Arc<dyn RouteSelector>,
    processor: Arc<dyn FrameProcessor>,
    block_notice: String,
}

impl GatingEngine {
    /// Creates an engine with the fixed default route, the echo processor and the default
    /// block notice.
    pub fn new(registry: Arc<SessionRegistry>, cipher: Arc<dyn PayloadCipher>) -> Self {
        let defaults = GatingConfig::default();
        Self {
            registry,
            cipher,
            router: Arc::new(FixedRoute::new(defaults.default_route)),
            processor: Arc::new(EchoProcessor),
            block_notice: defaults.block_notice,
        }
    }

    pub fn from_config(
        registry: Arc<SessionRegistry>,
        cipher: Arc<dyn PayloadCipher>,
        config: &GatingConfig,
    ) -> Self {
        Self::new(registry, cipher)
            .with_router(Arc::new(FixedRoute::new(config.default_route.clone())))
            .with_block_notice(config.block_notice.clone())
    }

    pub fn with_router(mut self, router: Arc<dyn RouteSelector>) -> Self {
        self.router = router;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn FrameProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_block_notice(mut self, notice: impl Into<String>) -> Self {
        self.block_notice = notice.into();
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn on_client_connected(&self, client_id: &str) {
        self.registry.create_session(client_id);
    }

    /// Decodes `raw_payload`, records a traffic sample if the payload carries an
    /// `IPv4:port` marker, then allows or blocks the frame on the client's current score.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Codec`] if the payload cannot be decoded. The caller should end
    /// the session.
    pub fn on_frame_received(
        &self,
        client_id: &str,
        raw_payload: &[u8],
    ) -> Result<GateDecision, GateError> {
        let text = self.cipher.decode(raw_payload)?;

        let source = match parse_marker(&text) {
            Some(marker) => {
                let sample =
                    TrafficSample::new(text.len(), marker.address.as_str(), client_id, marker.port);
                let assessment = self.registry.record_and_assess(client_id, sample);
                if self.registry.policy().exceeds_threshold(assessment.score) {
                    warn!(
                        "[{}] suspicious activity detected, risk score {:.2} ({:?})",
                        client_id, assessment.score, assessment.factors
                    );
                }
                marker.address
            }
            None => {
                trace!("[{}] no address marker in frame, sample skipped", client_id);
                String::new()
            }
        };

        let score = self.registry.current_score(client_id);
        if self.registry.is_blocked(client_id) {
            self.registry.note_frame(client_id, true);
            debug!("[{}] frame blocked ({} bytes)", client_id, raw_payload.len());
            return Ok(GateDecision::block(&self.block_notice, score));
        }

        let hop = self.router.next_hop(&source, client_id);
        let annotated = format!("[route:{}] {}", hop, text);
        let response = self.processor.process(&annotated);
        self.registry.note_frame(client_id, false);
        trace!("[{}] frame allowed via {}", client_id, hop);
        Ok(GateDecision::allow(response, score))
    }

    pub fn on_client_disconnected(&self, client_id: &str) {
        self.registry.destroy_session(client_id);
    }

    /// Encodes a decision's response text for the wire.
    pub fn encode_response(&self, decision: &GateDecision) -> Vec<u8> {
        self.cipher.encode(&decision.response_text)
    }
}

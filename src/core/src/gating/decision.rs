use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateAction {
    /// The frame was processed and the response carries the processor output.
    Allow,
    /// The frame was dropped and the response is the block notice.
    Block,
}

/// Outcome of gating one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDecision {
    pub action: GateAction,
    pub response_text: String,
    /// Client score after this frame, if it has one yet.
    pub score: Option<f64>,
}

impl GateDecision {
    pub fn allow(response_text: String, score: Option<f64>) -> Self {
        Self {
            action: GateAction::Allow,
            response_text,
            score,
        }
    }

    pub fn block(notice: &str, score: Option<f64>) -> Self {
        Self {
            action: GateAction::Block,
            response_text: notice.to_string(),
            score,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.action == GateAction::Block
    }
}

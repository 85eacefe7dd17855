use serde::Serialize;

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Liveness payload served on `GET /`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub active_sessions: usize,
}

use std::sync::Arc;

use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ApiError, StatusResponse};
use crate::session_management::SessionRegistry;

/// GET /
pub fn status_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).map(move || status(&registry))
}

/// GET /sessions
pub fn list_sessions_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || list_sessions(&registry))
}

/// GET /sessions/:client_id
pub fn session_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("sessions" / String)
        .and(warp::get())
        .map(move |client_id: String| session(&registry, &client_id))
}

pub fn routes(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    status_route(registry.clone())
        .or(list_sessions_route(registry.clone()))
        .or(session_route(registry))
}

pub(crate) fn status(registry: &SessionRegistry) -> reply::Json {
    reply::json(&StatusResponse {
        status: "running",
        active_sessions: registry.active_session_count(),
    })
}

pub(crate) fn list_sessions(registry: &SessionRegistry) -> reply::Json {
    reply::json(&registry.summaries())
}

/// Path segments arrive percent-encoded (`10.0.0.1%3A5000`, `%5B%3A%3A1%5D%3A5000`).
pub(crate) fn session(registry: &SessionRegistry, raw_client_id: &str) -> reply::Response {
    let client_id = match urlencoding::decode(raw_client_id) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            return error_reply(
                format!("Client id {} is not valid UTF-8", raw_client_id),
                StatusCode::BAD_REQUEST,
            );
        }
    };
    match registry.session_summary(&client_id) {
        Some(summary) => reply::json(&summary).into_response(),
        None => error_reply(
            format!("No active session for {}", client_id),
            StatusCode::NOT_FOUND,
        ),
    }
}

fn error_reply(message: String, status: StatusCode) -> reply::Response {
    reply::with_status(reply::json(&ApiError { message }), status).into_response()
}

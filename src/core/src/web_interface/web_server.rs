use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use super::routes::routes;
use crate::error_handling::types::NetworkError;
use crate::session_management::SessionRegistry;

/// Read-only HTTP status API over the live session registry.
///
/// The socket is bound in [`WebServer::bind`] so an occupied port surfaces as an error
/// instead of a panic inside the serving task.
pub struct WebServer {
    registry: Arc<SessionRegistry>,
    listener: TcpListener,
}

impl WebServer {
    pub async fn bind(
        registry: Arc<SessionRegistry>,
        addr: SocketAddr,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Unable to bind status API on {}: {}", addr, e);
            NetworkError::BindError(e)
        })?;
        Ok(Self { registry, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::BindError)
    }

    /// Serves the status API until the task is dropped.
    pub async fn serve(self) {
        if let Ok(addr) = self.local_addr() {
            info!("Status API listening on http://{}", addr);
        }
        warp::serve(routes(self.registry))
            .incoming(self.listener)
            .run()
            .await;
    }
}

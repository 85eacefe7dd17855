use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::gating::GatingEngine;
use crate::network::cipher::{cipher_from_config, PayloadCipher};
use crate::network::framing::FrameCodec;
use crate::network::network_listener::NetworkListener;
use crate::session_management::SessionRegistry;
use crate::web_interface::WebServer;

/// Wires the registry, gate, listener and status API together for one process lifetime.
pub struct Controller {
    pub config: Config,
    registry: Arc<SessionRegistry>,
    cipher: Arc<dyn PayloadCipher>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        let cipher = cipher_from_config(&config.cipher)?;
        let registry = SessionRegistry::shared(config.risk.clone());
        info!(
            "Controller ready (cipher: {}, risk threshold: {}, history capacity: {})",
            cipher.name(),
            config.risk.risk_threshold,
            config.risk.history_capacity
        );
        Ok(Self {
            config,
            registry,
            cipher,
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs until Ctrl-C.
    pub async fn run(&self) -> Result<(), ControllerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the relay (and the status API if enabled) until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()>,
    {
        let engine = Arc::new(GatingEngine::from_config(
            Arc::clone(&self.registry),
            Arc::clone(&self.cipher),
            &self.config.gating,
        ));

        let addr = self.config.listen_addr()?;
        let listener = NetworkListener::bind(
            &addr.to_string(),
            engine,
            FrameCodec::new(self.config.server.max_frame_size),
            self.config.idle_timeout(),
        )
        .await?;

        let web_task = if self.config.web.enabled {
            self.spawn_status_api().await
        } else {
            None
        };

        let result = listener.start_listening(shutdown).await;

        if let Some(task) = web_task {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Status API task panicked: {}", e);
                }
            }
        }
        let remaining = self.registry.active_session_count();
        if remaining > 0 {
            warn!("{} session(s) still registered at shutdown", remaining);
        }
        info!("Relay stopped");

        result.map_err(ControllerError::from)
    }

    // The relay keeps running without the status API when its port cannot be bound.
    async fn spawn_status_api(&self) -> Option<JoinHandle<()>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.web.port));
        match WebServer::bind(Arc::clone(&self.registry), addr).await {
            Ok(server) => Some(tokio::spawn(server.serve())),
            Err(e) => {
                warn!("Status API disabled: {}", e);
                None
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}, running until killed", e);
        std::future::pending::<()>().await;
    }
}

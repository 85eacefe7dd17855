//! # Network Listener Module
//!
//! Accepts TCP connections and runs one worker task per client. Each worker reads
//! length-prefixed frames, hands them to the [`GatingEngine`] and writes the encoded
//! response back on the same connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Incoming        │───▶│ NetworkListener  │───▶│ GatingEngine    │
//! │ Connections     │    │                  │    │ (shared Arc)    │
//! └─────────────────┘    │ - task per client│    └────────┬────────┘
//!                        │ - frame codec    │             ▼
//!                        └──────────────────┘    ┌─────────────────┐
//!                                                │ SessionRegistry │
//!                                                └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use riskgate::gating::GatingEngine;
//! use riskgate::network::cipher::PlainCipher;
//! use riskgate::network::framing::FrameCodec;
//! use riskgate::network::network_listener::NetworkListener;
//! use riskgate::session_management::SessionRegistry;
//! use riskgate::error_handling::types::NetworkError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NetworkError> {
//!     let registry = Arc::new(SessionRegistry::default());
//!     let engine = Arc::new(GatingEngine::new(registry, Arc::new(PlainCipher)));
//!
//!     let listener =
//!         NetworkListener::bind("0.0.0.0:5555", engine, FrameCodec::new(1 << 20), None).await?;
//!     listener.start_listening(std::future::pending()).await
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};

use super::framing::FrameCodec;
use crate::error_handling::types::{NetworkError, SessionError};
use crate::gating::GatingEngine;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP front of the relay.
///
/// `NetworkListener` is responsible for:
/// - Binding the listening socket
/// - Spawning one worker per accepted connection
/// - Aborting the remaining workers when shutdown is requested
pub struct NetworkListener {
    listener: TcpListener,
    engine: Arc<GatingEngine>,
    codec: FrameCodec,
    idle_timeout: Option<Duration>,
}

impl NetworkListener {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindError`] if the address cannot be bound (in use, not
    /// local, privileged port without permission).
    pub async fn bind(
        addr: &str,
        engine: Arc<GatingEngine>,
        codec: FrameCodec,
        idle_timeout: Option<Duration>,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!("Unable to bind {}: {}", addr, e);
            NetworkError::BindError(e)
        })?;
        Ok(Self {
            listener,
            engine,
            codec,
            idle_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::BindError)
    }

    /// Accepts connections until `shutdown` resolves, then aborts every worker still
    /// running. Aborted workers still release their sessions.
    pub async fn start_listening<F>(&self, shutdown: F) -> Result<(), NetworkError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut workers = JoinSet::new();

        if let Ok(addr) = self.local_addr() {
            info!("Relay listening on {}", addr);
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing {} connection(s)", workers.len());
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let client_id = peer.to_string();
                        info!("[{}] client connected", client_id);
                        let engine = Arc::clone(&self.engine);
                        let codec = self.codec;
                        let idle_timeout = self.idle_timeout;
                        workers.spawn(async move {
                            let result =
                                handle_connection(stream, &client_id, engine, codec, idle_timeout)
                                    .await;
                            if let Err(e) = result {
                                warn!("[{}] session closed: {}", client_id, e);
                            }
                        });
                    }
                    Err(e) => back_off_after_accept_error(&e).await,
                },
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Connection worker panicked: {}", e);
                        }
                    }
                }
            }
        }

        workers.shutdown().await;
        Ok(())
    }
}

// Errors such as EMFILE persist until a descriptor is freed; retrying at once would spin.
async fn back_off_after_accept_error(err: &std::io::Error) {
    warn!("Failed to accept connection: {}, retrying in {:?}", err, ACCEPT_BACKOFF);
    sleep(ACCEPT_BACKOFF).await;
}

// Releases the client's registry entry however the worker exits.
struct SessionGuard<'a> {
    engine: &'a GatingEngine,
    client_id: &'a str,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.engine.on_client_disconnected(self.client_id);
    }
}

/// Runs one client session over `stream` until end-of-stream or the first failure.
///
/// The client's registry entry is created on entry and removed on every exit path,
/// including cancellation of the surrounding task.
///
/// # Errors
///
/// - [`SessionError::Frame`] for corrupt, truncated or oversized frames and I/O failures
/// - [`SessionError::Gate`] when a payload cannot be decoded
/// - [`SessionError::IdleTimeout`] when no frame arrives within `idle_timeout`
pub async fn handle_connection<S>(
    mut stream: S,
    client_id: &str,
    engine: Arc<GatingEngine>,
    codec: FrameCodec,
    idle_timeout: Option<Duration>,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    engine.on_client_connected(client_id);
    let _guard = SessionGuard {
        engine: &engine,
        client_id,
    };

    loop {
        let frame = match idle_timeout {
            Some(limit) => timeout(limit, codec.read_frame(&mut stream))
                .await
                .map_err(|_| SessionError::IdleTimeout(limit.as_secs()))??,
            None => codec.read_frame(&mut stream).await?,
        };

        let Some(payload) = frame else {
            info!("[{}] client disconnected", client_id);
            return Ok(());
        };

        let decision = engine.on_frame_received(client_id, &payload)?;
        debug!(
            "[{}] {:?} frame of {} bytes",
            client_id,
            decision.action,
            payload.len()
        );
        let response = engine.encode_response(&decision);
        codec.write_frame(&mut stream, &response).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::FrameError;
    use crate::network::cipher::PlainCipher;
    use crate::session_management::SessionRegistry;
    use crate::traffic_analysis::RiskPolicy;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    const CLIENT: &str = "127.0.0.1:40000";

    fn engine_with(policy: RiskPolicy) -> Arc<GatingEngine> {
        Arc::new(GatingEngine::new(
            SessionRegistry::shared(policy),
            Arc::new(PlainCipher),
        ))
    }

    async fn send(stream: &mut DuplexStream, payload: &[u8]) {
        FrameCodec::new(1024)
            .write_frame(stream, payload)
            .await
            .unwrap();
    }

    async fn receive(stream: &mut DuplexStream) -> String {
        let payload = FrameCodec::new(1024)
            .read_frame(stream)
            .await
            .unwrap()
            .expect("response frame");
        String::from_utf8(payload).unwrap()
    }

    #[tokio::test]
    async fn echoes_and_cleans_up_on_eof() {
        let engine = engine_with(RiskPolicy::default());
        let (mut client, server) = duplex(4096);
        let worker = tokio::spawn(handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        ));

        send(&mut client, b"hello 10.0.0.5:8080").await;
        assert_eq!(
            receive(&mut client).await,
            "Processed: [route:10.0.0.1] hello 10.0.0.5:8080"
        );
        assert_eq!(engine.registry().history_len(CLIENT), Some(1));

        drop(client);
        worker.await.unwrap().unwrap();
        assert_eq!(engine.registry().active_session_count(), 0);
    }

    #[tokio::test]
    async fn blocked_frames_keep_connection_open() {
        let engine = engine_with(RiskPolicy {
            risk_threshold: 0.1,
            ..RiskPolicy::default()
        });
        let (mut client, server) = duplex(4096);
        let worker = tokio::spawn(handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        ));

        send(&mut client, b"10.0.0.5:22").await;
        assert_eq!(
            receive(&mut client).await,
            "Traffic blocked due to suspicious activity"
        );
        send(&mut client, b"still here").await;
        assert_eq!(
            receive(&mut client).await,
            "Traffic blocked due to suspicious activity"
        );

        drop(client);
        worker.await.unwrap().unwrap();
        assert_eq!(engine.registry().current_score(CLIENT), None);
    }

    #[tokio::test]
    async fn corrupt_frame_ends_session() {
        let engine = engine_with(RiskPolicy::default());
        let (mut client, server) = duplex(4096);
        let worker = tokio::spawn(handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        ));

        client.write_all(&(-7i32).to_be_bytes()).await.unwrap();
        let result = worker.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Frame(FrameError::InvalidLength(-7)))
        ));
        assert_eq!(engine.registry().active_session_count(), 0);

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn undecodable_payload_ends_session() {
        let engine = engine_with(RiskPolicy::default());
        let (mut client, server) = duplex(4096);
        let worker = tokio::spawn(handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        ));

        send(&mut client, &[0xff, 0xff]).await;
        assert!(matches!(worker.await.unwrap(), Err(SessionError::Gate(_))));
        assert_eq!(engine.registry().active_session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_client_times_out() {
        let engine = engine_with(RiskPolicy::default());
        let (_client, server) = duplex(4096);

        let result = handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            Some(Duration::from_secs(30)),
        )
        .await;

        assert!(matches!(result, Err(SessionError::IdleTimeout(30))));
        assert_eq!(engine.registry().active_session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn accept_error_pauses_before_retry() {
        let start = tokio::time::Instant::now();
        back_off_after_accept_error(&std::io::Error::from_raw_os_error(24)).await;
        assert!(start.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn aborted_worker_releases_session() {
        let engine = engine_with(RiskPolicy::default());
        let (_client, server) = duplex(4096);
        let worker = tokio::spawn(handle_connection(
            server,
            CLIENT,
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        ));

        while engine.registry().active_session_count() == 0 {
            tokio::task::yield_now().await;
        }
        worker.abort();
        assert!(worker.await.unwrap_err().is_cancelled());
        assert_eq!(engine.registry().active_session_count(), 0);
    }

    #[tokio::test]
    async fn listener_serves_tcp_clients_until_shutdown() {
        let engine = engine_with(RiskPolicy::default());
        let listener = NetworkListener::bind(
            "127.0.0.1:0",
            Arc::clone(&engine),
            FrameCodec::new(1024),
            None,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            listener
                .start_listening(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let codec = FrameCodec::new(1024);
        codec.write_frame(&mut stream, b"10.0.0.5:443").await.unwrap();
        let response = codec.read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(response, b"Processed: [route:10.0.0.1] 10.0.0.5:443".to_vec());
        assert_eq!(engine.registry().active_session_count(), 1);

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(engine.registry().active_session_count(), 0);
    }
}

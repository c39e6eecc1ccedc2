//! Routing hub entrypoint
//!
//! Admits sessions, announces them, runs their dispatchers and guarantees
//! each one is unregistered exactly once however it ends.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::Stream;

use super::config::HubConfig;
use crate::error::{ProtocolError, Result};
use crate::protocol::{Request, Response};
use crate::registry::{
    ClientRegistry, RegistryConfig, RegistryError, ResponseSink, SessionId, SinkError, Target,
};
use crate::session::{SessionContext, SessionDispatcher};
use crate::stats::HubStats;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Targets that accepted the response
    pub delivered: usize,
    /// Targets whose delivery failed or timed out
    pub failed: usize,
}

/// Deliver `response` to every target concurrently
///
/// A failing target is logged and counted; it never stops delivery to the
/// others.
pub async fn send_all(
    targets: &[Target],
    response: &Response,
    timeout: Option<Duration>,
) -> FanoutReport {
    let results = join_all(
        targets
            .iter()
            .map(|target| deliver(target, response.clone(), timeout)),
    )
    .await;

    let mut report = FanoutReport::default();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(session_id = %target.id, error = %e, "Delivery failed");
            }
        }
    }
    report
}

async fn deliver(
    target: &Target,
    response: Response,
    timeout: Option<Duration>,
) -> std::result::Result<(), SinkError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, target.sink.send(response))
            .await
            .unwrap_or(Err(SinkError::TimedOut)),
        None => target.sink.send(response).await,
    }
}

/// Keeps a session's registration balanced
///
/// `release` unregisters on the normal path. If the owning future is dropped
/// first (task aborted, runtime shutdown), `Drop` spawns the unregister.
pub struct SessionGuard {
    registry: Arc<ClientRegistry>,
    stats: Arc<HubStats>,
    id: SessionId,
    armed: bool,
}

impl SessionGuard {
    fn new(registry: Arc<ClientRegistry>, stats: Arc<HubStats>, id: SessionId) -> Self {
        Self {
            registry,
            stats,
            id,
            armed: true,
        }
    }

    /// Unregister the session now
    pub async fn release(mut self) -> std::result::Result<(), RegistryError> {
        let result = self.registry.unregister(self.id).await;
        self.armed = false;
        self.stats.session_closed();
        result
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        let id = self.id;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    stats.session_closed();
                    match registry.unregister(id).await {
                        Ok(()) => {
                            tracing::debug!(session_id = %id, "Session unregistered after cancellation")
                        }
                        Err(e) => {
                            tracing::error!(session_id = %id, error = %e, "Deferred unregister failed")
                        }
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    session_id = %id,
                    "Session dropped outside a runtime, not unregistered"
                );
            }
        }
    }
}

/// Connection admission and lifecycle owner
pub struct ChatHub {
    registry: Arc<ClientRegistry>,
    stats: Arc<HubStats>,
    config: HubConfig,
}

impl ChatHub {
    /// Create a hub with its own registry
    pub fn new(config: HubConfig, registry_config: RegistryConfig) -> Self {
        Self::with_registry(config, Arc::new(ClientRegistry::with_config(registry_config)))
    }

    /// Create a hub over an existing registry
    pub fn with_registry(config: HubConfig, registry: Arc<ClientRegistry>) -> Self {
        Self {
            registry,
            stats: Arc::new(HubStats::new()),
            config,
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get a reference to the hub counters
    pub fn stats(&self) -> &Arc<HubStats> {
        &self.stats
    }

    /// Hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Run one session from admission to cleanup
    ///
    /// Registers `sink` under a fresh identity, announces the session to
    /// everyone else, then drives the dispatcher over `inbound` until it ends.
    /// The session is unregistered on every exit path before this returns.
    pub async fn serve_session<S>(
        &self,
        peer_addr: Option<SocketAddr>,
        sink: Arc<dyn ResponseSink>,
        inbound: S,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Request, ProtocolError>> + Unpin,
    {
        let id = SessionId::new();

        if let Err(e) = self.registry.register(id, Arc::clone(&sink)).await {
            tracing::error!(session_id = %id, error = %e, "Session registration failed");
            return Err(e.into());
        }
        self.stats.session_opened();
        let guard = SessionGuard::new(Arc::clone(&self.registry), Arc::clone(&self.stats), id);

        tracing::info!(
            session_id = %id,
            peer = ?peer_addr,
            "Session joined"
        );

        if let Some(text) = &self.config.join_notice {
            let targets = self.registry.broadcast_targets(id).await;
            let notice = Response::notice(text.clone());
            let report = send_all(&targets, &notice, self.config.delivery_timeout).await;
            self.stats.fanout(report.delivered, report.failed);
        }

        let mut dispatcher = SessionDispatcher::new(
            SessionContext::new(id, peer_addr),
            sink,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
        )
        .delivery_timeout(self.config.delivery_timeout);

        let result = dispatcher.run(inbound).await;
        let cleanup = guard.release().await;

        tracing::info!(
            session_id = %id,
            duration_ms = dispatcher.context().duration().as_millis() as u64,
            "Session left"
        );

        match (result, cleanup) {
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    tracing::error!(session_id = %id, error = %cleanup_err, "Unregister failed");
                }
                Err(e)
            }
            (Ok(()), cleanup) => cleanup.map_err(Into::into),
        }
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(HubConfig::default(), RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::Error;
    use crate::registry::ChannelSink;

    struct FailingSink;

    #[async_trait]
    impl ResponseSink for FailingSink {
        async fn send(&self, _response: Response) -> std::result::Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    struct StalledSink;

    #[async_trait]
    impl ResponseSink for StalledSink {
        async fn send(&self, _response: Response) -> std::result::Result<(), SinkError> {
            futures::future::pending().await
        }
    }

    type Inbound = std::result::Result<Request, ProtocolError>;

    fn requests(items: Vec<Inbound>) -> impl Stream<Item = Inbound> + Unpin {
        stream::iter(items)
    }

    fn channel_target(n: u128) -> (Target, mpsc::Receiver<Response>) {
        let (sink, rx) = ChannelSink::channel(4);
        let target = Target {
            id: SessionId::from_u128(n),
            sink: Arc::new(sink),
        };
        (target, rx)
    }

    fn hub() -> ChatHub {
        ChatHub::new(
            HubConfig::default().join_notice("joined"),
            RegistryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_send_all_isolates_failures() {
        let (first, mut first_rx) = channel_target(1);
        let broken = Target {
            id: SessionId::from_u128(2),
            sink: Arc::new(FailingSink),
        };
        let (last, mut last_rx) = channel_target(3);

        let report = send_all(&[first, broken, last], &Response::notice("hi"), None).await;

        assert_eq!(report, FanoutReport { delivered: 2, failed: 1 });
        assert_eq!(first_rx.recv().await.unwrap().text(), "hi");
        assert_eq!(last_rx.recv().await.unwrap().text(), "hi");
    }

    #[tokio::test]
    async fn test_send_all_times_out_stalled_target() {
        let stalled = Target {
            id: SessionId::from_u128(1),
            sink: Arc::new(StalledSink),
        };
        let (ok, mut ok_rx) = channel_target(2);

        let report = send_all(
            &[stalled, ok],
            &Response::notice("hi"),
            Some(Duration::from_millis(20)),
        )
        .await;

        assert_eq!(report, FanoutReport { delivered: 1, failed: 1 });
        assert!(ok_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_send_all_empty() {
        let report = send_all(&[], &Response::notice("hi"), None).await;
        assert_eq!(report, FanoutReport::default());
    }

    #[tokio::test]
    async fn test_session_registered_then_unregistered() {
        let hub = hub();
        let (sink, _rx) = ChannelSink::channel(4);

        let inbound = requests(vec![Ok(Request::change_name("temp"))]);
        hub.serve_session(None, Arc::new(sink), inbound)
            .await
            .unwrap();

        assert_eq!(hub.registry().session_count().await, 0);
        assert!(hub.registry().sessions_named("temp").await.is_empty());
        let stats = hub.stats().snapshot();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_join_notice_goes_to_others_only() {
        let hub = Arc::new(hub());

        // First session stays connected until we close its inbound side
        let (first_sink, mut first_rx) = ChannelSink::channel(4);
        let (first_tx, first_inbound) = mpsc::unbounded_channel::<Inbound>();
        let first = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                let inbound = inbound_from(first_inbound);
                hub.serve_session(None, Arc::new(first_sink), inbound).await
            })
        };
        wait_for_sessions(&hub, 1).await;

        let (second_sink, mut second_rx) = ChannelSink::channel(4);
        hub.serve_session(None, Arc::new(second_sink), requests(Vec::new()))
            .await
            .unwrap();

        assert_eq!(first_rx.recv().await, Some(Response::notice("joined")));
        assert!(second_rx.try_recv().is_err());

        drop(first_tx);
        first.await.unwrap().unwrap();
        assert_eq!(hub.registry().session_count().await, 0);
    }

    #[tokio::test]
    async fn test_fault_still_unregisters() {
        let hub = hub();
        let (sink, _rx) = ChannelSink::channel(4);

        let result = hub
            .serve_session(
                None,
                Arc::new(sink),
                requests(vec![
                    Ok(Request::change_name("doomed")),
                    Err(ProtocolError::EmptyFrame),
                ]),
            )
            .await;

        assert!(matches!(result, Err(Error::Protocol(ProtocolError::EmptyFrame))));
        assert_eq!(hub.registry().session_count().await, 0);
        assert!(hub.registry().sessions_named("doomed").await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_session_unregisters() {
        let hub = Arc::new(hub());
        let (sink, _rx) = ChannelSink::channel(4);

        let task = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                let inbound = stream::pending::<Inbound>();
                hub.serve_session(None, Arc::new(sink), inbound).await
            })
        };
        wait_for_sessions(&hub, 1).await;

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        wait_for_sessions(&hub, 0).await;
        assert_eq!(hub.stats().snapshot().active_sessions, 0);
    }

    fn inbound_from(mut rx: mpsc::UnboundedReceiver<Inbound>) -> impl Stream<Item = Inbound> + Unpin {
        stream::poll_fn(move |cx| rx.poll_recv(cx))
    }

    async fn wait_for_sessions(hub: &ChatHub, expected: usize) {
        for _ in 0..200 {
            if hub.registry().session_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("registry never reached {expected} sessions");
    }
}

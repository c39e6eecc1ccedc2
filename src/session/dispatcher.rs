//! Session dispatcher
//!
//! Runs one connection's request loop: classifies each inbound request,
//! consults or updates the registry, and fans responses out to the
//! resolved targets.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};

use super::context::SessionContext;
use crate::error::{ProtocolError, Result};
use crate::protocol::{Request, Response};
use crate::registry::{ClientRegistry, RegistryError, ResponseSink};
use crate::server::hub::send_all;
use crate::stats::HubStats;

/// Request loop for a single session
pub struct SessionDispatcher {
    ctx: SessionContext,
    sink: Arc<dyn ResponseSink>,
    registry: Arc<ClientRegistry>,
    stats: Arc<HubStats>,
    delivery_timeout: Option<Duration>,
}

impl SessionDispatcher {
    /// Create a dispatcher for an already-registered session
    pub fn new(
        ctx: SessionContext,
        sink: Arc<dyn ResponseSink>,
        registry: Arc<ClientRegistry>,
        stats: Arc<HubStats>,
    ) -> Self {
        Self {
            ctx,
            sink,
            registry,
            stats,
            delivery_timeout: None,
        }
    }

    /// Bound each per-target delivery
    pub fn delivery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Session context
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Consume `inbound` until it ends
    ///
    /// A clean end of stream and peer-gone I/O faults both return `Ok`.
    /// Other stream faults and registry invariant violations are returned
    /// to the caller, which owns cleanup.
    pub async fn run<S>(&mut self, mut inbound: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Request, ProtocolError>> + Unpin,
    {
        while let Some(item) = inbound.next().await {
            match item {
                Ok(request) => self.handle(request).await?,
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(
                        session_id = %self.ctx.session_id,
                        error = %e,
                        "Peer disconnected"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Process a single request
    pub async fn handle(&mut self, request: Request) -> Result<()> {
        self.stats.request();
        tracing::trace!(
            session_id = %self.ctx.session_id,
            kind = request.kind(),
            "Request received"
        );

        match request {
            Request::ChangeName { new_name } => self.handle_change_name(new_name).await,
            Request::GlobalMessage { text } => {
                self.handle_global_message(text).await;
                Ok(())
            }
            Request::DirectMessage { target_name, text } => {
                self.handle_direct_message(&target_name, text).await
            }
            Request::Unrecognized { tag } => {
                self.stats.unrecognized_request();
                tracing::warn!(
                    session_id = %self.ctx.session_id,
                    tag = tag,
                    "Ignoring unrecognized request"
                );
                Ok(())
            }
        }
    }

    async fn handle_change_name(&mut self, new_name: String) -> Result<()> {
        self.registry.rename(self.ctx.session_id, &new_name).await?;

        tracing::info!(
            session_id = %self.ctx.session_id,
            from = ?self.ctx.name,
            to = %new_name,
            "Name changed"
        );
        self.ctx.name = Some(new_name);

        Ok(())
    }

    async fn handle_global_message(&self, text: String) {
        let response = Response::notification(text, self.ctx.name.clone());
        let targets = self.registry.broadcast_targets(self.ctx.session_id).await;

        let report = send_all(&targets, &response, self.delivery_timeout).await;
        self.stats.fanout(report.delivered, report.failed);

        tracing::debug!(
            session_id = %self.ctx.session_id,
            targets = targets.len(),
            delivered = report.delivered,
            "Global message routed"
        );
    }

    async fn handle_direct_message(&self, target_name: &str, text: String) -> Result<()> {
        let targets = match self
            .registry
            .direct_targets(target_name, self.ctx.session_id)
            .await
        {
            Ok(targets) => targets,
            Err(RegistryError::UnknownRecipient(name)) => {
                self.stats.routing_miss();
                tracing::warn!(
                    session_id = %self.ctx.session_id,
                    target = %name,
                    "Direct message to unknown recipient"
                );
                self.send_feedback(format!("no session named {name:?}"))
                    .await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if targets.is_empty() {
            self.stats.routing_miss();
        }

        let response = Response::notification(text, self.ctx.name.clone());
        let report = send_all(&targets, &response, self.delivery_timeout).await;
        self.stats.fanout(report.delivered, report.failed);

        tracing::debug!(
            session_id = %self.ctx.session_id,
            target = target_name,
            targets = targets.len(),
            delivered = report.delivered,
            "Direct message routed"
        );

        Ok(())
    }

    /// Tell this session something went wrong with its request
    async fn send_feedback(&self, text: String) {
        if let Err(e) = self.sink.send(Response::notice(text)).await {
            tracing::debug!(
                session_id = %self.ctx.session_id,
                error = %e,
                "Failed to deliver feedback"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use futures::stream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::Error;
    use crate::registry::{ChannelSink, RegistryConfig, SessionId};

    struct Peer {
        id: SessionId,
        sink: Arc<dyn ResponseSink>,
        rx: mpsc::Receiver<Response>,
    }

    async fn join(registry: &ClientRegistry, n: u128) -> Peer {
        let (sink, rx) = ChannelSink::channel(16);
        let sink: Arc<dyn ResponseSink> = Arc::new(sink);
        let id = SessionId::from_u128(n);
        registry.register(id, Arc::clone(&sink)).await.unwrap();
        Peer { id, sink, rx }
    }

    fn dispatcher(registry: &Arc<ClientRegistry>, peer: &Peer) -> SessionDispatcher {
        SessionDispatcher::new(
            SessionContext::new(peer.id, None),
            Arc::clone(&peer.sink),
            Arc::clone(registry),
            Arc::new(HubStats::new()),
        )
    }

    fn requests(
        items: Vec<Request>,
    ) -> impl Stream<Item = std::result::Result<Request, ProtocolError>> + Unpin {
        stream::iter(items.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_global_then_direct_scenario() {
        let registry = Arc::new(ClientRegistry::new());
        let mut a = join(&registry, 1).await;
        let mut b = join(&registry, 2).await;

        dispatcher(&registry, &b)
            .run(requests(vec![Request::change_name("bob")]))
            .await
            .unwrap();

        dispatcher(&registry, &a)
            .run(requests(vec![
                Request::global("hi"),
                Request::direct("bob", "yo"),
            ]))
            .await
            .unwrap();

        assert_eq!(b.rx.try_recv().unwrap(), Response::notification("hi", None));
        assert_eq!(b.rx.try_recv().unwrap(), Response::notification("yo", None));
        assert!(b.rx.try_recv().is_err());
        assert!(a.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sender_name_attached() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;
        let mut b = join(&registry, 2).await;

        dispatcher(&registry, &a)
            .run(requests(vec![
                Request::change_name("Alice"),
                Request::global("hello"),
            ]))
            .await
            .unwrap();

        assert_eq!(
            b.rx.try_recv().unwrap(),
            Response::notification("hello", Some("Alice".into()))
        );
    }

    #[tokio::test]
    async fn test_direct_to_nobody_is_silent() {
        let registry = Arc::new(ClientRegistry::new());
        let mut a = join(&registry, 1).await;
        let mut b = join(&registry, 2).await;

        let mut d = dispatcher(&registry, &a);
        d.run(requests(vec![Request::direct("nobody", "x")]))
            .await
            .unwrap();

        assert!(a.rx.try_recv().is_err());
        assert!(b.rx.try_recv().is_err());
        assert_eq!(d.stats.snapshot().routing_misses, 1);
    }

    #[tokio::test]
    async fn test_direct_to_nobody_rejected_sends_feedback() {
        let config = RegistryConfig::default().reject_unknown_recipients();
        let registry = Arc::new(ClientRegistry::with_config(config));
        let mut a = join(&registry, 1).await;
        let mut b = join(&registry, 2).await;

        dispatcher(&registry, &a)
            .run(requests(vec![
                Request::direct("nobody", "x"),
                Request::global("still here"),
            ]))
            .await
            .unwrap();

        let feedback = a.rx.try_recv().unwrap();
        assert_eq!(feedback.sender(), None);
        assert!(feedback.text().contains("nobody"));
        assert_eq!(b.rx.try_recv().unwrap().text(), "still here");
    }

    #[tokio::test]
    async fn test_unrecognized_request_skipped() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;
        let mut b = join(&registry, 2).await;

        let mut d = dispatcher(&registry, &a);
        d.run(requests(vec![
            Request::Unrecognized { tag: 0x55 },
            Request::global("after"),
        ]))
        .await
        .unwrap();

        assert_eq!(b.rx.try_recv().unwrap().text(), "after");
        let stats = d.stats.snapshot();
        assert_eq!(stats.unrecognized_requests, 1);
        assert_eq!(stats.requests, 2);
    }

    #[tokio::test]
    async fn test_connection_aborted_is_clean_exit() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;

        let inbound = stream::iter(vec![
            Ok(Request::change_name("x")),
            Err(ProtocolError::Io(io::Error::from(
                io::ErrorKind::ConnectionAborted,
            ))),
            Ok(Request::change_name("never")),
        ]);

        let mut d = dispatcher(&registry, &a);
        d.run(inbound).await.unwrap();

        assert_eq!(d.context().name.as_deref(), Some("x"));
        assert_eq!(registry.name_of(a.id).await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_other_fault_propagates() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;

        let inbound = stream::iter(vec![Err(ProtocolError::InvalidUtf8)]);

        let result = dispatcher(&registry, &a).run(inbound).await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::InvalidUtf8))
        ));
    }

    #[tokio::test]
    async fn test_rename_of_unregistered_session_fails_loudly() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;
        registry.unregister(a.id).await.unwrap();

        let result = dispatcher(&registry, &a)
            .run(requests(vec![Request::change_name("ghost")]))
            .await;

        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::UnknownIdentity(_)))
        ));
    }

    #[tokio::test]
    async fn test_closed_peer_does_not_block_others() {
        let registry = Arc::new(ClientRegistry::new());
        let a = join(&registry, 1).await;
        let b = join(&registry, 2).await;
        let mut c = join(&registry, 3).await;
        drop(b.rx);

        let mut d = dispatcher(&registry, &a);
        d.run(requests(vec![Request::global("hi")])).await.unwrap();

        assert_eq!(c.rx.try_recv().unwrap().text(), "hi");
        let stats = d.stats.snapshot();
        assert_eq!(stats.deliveries, 1);
        assert_eq!(stats.delivery_failures, 1);
    }
}

//! Outbound sinks
//!
//! A sink is the handle the hub pushes responses through for one session.
//! The transport layer owns the underlying connection; the registry only
//! holds a shared reference for as long as the session is registered.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::Response;

/// Error returned when a response cannot be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The session's outbound side has shut down
    #[error("sink closed")]
    Closed,
    /// Delivery did not complete within the configured timeout
    #[error("delivery timed out")]
    TimedOut,
}

/// Delivery handle for one connected session
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Push a response to the session, waiting on its backpressure
    async fn send(&self, response: Response) -> Result<(), SinkError>;
}

/// Sink backed by a bounded channel drained by the connection's writer
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Response>,
}

impl ChannelSink {
    /// Wrap a channel sender
    pub fn new(tx: mpsc::Sender<Response>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver its responses arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Response>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn send(&self, response: Response) -> Result<(), SinkError> {
        self.tx.send(response).await.map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::channel(4);

        sink.send(Response::notice("hello")).await.unwrap();

        assert_eq!(rx.recv().await, Some(Response::notice("hello")));
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::channel(4);
        drop(rx);

        assert!(sink.is_closed());
        assert_eq!(
            sink.send(Response::notice("lost")).await,
            Err(SinkError::Closed)
        );
    }
}

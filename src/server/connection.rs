//! Per-connection transport
//!
//! Splits a TCP socket into a framed request stream for the dispatcher and a
//! writer task that drains the session's outbound queue onto the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};

use super::config::ServerConfig;
use super::hub::ChatHub;
use crate::error::{ProtocolError, Result};
use crate::protocol::{Response, ServerCodec};
use crate::registry::ChannelSink;

/// One accepted client connection
pub struct Connection {
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: ServerConfig,
    hub: Arc<ChatHub>,
}

impl Connection {
    pub fn new(
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        hub: Arc<ChatHub>,
    ) -> Self {
        Self {
            socket,
            peer_addr,
            config,
            hub,
        }
    }

    /// Serve the connection until the peer leaves or stops accepting writes
    pub async fn run(self) -> Result<()> {
        let (reader, writer) = self.socket.into_split();
        serve_transport(reader, writer, Some(self.peer_addr), &self.config, &self.hub).await
    }
}

/// Run one session over a read half and a write half
///
/// The writer outlives the dispatcher on the normal path: it keeps draining
/// until the registry and every in-flight fan-out have let go of the sink,
/// then closes the write half. If the writer stops first, the inbound stream
/// ends with it so the session is unregistered instead of holding a dead sink.
async fn serve_transport<R, W>(
    reader: R,
    writer: W,
    peer_addr: Option<SocketAddr>,
    config: &ServerConfig,
    hub: &ChatHub,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let codec = ServerCodec::with_max_frame_size(config.max_frame_size);
    let (sink, rx) = ChannelSink::channel(config.outbound_queue);
    let (writer_alive, writer_gone) = oneshot::channel::<()>();

    let outbound = FramedWrite::new(writer, codec.clone());
    let writer_task = tokio::spawn(async move {
        let _alive = writer_alive;
        write_responses(outbound, rx, peer_addr).await
    });

    let inbound = FramedRead::new(reader, codec).take_until(writer_gone);
    let served = hub.serve_session(peer_addr, Arc::new(sink), inbound).await;

    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_disconnect() => {}
        Ok(Err(e)) => {
            tracing::debug!(peer = ?peer_addr, error = %e, "Writer error");
        }
        Err(e) => {
            tracing::error!(peer = ?peer_addr, error = %e, "Writer task failed");
        }
    }

    match served {
        Err(e) if e.is_disconnect() => Ok(()),
        other => other,
    }
}

/// Drain `rx` onto `outbound` until every sender is gone
///
/// A response the codec refuses is logged and skipped; only I/O failures end
/// the loop.
async fn write_responses<W>(
    mut outbound: FramedWrite<W, ServerCodec>,
    mut rx: mpsc::Receiver<Response>,
    peer_addr: Option<SocketAddr>,
) -> std::result::Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        match outbound.send(response).await {
            Ok(()) => {}
            Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
            Err(e) => {
                tracing::warn!(peer = ?peer_addr, error = %e, "Dropping unencodable response");
            }
        }
    }
    outbound.close().await
}

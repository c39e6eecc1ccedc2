//! Chat client
//!
//! High-level API for talking to a chat hub over TCP.

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::Result;
use crate::protocol::{ClientCodec, Request, Response};

/// Chat hub client
///
/// # Example
/// ```no_run
/// use chat_hub::client::ChatClient;
///
/// # async fn example() -> chat_hub::Result<()> {
/// let mut client = ChatClient::connect("127.0.0.1:5029").await?;
///
/// client.change_name("alice").await?;
/// client.send_global("hello everyone").await?;
///
/// while let Some(response) = client.next_response().await? {
///     println!("{}: {}", response.sender().unwrap_or("Unknown"), response.text());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    reader: FramedRead<OwnedReadHalf, ClientCodec>,
    writer: FramedWrite<OwnedWriteHalf, ClientCodec>,
}

impl ChatClient {
    /// Connect to a hub
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected socket
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: FramedRead::new(reader, ClientCodec::new()),
            writer: FramedWrite::new(writer, ClientCodec::new()),
        }
    }

    /// Send a raw request
    pub async fn send(&mut self, request: Request) -> Result<()> {
        self.writer.send(request).await?;
        Ok(())
    }

    /// Claim a display name
    pub async fn change_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.send(Request::change_name(name)).await
    }

    /// Send a message to everyone else
    pub async fn send_global(&mut self, text: impl Into<String>) -> Result<()> {
        self.send(Request::global(text)).await
    }

    /// Send a message to every session named `target`
    pub async fn send_direct(
        &mut self,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<()> {
        self.send(Request::direct(target, text)).await
    }

    /// Wait for the next response; `None` once the hub closes the connection
    pub async fn next_response(&mut self) -> Result<Option<Response>> {
        match self.reader.next().await {
            Some(response) => Ok(Some(response?)),
            None => Ok(None),
        }
    }

    /// Stop sending; the hub ends the session once it sees end of stream
    pub async fn close(mut self) -> Result<()> {
        self.writer.close().await?;
        Ok(())
    }
}

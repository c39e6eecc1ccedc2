//! # chat-hub
//!
//! Real-time chat routing hub. Connected sessions exchange broadcast and
//! direct messages over persistent TCP connections.
//!
//! ## Components
//!
//! - [`registry`]: the shared index of live sessions, their outbound sinks
//!   and the names they claim
//! - [`session`]: the per-connection dispatcher that classifies requests and
//!   routes responses
//! - [`server`]: the hub entrypoint that owns each session's lifecycle, and
//!   the TCP listener in front of it
//! - [`protocol`]: request/response types and the frame codec
//! - [`client`]: a programmatic client
//!
//! ## Usage
//!
//! ```no_run
//! use chat_hub::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> chat_hub::Result<()> {
//!     let server = ChatServer::new(ServerConfig::default());
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use client::ChatClient;
pub use error::{Error, ProtocolError, Result};
pub use protocol::{Request, Response};
pub use registry::{ClientRegistry, RegistryConfig, RegistryError, SessionId, UnknownRecipientPolicy};
pub use server::{ChatHub, ChatServer, HubConfig, ServerConfig};
pub use session::SessionDispatcher;

//! Chat server
//!
//! The routing hub entrypoint plus the TCP transport that feeds it.

pub mod config;
pub mod connection;
pub mod hub;
pub mod listener;

pub use config::{HubConfig, ServerConfig};
pub use hub::{send_all, ChatHub, FanoutReport, SessionGuard};
pub use listener::ChatServer;

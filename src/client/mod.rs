//! Chat client implementation
//!
//! Provides a programmatic client for:
//! - Claiming a name and sending global or direct messages
//! - Reading the notifications the hub pushes back

pub mod chat;

pub use chat::ChatClient;

//! Session context
//!
//! Per-connection information carried by the dispatcher.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::SessionId;

/// Information about one live session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: SessionId,

    /// Remote peer address (absent for in-process sessions)
    pub peer_addr: Option<SocketAddr>,

    /// When the session was admitted
    pub connected_at: Instant,

    /// Name this session last claimed
    pub name: Option<String>,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: SessionId, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            session_id,
            peer_addr,
            connected_at: Instant::now(),
            name: None,
        }
    }

    /// Time since the session was admitted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_anonymous() {
        let addr: SocketAddr = "127.0.0.1:5029".parse().unwrap();
        let ctx = SessionContext::new(SessionId::from_u128(1), Some(addr));

        assert_eq!(ctx.session_id, SessionId::from_u128(1));
        assert_eq!(ctx.peer_addr, Some(addr));
        assert!(ctx.name.is_none());
    }
}

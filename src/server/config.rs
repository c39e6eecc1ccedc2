//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::DEFAULT_MAX_FRAME_SIZE;
use crate::registry::RegistryConfig;

/// Default port, matching the reference client
pub const DEFAULT_PORT: u16 = 5029;

/// Default text broadcast when a session joins
pub const DEFAULT_JOIN_NOTICE: &str = "A new user has joined the chat";

/// Hub behavior options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Notice broadcast to existing sessions when one joins (None = silent)
    pub join_notice: Option<String>,

    /// Upper bound on a single per-target delivery (None = wait indefinitely)
    pub delivery_timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            join_notice: Some(DEFAULT_JOIN_NOTICE.to_string()),
            delivery_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl HubConfig {
    /// Set the join notice text
    pub fn join_notice(mut self, text: impl Into<String>) -> Self {
        self.join_notice = Some(text.into());
        self
    }

    /// Don't announce new sessions
    pub fn disable_join_notice(mut self) -> Self {
        self.join_notice = None;
        self
    }

    /// Set the per-target delivery timeout
    pub fn delivery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.delivery_timeout = timeout;
        self
    }
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Largest accepted request payload; responses may use twice this
    pub max_frame_size: usize,

    /// Responses buffered per session before senders wait
    pub outbound_queue: usize,

    /// Stats log interval (zero disables)
    pub stats_interval: Duration,

    /// Hub behavior
    pub hub: HubConfig,

    /// Registry behavior
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            outbound_queue: 64,
            stats_interval: Duration::from_secs(60),
            hub: HubConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the per-session outbound queue depth (at least 1)
    pub fn outbound_queue(mut self, depth: usize) -> Self {
        self.outbound_queue = depth.max(1);
        self
    }

    /// Set the stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set hub options
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Set registry options
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UnknownRecipientPolicy;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert!(config.tcp_nodelay);
        assert_eq!(config.hub.join_notice.as_deref(), Some(DEFAULT_JOIN_NOTICE));
        assert_eq!(
            config.registry.unknown_recipient,
            UnknownRecipientPolicy::Ignore
        );
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 6000);
    }

    #[test]
    fn test_builder_outbound_queue_floor() {
        let config = ServerConfig::default().outbound_queue(0);

        assert_eq!(config.outbound_queue, 1);
    }

    #[test]
    fn test_hub_builder() {
        let hub = HubConfig::default()
            .disable_join_notice()
            .delivery_timeout(None);

        assert!(hub.join_notice.is_none());
        assert!(hub.delivery_timeout.is_none());

        let hub = hub.join_notice("hello");
        assert_eq!(hub.join_notice.as_deref(), Some("hello"));
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:5030".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .max_frame_size(1024)
            .stats_interval(Duration::ZERO)
            .hub(HubConfig::default().disable_join_notice())
            .registry(RegistryConfig::default().reject_unknown_recipients());

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.stats_interval, Duration::ZERO);
        assert!(config.hub.join_notice.is_none());
        assert_eq!(
            config.registry.unknown_recipient,
            UnknownRecipientPolicy::Reject
        );
    }
}

//! Chat hub server
//!
//! Run with: chat-hub [--bind ADDR] [OPTIONS]
//!
//! Examples:
//!   chat-hub                                   # binds to 0.0.0.0:5029
//!   chat-hub --bind 127.0.0.1:6000
//!   chat-hub --reject-unknown-recipients       # tell senders when a name is unclaimed
//!   RUST_LOG=chat_hub=debug chat-hub --json-logs

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chat_hub::server::config::DEFAULT_PORT;
use chat_hub::{ChatServer, HubConfig, RegistryConfig, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "chat-hub", version, about = "Real-time chat routing hub")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "CHAT_HUB_BIND", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    bind: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "CHAT_HUB_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Notify senders of direct messages to names nobody claims
    #[arg(long, env = "CHAT_HUB_REJECT_UNKNOWN_RECIPIENTS")]
    reject_unknown_recipients: bool,

    /// Don't announce new sessions to everyone else
    #[arg(long)]
    no_join_notice: bool,

    /// Per-recipient delivery timeout in milliseconds (0 = wait indefinitely)
    #[arg(long, env = "CHAT_HUB_DELIVERY_TIMEOUT_MS", default_value_t = 5_000)]
    delivery_timeout_ms: u64,

    /// Seconds between stats log lines (0 = off)
    #[arg(long, default_value_t = 60)]
    stats_interval_secs: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut hub = HubConfig::default().delivery_timeout(
            (self.delivery_timeout_ms > 0).then(|| Duration::from_millis(self.delivery_timeout_ms)),
        );
        if self.no_join_notice {
            hub = hub.disable_join_notice();
        }

        let mut registry = RegistryConfig::default();
        if self.reject_unknown_recipients {
            registry = registry.reject_unknown_recipients();
        }

        ServerConfig::with_addr(self.bind)
            .max_connections(self.max_connections)
            .stats_interval(Duration::from_secs(self.stats_interval_secs))
            .hub(hub)
            .registry(registry)
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_hub=info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> chat_hub::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let server = ChatServer::new(args.server_config());

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}

//! Huddle Relay Server
//!
//! WebSocket relay that lets guides and members rendezvous in named sessions
//! and exchange call-setup and live-annotation events.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle_relay::registry::ConnectionRegistry;
use huddle_relay::router::SignalHub;
use huddle_relay::server::{self, ServerConfig};
use huddle_relay::sessions::SessionCoordinator;

#[derive(Parser, Debug)]
#[command(name = "huddle-relay")]
#[command(version, about = "Huddle relay server - session rendezvous and signaling")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "HUDDLE_ADDR", default_value = "0.0.0.0:9000")]
    addr: SocketAddr,

    /// Outbound event queue capacity per connection.
    #[arg(long, default_value_t = 256)]
    send_queue: usize,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("huddle_relay=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting huddle-relay"
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let sessions = Arc::new(SessionCoordinator::new());
    let hub = SignalHub::new(registry, sessions);

    let config = ServerConfig {
        addr: args.addr,
        send_queue: args.send_queue,
    };

    tokio::select! {
        result = server::serve(config, hub) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Relay stopped");
    Ok(())
}

/// Initialise the global tracing subscriber with an env-filter and optional
/// JSON output.
fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

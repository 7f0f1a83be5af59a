//! TallyKV - An In-Memory Key-Value Server with Read-Limited Values
//!
//! This is the main entry point for the TallyKV server.
//! It sets up logging, the TCP listener and the storage engine, and hands
//! every accepted connection to its own task.

use clap::Parser;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tallykv::commands::CommandHandler;
use tallykv::config::{Config, SessionConfig};
use tallykv::connection::{handle_connection, ConnectionStats};
use tallykv::storage::StorageEngine;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn print_banner(config: &Config) {
    println!(
        r#"
TallyKV v{} - In-Memory Key-Value Server with Read-Limited Values
──────────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        tallykv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // Create the storage engine (shared across all connections)
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());
    if let Some(secs) = config.idle_timeout {
        info!("Idle connections are closed after {}s", secs);
    }

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.session()) => {}
        _ = shutdown => {}
    }

    let store_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        requests = stats.requests_processed.load(Ordering::Relaxed),
        values = store_stats.values,
        counters = store_stats.counters,
        exhausted = store_stats.exhausted,
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    session: SessionConfig,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    error!(client = %addr, "Failed to set TCP_NODELAY: {}", e);
                }

                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(handle_connection(stream, addr, handler, stats, session));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

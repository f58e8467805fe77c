//! # Herald - OTP issuance over a messaging channel
//!
//! Issues single-use 6-digit codes for phone-number verification and
//! validates them within their TTL. Codes are delivered through an external
//! messaging bridge; issuance is only allowed while that bridge reports the
//! channel as ready.
//!
//! ## Architecture
//! ```text
//! Client → RateLimiter → OtpService → MessageChannel → Bridge
//!                            ↓   ↑
//!                        OtpStore  ReadinessGate ← Bridge events
//!                            ↓
//!                      Redis (records)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod channel;
mod clock;
mod config;
mod otp;
mod rate_limit;
mod routes;
mod state;

use clock::SystemClock;
use config::AppConfig;
use state::AppState;

/// Herald - one-time passcode service
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/herald.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("📨 Starting Herald v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    info!(
        store = state.store.backend_name(),
        channel = ?config.channel.kind,
        "✅ OTP service initialized"
    );

    // Spawn expiry sweep
    let sweep_store = state.store.clone();
    let sweep_limiter = state.rate_limiter.clone();
    let sweep_shutdown = shutdown_tx.subscribe();
    let sweep_interval = Duration::from_secs(config.store.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        otp::sweep_worker(
            sweep_store,
            sweep_limiter,
            Arc::new(SystemClock),
            sweep_interval,
            sweep_shutdown,
        )
        .await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Herald listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("Server error")?;

    info!("👋 Herald shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}

//! Payhook Server - Stripe webhook receiver.
//!
//! This binary provides a thin web server that:
//! - Receives signed Stripe webhook deliveries
//! - Verifies the `Stripe-Signature` header over the raw body
//! - Dispatches verified events to registered handlers
//! - Acknowledges every verified delivery with 200 OK

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payhook::web::{app, AppState, StripeSignatureVerifier};
use payhook::{Config, EventRouter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("server_starting");

    // Load configuration; missing secrets abort startup
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        signature_tolerance_secs = config.signature_tolerance_secs,
        "config_loaded"
    );

    // Wire the verifier and the event dispatch table
    let verifier = Arc::new(StripeSignatureVerifier::new(
        config.stripe_webhook_secret.clone(),
        config.signature_tolerance_secs,
    ));
    let router = EventRouter::with_default_handlers();

    let port = config.port;
    let state = AppState::new(config, verifier, router);

    // Build the router
    let app = app(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("server_shutting_down");
}

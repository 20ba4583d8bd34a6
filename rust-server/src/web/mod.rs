//! Web server module for handling inbound Stripe webhooks.
//!
//! This module provides a thin web server that:
//! - Receives signed webhook deliveries on `POST /webhook`
//! - Bounds the request body and verifies the Stripe signature
//! - Dispatches verified events to registered handlers
//! - Acknowledges every verified delivery with 200 OK

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, stripe_webhook, AppState, HealthResponse, MAX_BODY_BYTES};
pub use signature::{
    StripeSignatureVerifier, VerificationError, VerifySignature, DEFAULT_TOLERANCE_SECS,
};

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

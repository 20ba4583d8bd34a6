//! Payhook - Stripe webhook receiver.
//!
//! This library backs the `payhook-server` binary: a single-endpoint HTTP
//! server that verifies signed Stripe webhook deliveries and dispatches
//! them by event type.
//!
//! ## Architecture
//!
//! ```text
//! POST /webhook → ingress guard → signature verifier → event router → handler
//! ```
//!
//! Each request is stateless and independent; the only process-wide state
//! is the configuration loaded at startup.

pub mod config;
pub mod event;
pub mod events;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::{Event, EventData, PaymentIntent};
pub use events::{DispatchOutcome, EventHandler, EventRouter, PaymentSucceededHandler};
pub use web::{AppState, StripeSignatureVerifier, VerificationError, VerifySignature};

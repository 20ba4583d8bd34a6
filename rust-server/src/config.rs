//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup. The two Stripe secrets have
//! no defaults: a missing secret is a startup-time misconfiguration and
//! the process refuses to start rather than silently accepting
//! unverifiable webhooks.

use std::env;

use anyhow::{Context, Result};

use crate::web::signature::DEFAULT_TOLERANCE_SECS;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stripe account secret key, for outbound API calls.
    ///
    /// The webhook receiver itself never calls out to Stripe, but the key
    /// is part of shared process state for handlers that would.
    pub stripe_account_secret: String,

    /// Stripe webhook signing secret used to verify inbound signatures.
    pub stripe_webhook_secret: String,

    /// Port for the web server to listen on.
    pub port: u16,

    /// Maximum age in seconds for webhook signature timestamps.
    pub signature_tolerance_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if `STRIPE_ACCOUNT_SECRET` or `STRIPE_WEBHOOK_SECRET` is unset.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            stripe_account_secret: env::var("STRIPE_ACCOUNT_SECRET")
                .context("STRIPE_ACCOUNT_SECRET must be set")?,

            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET must be set")?,

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4242),

            signature_tolerance_secs: env::var("SIGNATURE_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOLERANCE_SECS),
        })
    }
}

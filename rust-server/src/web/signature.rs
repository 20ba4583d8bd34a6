//! Stripe webhook signature verification.
//!
//! Stripe signs webhook requests with HMAC-SHA256 over `{timestamp}.{body}`
//! and sends the result in the `Stripe-Signature` header.
//! Reference: https://docs.stripe.com/webhooks#verify-manually

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::event::Event;

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance window for webhook timestamps, in seconds.
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Failure modes of signature verification.
///
/// All variants map to a `400 Bad Request` at the HTTP layer; a failed
/// verification is a security rejection, never a retryable condition.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The `Stripe-Signature` header is missing, empty, or not in the
    /// `t=<timestamp>,v1=<hex>` format.
    #[error("malformed signature header")]
    MalformedHeader,

    /// The signed timestamp falls outside the tolerance window.
    #[error("timestamp outside tolerance window")]
    StaleTimestamp,

    /// No `v1` candidate matched the expected HMAC.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The signing secret could not be used as an HMAC key.
    #[error("invalid signing key")]
    InvalidKey,

    /// The signature checked out but the envelope is not valid JSON.
    #[error("malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Capability for turning a raw payload plus signature header into a
/// verified [`Event`].
///
/// The web layer only consumes this contract; tests substitute a
/// deterministic fake so dispatch logic stays independent of the
/// cryptographic check.
pub trait VerifySignature: Send + Sync {
    fn verify(&self, payload: &[u8], signature_header: &str)
        -> Result<Event, VerificationError>;
}

/// Verifier implementing Stripe's documented HMAC-SHA256 scheme.
pub struct StripeSignatureVerifier {
    signing_secret: String,
    tolerance_secs: u64,
}

impl StripeSignatureVerifier {
    pub fn new(signing_secret: String, tolerance_secs: u64) -> Self {
        Self {
            signing_secret,
            tolerance_secs,
        }
    }
}

impl VerifySignature for StripeSignatureVerifier {
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Event, VerificationError> {
        let header = parse_signature_header(signature_header)?;

        // Reject stale timestamps (prevents replay attacks)
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let age = current_time.abs_diff(header.timestamp);
        if age > self.tolerance_secs {
            warn!(
                webhook_time = header.timestamp,
                current_time = current_time,
                age_seconds = age,
                tolerance_seconds = self.tolerance_secs,
                "stripe_signature_stale"
            );
            return Err(VerificationError::StaleTimestamp);
        }

        // Compute expected signature: HMAC-SHA256(secret, "{timestamp}.{body}")
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|_| {
                warn!("stripe_signature_invalid_key");
                VerificationError::InvalidKey
            })?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        // Any matching v1 candidate accepts the payload
        let valid = header
            .candidates
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));

        if !valid {
            warn!(
                candidate_count = header.candidates.len(),
                "stripe_signature_mismatch"
            );
            return Err(VerificationError::SignatureMismatch);
        }

        let event: Event = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "stripe_payload_malformed");
            e
        })?;

        Ok(event)
    }
}

/// Parsed `Stripe-Signature` header.
struct SignatureHeader {
    timestamp: u64,
    candidates: Vec<String>,
}

/// Parse a `Stripe-Signature` header of the form
/// `t=1700000000,v1=<hex>[,v1=<hex>][,v0=<hex>]`.
///
/// Multiple `v1` entries can appear during secret rotation; schemes other
/// than `v1` are ignored.
fn parse_signature_header(header: &str) -> Result<SignatureHeader, VerificationError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| {
                    warn!(timestamp = %value, "stripe_signature_invalid_timestamp");
                    VerificationError::MalformedHeader
                })?);
            }
            Some(("v1", value)) => candidates.push(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, candidates.is_empty()) {
        (Some(timestamp), false) => Ok(SignatureHeader {
            timestamp,
            candidates,
        }),
        _ => {
            warn!(
                has_timestamp = timestamp.is_some(),
                "stripe_signature_header_incomplete"
            );
            Err(VerificationError::MalformedHeader)
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

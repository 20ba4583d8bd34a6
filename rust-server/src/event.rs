//! Stripe event envelope types.
//!
//! An [`Event`] is only ever produced by a signature verifier; the rest of
//! the crate receives it already authenticated. The `data.object` fragment
//! stays undecoded until a type-specific handler claims it.

use serde::{Deserialize, Serialize};

/// A verified Stripe event envelope.
///
/// The envelope wraps a typed payload fragment plus metadata. Only the
/// fields this receiver needs are modeled; everything else Stripe sends
/// is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier (e.g. `evt_1...`).
    #[serde(default)]
    pub id: String,
    /// Event type string (e.g. `payment_intent.succeeded`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// The payload fragment whose shape depends on `event_type`.
    pub data: EventData,
}

/// The `data` member of an event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    /// Undecoded object fragment; handlers decode it into a concrete type.
    pub object: serde_json::Value,
}

/// A payment intent record, decoded from a `payment_intent.*` event's
/// `data.object` fragment. Transient - lives only inside one handler call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Payment intent identifier (e.g. `pi_12345`).
    pub id: String,
    /// Amount in the smallest currency unit.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Three-letter ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Intent status as reported by Stripe.
    #[serde(default)]
    pub status: Option<String>,
}

//! Handler for `payment_intent.succeeded` events.
//!
//! Decodes the event's payload fragment into a [`PaymentIntent`] and emits
//! an observability record with the intent identifier. This handler makes
//! no external calls and keeps no state; it demonstrates the dispatch
//! contract that real business handlers would follow.

use anyhow::{Context, Result};
use tracing::info;

use super::EventHandler;
use crate::event::{Event, PaymentIntent};

pub struct PaymentSucceededHandler;

impl EventHandler for PaymentSucceededHandler {
    fn handle(&self, event: &Event) -> Result<()> {
        let intent: PaymentIntent = serde_json::from_value(event.data.object.clone())
            .context("payload fragment is not a payment intent")?;

        info!(
            intent_id = %intent.id,
            amount = intent.amount,
            currency = intent.currency.as_deref(),
            status = intent.status.as_deref(),
            "payment_intent_succeeded"
        );

        Ok(())
    }
}

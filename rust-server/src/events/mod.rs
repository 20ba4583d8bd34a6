//! Verified-event routing.
//!
//! This module routes verified events to type-specific handlers.
//!
//! ## Dispatch Flow
//!
//! ```text
//! Event → EventRouter::dispatch() → registered EventHandler
//! ```
//!
//! Routing is a flat table keyed by exact event-type string. Unknown types
//! are an expected occurrence - Stripe's event vocabulary grows
//! independently of this receiver - so the default branch logs and moves
//! on instead of erroring. Handler failures are logged and swallowed; once
//! a payload has been verified the delivery is acknowledged regardless, so
//! Stripe does not retry a webhook whose failure is not transient.

pub mod payment_intent;

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::event::Event;

pub use payment_intent::PaymentSucceededHandler;

/// A handler for one registered event type.
///
/// Handlers receive the full verified envelope, decode the payload
/// fragment themselves, and report failure through the returned `Result`.
/// Side effects are implementation-defined.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> Result<()>;
}

/// Outcome of dispatching one verified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler ran and succeeded.
    Handled,
    /// A registered handler ran and failed; the error was logged.
    HandlerFailed,
    /// No handler is registered for this event type.
    Unhandled,
}

/// Flat dispatch table from event-type string to handler.
///
/// Built once at startup; new event types are supported by registering
/// additional handlers, not by changing the routing logic.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<&'static str, Box<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact event-type string.
    pub fn register(
        mut self,
        event_type: &'static str,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.handlers.insert(event_type, Box::new(handler));
        self
    }

    /// Router with the default handler set registered.
    pub fn with_default_handlers() -> Self {
        Self::new().register("payment_intent.succeeded", PaymentSucceededHandler)
    }

    /// Dispatch a verified event to its registered handler, if any.
    pub fn dispatch(&self, event: &Event) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(event.event_type.as_str()) else {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "event_unhandled"
            );
            return DispatchOutcome::Unhandled;
        };

        match handler.handle(event) {
            Ok(()) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "event_handled"
                );
                DispatchOutcome::Handled
            }
            Err(e) => {
                error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "event_handler_failed"
                );
                DispatchOutcome::HandlerFailed
            }
        }
    }
}

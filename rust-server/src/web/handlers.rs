//! Webhook endpoint handlers.
//!
//! The webhook endpoint does exactly three things:
//! 1. Reads the raw body under a hard size ceiling
//! 2. Verifies the Stripe signature over the exact bytes received
//! 3. Dispatches the verified event and acknowledges the delivery
//!
//! Once verification succeeds the response is always 200 OK - it means
//! "delivery accepted", not "business logic succeeded". Returning an error
//! for a non-transient handler failure would only make Stripe retry a
//! webhook that can never succeed.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::events::EventRouter;
use crate::web::signature::VerifySignature;
use crate::Config;

/// Hard ceiling on webhook body size, in bytes.
pub const MAX_BODY_BYTES: usize = 65536;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<dyn VerifySignature>,
    pub router: Arc<EventRouter>,
}

impl AppState {
    pub fn new(config: Config, verifier: Arc<dyn VerifySignature>, router: EventRouter) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            router: Arc::new(router),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Stripe webhook endpoint.
///
/// Responses:
/// - `503` - body over the size ceiling or unreadable; nothing was verified
/// - `400` - signature verification failed; nothing was dispatched
/// - `200` - verification succeeded, regardless of handler outcome
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> StatusCode {
    // Ingress guard: the raw bytes, bounded. Over-limit and unreadable
    // bodies fail here, before any verification work.
    let payload = match body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, max_body_bytes = MAX_BODY_BYTES, "webhook_body_unreadable");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    };

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    info!(
        payload_bytes = payload.len(),
        has_signature = !signature.is_empty(),
        "webhook_received"
    );

    // Security boundary: unverified payloads never reach a handler.
    let event = match state.verifier.verify(&payload, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "webhook_signature_invalid");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "webhook_verified"
    );

    // Handler outcome never changes the acknowledgement.
    state.router.dispatch(&event);

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::events::EventHandler;
    use crate::web::app;
    use crate::web::signature::{StripeSignatureVerifier, VerificationError};
    use anyhow::anyhow;
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Verifier double: records every payload it sees and either parses it
    /// as an envelope or rejects it outright.
    struct FakeVerifier {
        accept: bool,
        seen_payloads: Mutex<Vec<Vec<u8>>>,
    }

    impl FakeVerifier {
        fn accepting() -> Self {
            Self {
                accept: true,
                seen_payloads: Mutex::new(Vec::new()),
            }
        }

        fn rejecting() -> Self {
            Self {
                accept: false,
                seen_payloads: Mutex::new(Vec::new()),
            }
        }
    }

    impl VerifySignature for FakeVerifier {
        fn verify(
            &self,
            payload: &[u8],
            _signature_header: &str,
        ) -> Result<Event, VerificationError> {
            self.seen_payloads.lock().unwrap().push(payload.to_vec());
            if self.accept {
                Ok(serde_json::from_slice(payload)?)
            } else {
                Err(VerificationError::SignatureMismatch)
            }
        }
    }

    /// Handler spy counting invocations and remembering intent ids.
    struct SpyHandler {
        calls: AtomicUsize,
        seen_ids: Mutex<Vec<String>>,
        fail: bool,
    }

    impl SpyHandler {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen_ids: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl EventHandler for Arc<SpyHandler> {
        fn handle(&self, event: &Event) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = event.data.object.get("id").and_then(|v| v.as_str()) {
                self.seen_ids.lock().unwrap().push(id.to_string());
            }
            if self.fail {
                Err(anyhow!("handler failure"))
            } else {
                Ok(())
            }
        }
    }

    fn test_config() -> Config {
        Config {
            stripe_account_secret: "sk_test".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            port: 0,
            signature_tolerance_secs: 300,
        }
    }

    fn test_app(
        verifier: Arc<dyn VerifySignature>,
        spy: Arc<SpyHandler>,
    ) -> axum::Router {
        let router = EventRouter::new().register("payment_intent.succeeded", spy);
        app(AppState::new(test_config(), verifier, router))
    }

    fn webhook_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("Stripe-Signature", "t=0,v1=00")
            .body(body.into())
            .unwrap()
    }

    const SUCCEEDED: &str =
        r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_12345"}}}"#;

    #[tokio::test]
    async fn test_oversized_body_returns_503_without_verification() {
        let verifier = Arc::new(FakeVerifier::accepting());
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(verifier.clone(), spy.clone());

        let body = vec![b'x'; MAX_BODY_BYTES + 1];
        let response = app.oneshot(webhook_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(verifier.seen_payloads.lock().unwrap().is_empty());
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_body_at_limit_reaches_verifier_byte_identical() {
        let verifier = Arc::new(FakeVerifier::rejecting());
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(verifier.clone(), spy);

        let body = vec![b'x'; MAX_BODY_BYTES];
        let _ = app.oneshot(webhook_request(body.clone())).await.unwrap();

        let seen = verifier.seen_payloads.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], body);
    }

    #[tokio::test]
    async fn test_rejected_signature_returns_400_and_no_dispatch() {
        let verifier = Arc::new(FakeVerifier::rejecting());
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(verifier, spy.clone());

        let response = app.oneshot(webhook_request(SUCCEEDED)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_verified_event_dispatches_exactly_once() {
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(Arc::new(FakeVerifier::accepting()), spy.clone());

        let response = app.oneshot(webhook_request(SUCCEEDED)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            spy.seen_ids.lock().unwrap().as_slice(),
            ["pi_12345".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unrecognized_type_returns_200_without_dispatch() {
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(Arc::new(FakeVerifier::accepting()), spy.clone());

        let body = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#;
        let response = app.oneshot(webhook_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_failure_still_returns_200() {
        let spy = Arc::new(SpyHandler::new(true));
        let app = test_app(Arc::new(FakeVerifier::accepting()), spy.clone());

        let response = app.oneshot(webhook_request(SUCCEEDED)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replayed_delivery_is_processed_independently() {
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(Arc::new(FakeVerifier::accepting()), spy.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(webhook_request(SUCCEEDED))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(spy.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            spy.seen_ids.lock().unwrap().as_slice(),
            ["pi_12345".to_string(), "pi_12345".to_string()]
        );
    }

    #[tokio::test]
    async fn test_end_to_end_with_real_verifier() {
        let config = test_config();
        let verifier = Arc::new(StripeSignatureVerifier::new(
            config.stripe_webhook_secret.clone(),
            config.signature_tolerance_secs,
        ));
        let spy = Arc::new(SpyHandler::new(false));
        let router = EventRouter::new().register("payment_intent.succeeded", spy.clone());
        let app = app(AppState::new(config, verifier, router));

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec_test").unwrap();
        mac.update(format!("{}.{}", timestamp, SUCCEEDED).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("Stripe-Signature", format!("t={},v1={}", timestamp, signature))
            .body(Body::from(SUCCEEDED))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_signature_header_returns_400() {
        let config = test_config();
        let verifier = Arc::new(StripeSignatureVerifier::new(
            config.stripe_webhook_secret.clone(),
            config.signature_tolerance_secs,
        ));
        let spy = Arc::new(SpyHandler::new(false));
        let router = EventRouter::new().register("payment_intent.succeeded", spy.clone());
        let app = app(AppState::new(config, verifier, router));

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(SUCCEEDED))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let spy = Arc::new(SpyHandler::new(false));
        let app = test_app(Arc::new(FakeVerifier::accepting()), spy);

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

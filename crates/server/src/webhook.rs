use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use comanda_whatsapp::{parse_delivery, verify, InboundWorker, WorkerError};

pub const ACK_BODY: &str = "EVENT_RECEIVED";

#[derive(Clone)]
pub struct WebhookState {
    verify_token: SecretString,
    worker: InboundWorker,
}

impl WebhookState {
    pub fn new(verify_token: SecretString, worker: InboundWorker) -> Self {
        Self { verify_token, worker }
    }
}

/// Accepts both the provider's `hub.*` names and the bare names.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(default, rename = "hub.mode", alias = "mode")]
    mode: Option<String>,
    #[serde(default, rename = "hub.verify_token", alias = "verify_token")]
    verify_token: Option<String>,
    #[serde(default, rename = "hub.challenge", alias = "challenge")]
    challenge: Option<String>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify_subscription).post(receive))
        .with_state(state)
}

async fn verify_subscription(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match verify(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &state.verify_token,
    ) {
        Ok(challenge) => {
            info!(
                event_name = "ingress.webhook.verified",
                correlation_id = "verification",
                "webhook subscription verified"
            );
            (StatusCode::OK, challenge).into_response()
        }
        Err(rejection) => {
            warn!(
                event_name = "ingress.webhook.verify_rejected",
                correlation_id = "verification",
                mode = params.mode.as_deref().unwrap_or("missing"),
                error = %rejection,
                "webhook verification rejected"
            );
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

/// Always acknowledges. Parsing is the only synchronous work; conversation
/// processing is handed to the worker and never awaited here.
async fn receive(State(state): State<WebhookState>, body: Bytes) -> (StatusCode, &'static str) {
    let events = parse_delivery(&body);
    if events.is_empty() {
        debug!(
            event_name = "ingress.webhook.ack_sent",
            correlation_id = "none",
            events = 0,
            "webhook acknowledged without messages"
        );
        return (StatusCode::OK, ACK_BODY);
    }

    let count = events.len();
    let first_message = events[0].message_id.clone();
    match state.worker.submit(events) {
        Ok(batch_id) => debug!(
            event_name = "ingress.webhook.ack_sent",
            correlation_id = %first_message,
            batch_id = %batch_id,
            events = count,
            "webhook acknowledged"
        ),
        Err(WorkerError::Saturated) => warn!(
            event_name = "ingress.webhook.backlog_full",
            correlation_id = %first_message,
            events = count,
            "webhook acknowledged but the delivery was shed; backlog is full"
        ),
        Err(submit_error) => error!(
            event_name = "ingress.webhook.dispatch_unavailable",
            correlation_id = %first_message,
            events = count,
            error = %submit_error,
            "webhook acknowledged but delivery could not be queued"
        ),
    }

    (StatusCode::OK, ACK_BODY)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use comanda_whatsapp::{InboundEvent, InboundHandler, InboundWorker};

    use super::{router, WebhookState, ACK_BODY};

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InboundHandler for RecordingHandler {
        type Error = String;

        async fn handle(&self, event: &InboundEvent) -> Result<(), Self::Error> {
            self.seen.lock().await.push(event.message_id.clone());
            Ok(())
        }
    }

    fn app(handler: Arc<RecordingHandler>) -> (axum::Router, tokio::task::JoinHandle<()>) {
        let (worker, dispatcher) = InboundWorker::spawn(handler);
        let state = WebhookState::new(SecretString::from("s3cret".to_owned()), worker);
        (router(state), dispatcher)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn verification_echoes_challenge_for_both_parameter_styles() {
        let (app, _dispatcher) = app(Arc::default());

        for uri in [
            "/webhook?hub.mode=subscribe&hub.verify_token=s3cret&hub.challenge=1158201444",
            "/webhook?mode=subscribe&verify_token=s3cret&challenge=1158201444",
        ] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, "1158201444");
        }
    }

    #[tokio::test]
    async fn verification_with_wrong_token_is_forbidden() {
        let (app, _dispatcher) = app(Arc::default());

        let response = app
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_and_malformed_deliveries_are_acknowledged() {
        let handler = Arc::new(RecordingHandler::default());
        let (app, _dispatcher) = app(handler.clone());

        for body in ["", "{broken"] {
            let response = app
                .clone()
                .oneshot(Request::post("/webhook").body(Body::from(body)).expect("request"))
                .await
                .expect("response");

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, ACK_BODY);
        }
        assert!(handler.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delivery_is_acknowledged_and_dispatched_in_order() {
        let handler = Arc::new(RecordingHandler::default());
        let (app, dispatcher) = app(handler.clone());
        let payload = serde_json::json!({
            "entry": [{ "changes": [{ "value": {
                "metadata": { "phone_number_id": "PN-1" },
                "messages": [
                    { "from": "5511", "id": "wamid.1", "type": "text", "text": { "body": "1" } },
                    { "from": "5511", "id": "wamid.2", "type": "text", "text": { "body": "2" } }
                ]
            }}]}]
        });

        let response = app
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::timeout(Duration::from_secs(2), dispatcher)
            .await
            .expect("dispatcher drains once the router is dropped")
            .expect("dispatcher task");
        assert_eq!(*handler.seen.lock().await, vec!["wamid.1", "wamid.2"]);
    }
}

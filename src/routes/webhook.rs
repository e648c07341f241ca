use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::Instrument;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::webhook::{WebhookEvent, WebhookPayload};
use crate::services::pipeline;
use crate::services::signature::SIGNATURE_HEADER;

/// POST /callback — LINE webhook intake.
///
/// Answers 400 when the signature is missing or wrong. Once the signature
/// checks out the answer is always 200; processing failures are logged and
/// reported to the chat instead.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let delivery_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "webhook",
        %delivery_id,
        destination = tracing::field::Empty
    );

    async move {
        metrics::counter!("webhook_requests_total").increment(1);

        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());

        if let Err(e) = state.verifier.verify(&body, signature) {
            metrics::counter!("webhook_rejected_total").increment(1);
            tracing::warn!(error = %e, "Rejected webhook delivery");
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }

        let payload: WebhookPayload = match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Signed webhook body is not a valid payload");
                return Ok("OK");
            }
        };

        if let Some(destination) = payload.destination.as_deref() {
            tracing::Span::current().record("destination", destination);
        }
        tracing::debug!(events = payload.events.len(), "Dispatching webhook events");
        for event in payload.events {
            match event {
                WebhookEvent::Message(message) => {
                    pipeline::handle_message_event(&state, message).await;
                }
                WebhookEvent::Unsupported => {
                    tracing::debug!("Ignoring unsupported webhook event");
                }
            }
        }

        Ok("OK")
    }
    .instrument(span)
    .await
}

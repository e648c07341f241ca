//! Test helper utilities for driving the webhook router in-process

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use job_sheet_bot::app_state::AppState;
use job_sheet_bot::models::webhook::ReplyToken;
use job_sheet_bot::routes;
use job_sheet_bot::services::extractor::FieldExtractor;
use job_sheet_bot::services::line::{ReplyError, ReplyNotifier};
use job_sheet_bot::services::memory_store::MemorySheetStore;
use job_sheet_bot::services::reconciler::ReconcilePolicy;
use job_sheet_bot::services::sheets::{SheetStore, StoreError};
use job_sheet_bot::services::signature::SignatureVerifier;

pub const CHANNEL_SECRET: &str = "test-channel-secret";

/// Notifier that remembers every reply instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// (reply token, text) pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyNotifier for RecordingNotifier {
    async fn reply(&self, token: ReplyToken, text: &str) -> Result<(), ReplyError> {
        self.sent
            .lock()
            .unwrap()
            .push((token.as_str().to_string(), text.to_string()));
        if self.fail {
            return Err(ReplyError::Api {
                status: 400,
                message: "Invalid reply token".to_string(),
            });
        }
        Ok(())
    }
}

/// Sheet whose reads succeed but whose writes hit a quota error.
pub struct QuotaExceededStore {
    pub inner: MemorySheetStore,
}

#[async_trait]
impl SheetStore for QuotaExceededStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.inner.fetch_all().await
    }

    async fn update(&self, _row_number: u32, _values: &[String]) -> Result<(), StoreError> {
        Err(quota_error())
    }

    async fn append(&self, _values: &[String], _position: Option<u32>) -> Result<(), StoreError> {
        Err(quota_error())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(quota_error())
    }
}

fn quota_error() -> StoreError {
    StoreError::Api {
        status: 429,
        reason: Some("RESOURCE_EXHAUSTED".to_string()),
        message: "Quota exceeded for quota metric 'Write requests'".to_string(),
    }
}

/// Sheet that panics on read.
pub struct PanickingStore;

#[async_trait]
impl SheetStore for PanickingStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        panic!("sheet snapshot exploded");
    }

    async fn update(&self, _row_number: u32, _values: &[String]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn append(&self, _values: &[String], _position: Option<u32>) -> Result<(), StoreError> {
        Ok(())
    }
}

pub fn test_app(
    store: Arc<dyn SheetStore>,
    notifier: Arc<RecordingNotifier>,
    policy: ReconcilePolicy,
) -> Router {
    let state = AppState::new(
        SignatureVerifier::new(CHANNEL_SECRET).unwrap(),
        FieldExtractor::new().expect("default rules compile"),
        store,
        notifier,
        policy,
    );
    routes::build_router(state)
}

/// Webhook body carrying one text message per (reply token, text) pair.
pub fn text_events_body(messages: &[(&str, &str)]) -> String {
    let events: Vec<_> = messages
        .iter()
        .enumerate()
        .map(|(i, (token, text))| {
            json!({
                "type": "message",
                "mode": "active",
                "timestamp": 1_700_000_000_000u64 + i as u64,
                "webhookEventId": format!("01TESTEVENT{i}"),
                "deliveryContext": {"isRedelivery": false},
                "replyToken": token,
                "source": {"type": "group", "groupId": "Cgroup", "userId": "Uuser"},
                "message": {"id": format!("{i}"), "type": "text", "text": text}
            })
        })
        .collect();

    json!({"destination": "Ubot", "events": events}).to_string()
}

pub fn text_event_body(reply_token: &str, text: &str) -> String {
    text_events_body(&[(reply_token, text)])
}

/// POST /callback with a valid signature for `body`.
pub fn signed_callback(body: &str) -> Request<Body> {
    let signature = SignatureVerifier::new(CHANNEL_SECRET)
        .unwrap()
        .sign(body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/callback")
        .header("content-type", "application/json")
        .header("X-Line-Signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

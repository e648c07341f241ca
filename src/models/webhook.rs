use serde::Deserialize;

/// Body of a LINE Messaging API webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(default)]
    pub reply_token: Option<ReplyToken>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    pub message: MessageContent,
}

impl MessageEvent {
    /// Platform id of the message itself, for text messages.
    pub fn message_id(&self) -> Option<&str> {
        match &self.message {
            MessageContent::Text { id, .. } => id.as_deref(),
            MessageContent::Other => None,
        }
    }

    /// Kind of chat the event came from (`user`, `group`, `room`).
    pub fn source_kind(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.kind.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.user_id.as_deref())
    }

    pub fn group_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.group_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Single-use handle for answering one event.
///
/// Not `Clone`: sending a reply moves the token, so an event can be answered
/// at most once.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReplyToken(String);

impl ReplyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_message_event() {
        let body = r#"{
            "destination": "Uxxxxxxxx",
            "events": [{
                "type": "message",
                "mode": "active",
                "timestamp": 1700000000000,
                "webhookEventId": "01HABCDEF",
                "replyToken": "reply-token-1",
                "source": {"type": "group", "groupId": "Cgroup", "userId": "Uuser"},
                "message": {"id": "468789577898", "type": "text", "text": "JOB : J1001"}
            }]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.destination.as_deref(), Some("Uxxxxxxxx"));
        assert_eq!(payload.events.len(), 1);
        match &payload.events[0] {
            WebhookEvent::Message(event) => {
                assert_eq!(event.reply_token.as_ref().unwrap().as_str(), "reply-token-1");
                assert_eq!(event.webhook_event_id.as_deref(), Some("01HABCDEF"));
                assert_eq!(event.message_id(), Some("468789577898"));
                assert_eq!(event.source_kind(), Some("group"));
                assert_eq!(event.user_id(), Some("Uuser"));
                assert_eq!(event.group_id(), Some("Cgroup"));
                match &event.message {
                    MessageContent::Text { text, .. } => assert_eq!(text, "JOB : J1001"),
                    other => panic!("unexpected message: {other:?}"),
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_and_message_types() {
        let body = r#"{
            "events": [
                {"type": "follow", "replyToken": "t"},
                {"type": "message", "replyToken": "t2",
                 "message": {"id": "1", "type": "sticker", "packageId": "1", "stickerId": "2"}}
            ]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(body).unwrap();
        assert!(matches!(payload.events[0], WebhookEvent::Unsupported));
        match &payload.events[1] {
            WebhookEvent::Message(event) => {
                assert!(matches!(event.message, MessageContent::Other));
                assert_eq!(event.message_id(), None);
                assert_eq!(event.source_kind(), None);
                assert_eq!(event.user_id(), None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_verification_payload() {
        let payload: WebhookPayload =
            serde_json::from_str(r#"{"destination": "U1", "events": []}"#).unwrap();
        assert!(payload.events.is_empty());
    }
}

//! Messages exchanged inside a session.
//!
//! The body of a message is a closed variant: either plain text or an
//! attachment whose bytes live in external object storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata recorded for an uploaded attachment.
///
/// The bytes themselves are hosted by the object store; only the returned
/// URL and size are kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub file_name: String,
    pub byte_size: u64,
    pub url: String,
    pub mime_type: String,
}

impl AttachmentMeta {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Body of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text { content: String },
    Attachment(AttachmentMeta),
}

impl MessagePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Text { .. } => "text",
            MessagePayload::Attachment(_) => "attachment",
        }
    }
}

/// A persisted message.
///
/// `cost` is zero for mentor messages and for policy-exempt student
/// messages. A message with a non-zero cost always has its debit in
/// `transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender_id: Uuid,
    pub payload: MessagePayload,
    pub cost: i64,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_serde() {
        let payload = MessagePayload::Text {
            content: "hello".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_attachment_payload_serde() {
        let json = serde_json::json!({
            "kind": "attachment",
            "file_name": "notes.pdf",
            "byte_size": 2048,
            "url": "https://cdn.example/notes.pdf",
            "mime_type": "application/pdf"
        });
        let payload: MessagePayload = serde_json::from_value(json).unwrap();
        match payload {
            MessagePayload::Attachment(meta) => {
                assert_eq!(meta.byte_size, 2048);
                assert!(!meta.is_image());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = serde_json::json!({ "kind": "video", "url": "x" });
        assert!(serde_json::from_value::<MessagePayload>(json).is_err());
    }
}

//! Message and reply payloads exchanged between channels and the command service.

use serde::{Deserialize, Deserializer, Serialize};

/// An inbound chat message, scoped to a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Raw text body as typed by the user.
    pub body: String,
    /// Conversation or group the message belongs to.
    pub conversation_id: String,
}

impl InboundMessage {
    pub fn new(body: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

/// Wire value of the `error` facet: a flag, a message, or anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyError {
    Flag(bool),
    Message(String),
    Other(serde_json::Value),
}

impl ReplyError {
    /// JSON truthiness: `false`, `0`, `""` and `null` are not errors.
    pub fn is_set(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Message(message) => !message.is_empty(),
            Self::Other(serde_json::Value::Null) => false,
            Self::Other(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Self::Other(_) => true,
        }
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One unit emitted by the command service's reply stream.
///
/// Facets are independent: an item may carry `text` and `images` together.
/// Absent facets are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyItem {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<ReplyImage>,
}

impl ReplyItem {
    /// Informational item that needs no delivery.
    pub fn skipped(text: impl Into<String>) -> Self {
        Self {
            skipped: true,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.as_ref().is_some_and(ReplyError::is_set)
    }

    /// Text to show for an error item.
    ///
    /// Prefers `text`, then a string-valued `error`, then `fallback`.
    /// Returns `None` when the item is not an error.
    pub fn error_text<'a>(&'a self, fallback: &'a str) -> Option<&'a str> {
        if !self.is_error() {
            return None;
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return Some(text);
        }
        match &self.error {
            Some(ReplyError::Message(message)) if !message.is_empty() => Some(message),
            _ => Some(fallback),
        }
    }
}

/// One attachment of a reply, either inline content or a remote URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<ImageData>,
}

/// Inline attachment content as produced by the command service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub content: String,
    pub name: String,
    pub extension: String,
}

/// Media ready to hand to a channel's outbound adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
    pub filename: String,
}

impl MediaAttachment {
    /// Build the attachment for the image at 1-based `index` within its reply.
    pub fn numbered(index: usize, image: &ImageData) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            data: image.content.clone(),
            filename: format!("{index}-{}.{}", image.name, image.extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_item_combines_text_and_images() {
        let item: ReplyItem = serde_json::from_str(
            r#"{"text":"hi","images":[{"url":"http://x/1.png"},{"imageData":{"mimeType":"image/png","content":"AA==","name":"f","extension":"png"}}]}"#,
        )
        .unwrap();
        assert_eq!(item.text.as_deref(), Some("hi"));
        assert_eq!(item.images.len(), 2);
        assert_eq!(item.images[0].url.as_deref(), Some("http://x/1.png"));
        assert_eq!(item.images[1].image_data.as_ref().unwrap().name, "f");
        assert!(!item.skipped);
        assert!(!item.is_error());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let item: ReplyItem = serde_json::from_str(r#"{"foo":1,"bar":"baz"}"#).unwrap();
        assert_eq!(item, ReplyItem::default());
    }

    #[test]
    fn error_flag_uses_text() {
        let item: ReplyItem = serde_json::from_str(r#"{"error":true,"text":"boom"}"#).unwrap();
        assert_eq!(item.error_text("fallback"), Some("boom"));
    }

    #[test]
    fn error_message_used_when_text_missing() {
        let item: ReplyItem = serde_json::from_str(r#"{"error":"bad command"}"#).unwrap();
        assert_eq!(item.error_text("fallback"), Some("bad command"));
    }

    #[test]
    fn error_without_text_falls_back() {
        let item: ReplyItem = serde_json::from_str(r#"{"error":true}"#).unwrap();
        assert_eq!(item.error_text("fallback"), Some("fallback"));
    }

    #[test]
    fn error_false_is_not_an_error() {
        let item: ReplyItem = serde_json::from_str(r#"{"error":false,"text":"ok"}"#).unwrap();
        assert!(!item.is_error());
        assert_eq!(item.error_text("fallback"), None);
    }

    #[test]
    fn null_facets_are_absent() {
        let item: ReplyItem =
            serde_json::from_str(r#"{"text":"a","images":null,"skipped":null,"error":null}"#)
                .unwrap();
        assert_eq!(item, ReplyItem::text("a"));
    }

    #[test]
    fn structured_error_is_an_error() {
        let item: ReplyItem = serde_json::from_str(r#"{"error":{"code":1}}"#).unwrap();
        assert!(item.is_error());
        assert_eq!(item.error_text("fallback"), Some("fallback"));
    }

    #[test]
    fn falsy_error_values_are_not_errors() {
        for raw in [r#"{"error":0}"#, r#"{"error":""}"#, r#"{"error":0.0}"#] {
            let item: ReplyItem = serde_json::from_str(raw).unwrap();
            assert!(!item.is_error(), "{raw}");
        }
        let item: ReplyItem = serde_json::from_str(r#"{"error":[]}"#).unwrap();
        assert!(item.is_error());
    }

    #[test]
    fn numbered_attachment_filename() {
        let image = ImageData {
            mime_type: "image/png".into(),
            content: "AA==".into(),
            name: "chart".into(),
            extension: "png".into(),
        };
        let media = MediaAttachment::numbered(3, &image);
        assert_eq!(media.filename, "3-chart.png");
        assert_eq!(media.mime_type, "image/png");
    }

    #[test]
    fn skipped_item_serializes_compactly() {
        let json = serde_json::to_value(ReplyItem::skipped("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"skipped": true, "text": "nope"}));
    }
}

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// Where the bytes of an attachment live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentSource {
    /// Key of an object already uploaded to storage
    Key(String),
    /// Inline `data:` URL
    DataUrl(String),
}

/// An attachment picked in the composer, before it is sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub source: AttachmentSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn image(source: AttachmentSource) -> Self {
        Self {
            kind: AttachmentKind::Image,
            source,
            name: None,
            mime_type: None,
        }
    }

    pub fn file(source: AttachmentSource, name: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::File,
            source,
            name: Some(name.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Attachment reference as it appears inside a serialized message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl From<&Attachment> for AttachmentRef {
    fn from(attachment: &Attachment) -> Self {
        let (key, url) = match &attachment.source {
            AttachmentSource::Key(key) => (Some(key.clone()), None),
            AttachmentSource::DataUrl(url) => (None, Some(url.clone())),
        };
        Self {
            key,
            url,
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: AttachmentRef },
    Attachment { attachment: AttachmentRef },
}

/// Decoded form of [`crate::ChatMessage::content`]
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Plain text when there is nothing attached, otherwise ordered parts:
    /// the text first, then images, then other attachments.
    pub fn build(text: &str, attachments: &[Attachment]) -> Self {
        if attachments.is_empty() {
            return MessageContent::Text(text.to_string());
        }

        let mut parts = Vec::with_capacity(attachments.len() + 1);
        if !text.trim().is_empty() {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        parts.extend(
            attachments
                .iter()
                .filter(|a| a.kind == AttachmentKind::Image)
                .map(|a| ContentPart::ImageUrl {
                    image_url: AttachmentRef::from(a),
                }),
        );
        parts.extend(
            attachments
                .iter()
                .filter(|a| a.kind == AttachmentKind::File)
                .map(|a| ContentPart::Attachment {
                    attachment: AttachmentRef::from(a),
                }),
        );
        MessageContent::Parts(parts)
    }

    /// Parses a stored message content string. Anything that is not a JSON
    /// array of parts is plain text.
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            if let Ok(parts) = serde_json::from_str::<Vec<ContentPart>>(trimmed) {
                return MessageContent::Parts(parts);
            }
        }
        MessageContent::Text(content.to_string())
    }

    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        match self {
            MessageContent::Text(text) => Ok(text.clone()),
            MessageContent::Parts(parts) => serde_json::to_string(parts),
        }
    }

    /// Text portion only, parts joined by newlines
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn attachment_count(&self) -> usize {
        match self {
            MessageContent::Text(_) => 0,
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| !matches!(part, ContentPart::Text { .. }))
                .count(),
        }
    }
}

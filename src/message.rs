//! Host message objects as carried on the event bus and the send operation.
//! Unknown host fields are kept in `extra` so a rewrite only ever replaces
//! `content`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message as delivered by the "message created" event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
    #[serde(default, alias = "stickerItems", skip_serializing_if = "Vec::is_empty")]
    pub sticker_items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(
        channel_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            channel_id: channel_id.into(),
            author: Some(Author {
                id: author_id.into(),
                extra: Map::new(),
            }),
            message_reference: None,
            referenced_message: None,
            reference: None,
            sticker_items: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }

    pub fn is_sticker(&self) -> bool {
        !self.sticker_items.is_empty()
    }

    /// Copy of this message with `content` replaced. Reply/reference fields
    /// and everything else carry over.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Payload handed to the host send operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extra: Map::new(),
        }
    }
}

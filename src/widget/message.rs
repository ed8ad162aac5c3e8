//! Chat log data model.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shop::ProductCard;

/// Who a bubble belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// CSS class of the bubble.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::User => "user-message",
            Self::Bot => "bot-message",
        }
    }
}

/// Content of a bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plain text. Always escaped when rendered.
    Text { text: String },
    /// Reply text from the shop, which may carry a few inline tags
    /// (`<strong>`, `<br>`, links). Sanitized when rendered.
    Markup { text: String },
    /// Structured product card.
    Product(ProductCard),
}

impl MessageBody {
    /// Plain text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Shop-supplied reply that may contain inline markup.
    pub fn markup(text: impl Into<String>) -> Self {
        Self::Markup { text: text.into() }
    }

    /// Text content, if this is a text or markup bubble.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Markup { text } => Some(text),
            Self::Product(_) => None,
        }
    }
}

impl From<&str> for MessageBody {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for MessageBody {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<ProductCard> for MessageBody {
    fn from(value: ProductCard) -> Self {
        Self::Product(value)
    }
}

/// A single bubble in the chat log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub sender: Sender,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(body: impl Into<MessageBody>, sender: Sender) -> Self {
        Self {
            sender,
            body: body.into(),
            sent_at: Utc::now(),
        }
    }

    /// Text content, if this is a text or markup bubble.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }
}

/// Append-only, ordered list of bubbles.
///
/// The lock is only held for the push or the copy, never across an await.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: RwLock<Vec<Message>>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: Message) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Copy of the log in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Opaque message identifier, unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// One exchanged utterance. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    id: MessageId,
    role: Role,
    content: String,
    created_at: OffsetDateTime,
    is_error: bool,
}

impl ChatMessage {
    fn new(role: Role, content: String, is_error: bool) -> Self {
        Self {
            id: MessageId::next(),
            role,
            content,
            created_at: OffsetDateTime::now_utc(),
            is_error,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), false)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), false)
    }

    /// Assistant-side rendering of a failed exchange.
    pub fn error(reason: impl fmt::Display) -> Self {
        Self::new(Role::Assistant, format!("Error: {reason}"), true)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

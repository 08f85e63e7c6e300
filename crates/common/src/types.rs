//! Message types exchanged between adapters, the bot, and command handlers.

use std::fmt;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tokio_util::sync::CancellationToken,
};

/// Name of the platform an adapter talks to (e.g. "console", "slack").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotType(String);

impl BotType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a conversation participant.
///
/// Conversation state is scoped to this key, so two inputs with equal keys
/// continue the same dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderKey(String);

impl SenderKey {
    /// Build a key scoped to a platform, e.g. `slack|C0123`.
    pub fn new(bot_type: &BotType, id: impl fmt::Display) -> Self {
        Self(format!("{bot_type}|{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SenderKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SenderKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Adapter-defined destination for a reply (channel ID, room, chat ID...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyTarget(String);

impl ReplyTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inbound message, immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    sender_key: SenderKey,
    message: String,
    sent_at: DateTime<Utc>,
    reply_to: ReplyTarget,
}

impl Input {
    pub fn new(
        sender_key: SenderKey,
        message: impl Into<String>,
        sent_at: DateTime<Utc>,
        reply_to: ReplyTarget,
    ) -> Self {
        Self {
            sender_key,
            message: message.into(),
            sent_at,
            reply_to,
        }
    }

    pub fn sender_key(&self) -> &SenderKey {
        &self.sender_key
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn reply_to(&self) -> &ReplyTarget {
        &self.reply_to
    }
}

/// An outbound message handed to the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub destination: ReplyTarget,
    pub content: String,
}

impl Output {
    pub fn new(destination: ReplyTarget, content: impl Into<String>) -> Self {
        Self {
            destination,
            content: content.into(),
        }
    }
}

/// Execution context passed to every handler.
///
/// Cloning shares the same cancellation token; [`Context::child`] derives a
/// token that is cancelled with its parent but can also be cancelled alone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

//! Chat domain types: conversations and their persisted messages.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use severatee_core::{AppError, UserId};
use uuid::Uuid;

/// Title assigned to chats created without one.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Unique identifier for a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(Uuid);

impl ChatId {
    /// Creates a new random chat identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a chat identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ChatId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Whether a chat is mid-generation or settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// An assistant reply is being produced.
    Streaming,
    /// All messages are persisted.
    Complete,
}

impl ChatStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Complete => "complete",
        }
    }
}

impl FromStr for ChatStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "streaming" => Ok(Self::Streaming),
            "complete" => Ok(Self::Complete),
            _ => Err(AppError::Validation(format!(
                "unknown chat status '{value}'"
            ))),
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human participant.
    User,
    /// The model reply.
    Assistant,
    /// Conversation-level instructions.
    System,
}

impl MessageRole {
    /// Returns the stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(AppError::Validation(format!(
                "unknown message role '{value}'"
            ))),
        }
    }
}

/// A conversation owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Stable chat identifier.
    pub id: ChatId,
    /// Display title.
    pub title: String,
    /// Owning user.
    pub user_id: UserId,
    /// Generation state.
    pub status: ChatStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub updated_at: DateTime<Utc>,
}

/// One persisted message within a chat.
///
/// Message ids are caller-supplied strings so client-generated ids survive a
/// round trip through persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Caller-supplied message identifier.
    pub id: String,
    /// Chat the message belongs to.
    pub chat_id: ChatId,
    /// Message author.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

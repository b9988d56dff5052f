//! Chat ports and application service.
//!
//! Chats and their messages are thin relational records; inference itself is
//! delegated to the hosted completion API behind [`ChatCompletionClient`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use severatee_core::{AppError, AppResult, NonEmptyString, UserId, UserIdentity};
use severatee_domain::{Chat, ChatId, ChatMessage, ChatStatus, DEFAULT_CHAT_TITLE, MessageRole};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Insert payload for a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    /// Caller-supplied message identifier.
    pub id: String,
    /// Message author.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Creation timestamp; `None` means now.
    pub created_at: Option<DateTime<Utc>>,
}

/// One turn handed to the completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMessage {
    /// Turn author.
    pub role: MessageRole,
    /// Turn text.
    pub content: String,
}

/// Repository port for chat persistence.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Inserts a chat owned by a user.
    async fn insert_chat(&self, user_id: UserId, title: &str) -> AppResult<Chat>;

    /// Finds a chat by id.
    async fn find_chat(&self, chat_id: ChatId) -> AppResult<Option<Chat>>;

    /// Lists a user's chats, most recently updated first.
    async fn list_chats_for_user(&self, user_id: UserId) -> AppResult<Vec<Chat>>;

    /// Lists messages of a chat ordered by creation time.
    async fn list_messages(&self, chat_id: ChatId) -> AppResult<Vec<ChatMessage>>;

    /// Sets the chat status and refreshes the activity timestamp.
    async fn set_chat_status(&self, chat_id: ChatId, status: ChatStatus) -> AppResult<Chat>;

    /// Replaces all messages of a chat in one transaction and marks the chat
    /// complete.
    async fn replace_messages(
        &self,
        chat_id: ChatId,
        messages: Vec<NewChatMessage>,
    ) -> AppResult<()>;

    /// Appends one message and refreshes the chat activity timestamp.
    async fn append_message(
        &self,
        chat_id: ChatId,
        message: NewChatMessage,
    ) -> AppResult<ChatMessage>;
}

/// Port for the hosted chat-completion API.
///
/// Non-streaming request/response; the provider, prompt assembly, and model
/// configuration live in the adapter.
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Produces an assistant reply for the given conversation.
    async fn complete(&self, messages: &[CompletionMessage]) -> AppResult<String>;
}

/// A chat joined with its ordered messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatWithMessages {
    /// The chat row.
    pub chat: Chat,
    /// Messages ordered by creation time.
    pub messages: Vec<ChatMessage>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for chat management and completion passthrough.
#[derive(Clone)]
pub struct ChatService {
    repository: Arc<dyn ChatRepository>,
    completion_client: Arc<dyn ChatCompletionClient>,
}

impl ChatService {
    /// Creates a new chat service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        completion_client: Arc<dyn ChatCompletionClient>,
    ) -> Self {
        Self {
            repository,
            completion_client,
        }
    }

    /// Creates a chat owned by the caller.
    pub async fn create_chat(
        &self,
        actor: &UserIdentity,
        title: Option<String>,
    ) -> AppResult<Chat> {
        let title = match title {
            Some(value) => NonEmptyString::new(value)?.into(),
            None => DEFAULT_CHAT_TITLE.to_owned(),
        };

        self.repository.insert_chat(actor.user_id(), &title).await
    }

    /// Returns a chat with its messages.
    pub async fn chat(&self, actor: &UserIdentity, chat_id: ChatId) -> AppResult<ChatWithMessages> {
        let chat = self.require_owned_chat(actor, chat_id).await?;
        let messages = self.repository.list_messages(chat_id).await?;

        Ok(ChatWithMessages { chat, messages })
    }

    /// Lists the caller's chats, most recently updated first.
    pub async fn user_chats(&self, actor: &UserIdentity) -> AppResult<Vec<Chat>> {
        self.repository.list_chats_for_user(actor.user_id()).await
    }

    /// Updates the chat status.
    pub async fn set_status(
        &self,
        actor: &UserIdentity,
        chat_id: ChatId,
        status: ChatStatus,
    ) -> AppResult<Chat> {
        self.require_owned_chat(actor, chat_id).await?;
        self.repository.set_chat_status(chat_id, status).await
    }

    /// Replaces all messages of a chat and marks it complete.
    pub async fn save_messages(
        &self,
        actor: &UserIdentity,
        chat_id: ChatId,
        messages: Vec<NewChatMessage>,
    ) -> AppResult<()> {
        self.require_owned_chat(actor, chat_id).await?;
        self.repository.replace_messages(chat_id, messages).await
    }

    /// Appends a single message to a chat.
    pub async fn add_message(
        &self,
        actor: &UserIdentity,
        chat_id: ChatId,
        message: NewChatMessage,
    ) -> AppResult<ChatMessage> {
        self.require_owned_chat(actor, chat_id).await?;
        self.repository.append_message(chat_id, message).await
    }

    /// Sends a user message and returns the persisted assistant reply.
    ///
    /// The user message is stored before the completion call, so a provider
    /// failure leaves it in place for a retry.
    pub async fn send_message(
        &self,
        actor: &UserIdentity,
        chat_id: ChatId,
        content: String,
    ) -> AppResult<ChatMessage> {
        let content: String = NonEmptyString::new(content)?.into();
        self.require_owned_chat(actor, chat_id).await?;

        self.repository
            .append_message(
                chat_id,
                NewChatMessage {
                    id: Uuid::new_v4().to_string(),
                    role: MessageRole::User,
                    content,
                    created_at: None,
                },
            )
            .await?;

        let history: Vec<CompletionMessage> = self
            .repository
            .list_messages(chat_id)
            .await?
            .into_iter()
            .map(|message| CompletionMessage {
                role: message.role,
                content: message.content,
            })
            .collect();

        let reply = self.completion_client.complete(&history).await?;

        self.repository
            .append_message(
                chat_id,
                NewChatMessage {
                    id: Uuid::new_v4().to_string(),
                    role: MessageRole::Assistant,
                    content: reply,
                    created_at: None,
                },
            )
            .await
    }

    async fn require_owned_chat(
        &self,
        actor: &UserIdentity,
        chat_id: ChatId,
    ) -> AppResult<Chat> {
        let chat = self
            .repository
            .find_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound("chat not found".to_owned()))?;

        if chat.user_id != actor.user_id() {
            return Err(AppError::Forbidden(
                "you don't have access to this chat".to_owned(),
            ));
        }

        Ok(chat)
    }
}

use serde::{Deserialize, Serialize};
use severatee_application::ChatWithMessages;
use severatee_domain::{Chat, ChatMessage};
use ts_rs::TS;

/// Incoming payload for chat creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-chat-request.ts"
)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

/// Incoming payload for a chat status update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-chat-status-request.ts"
)]
pub struct UpdateChatStatusRequest {
    pub status: String,
}

/// One message in a save/add request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/chat-message-input.ts"
)]
pub struct ChatMessageInput {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: Option<String>,
}

/// Incoming payload replacing a chat's message history.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/save-messages-request.ts"
)]
pub struct SaveMessagesRequest {
    pub messages: Vec<ChatMessageInput>,
}

/// Incoming payload appending one message.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/add-message-request.ts"
)]
pub struct AddMessageRequest {
    pub message: ChatMessageInput,
}

/// Incoming payload for the completion passthrough.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/send-message-request.ts"
)]
pub struct SendMessageRequest {
    pub content: String,
}

/// API representation of a chat.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/chat-response.ts"
)]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// API representation of a chat message.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/chat-message-response.ts"
)]
pub struct ChatMessageResponse {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// A chat joined with its ordered messages.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/chat-with-messages-response.ts"
)]
pub struct ChatWithMessagesResponse {
    pub chat: ChatResponse,
    pub messages: Vec<ChatMessageResponse>,
}

impl From<Chat> for ChatResponse {
    fn from(value: Chat) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            status: value.status.as_str().to_owned(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(value: ChatMessage) -> Self {
        Self {
            id: value.id,
            role: value.role.as_str().to_owned(),
            content: value.content,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

impl From<ChatWithMessages> for ChatWithMessagesResponse {
    fn from(value: ChatWithMessages) -> Self {
        Self {
            chat: ChatResponse::from(value.chat),
            messages: value
                .messages
                .into_iter()
                .map(ChatMessageResponse::from)
                .collect(),
        }
    }
}

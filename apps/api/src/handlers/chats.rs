use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use severatee_application::NewChatMessage;
use severatee_core::{AppError, UserIdentity};
use severatee_domain::{ChatId, ChatStatus, MessageRole};
use uuid::Uuid;

use crate::dto::{
    AddMessageRequest, ChatMessageInput, ChatMessageResponse, ChatResponse,
    ChatWithMessagesResponse, CreateChatRequest, SaveMessagesRequest, SendMessageRequest,
    UpdateChatStatusRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateChatRequest>,
) -> ApiResult<(StatusCode, Json<ChatResponse>)> {
    let chat = state.chat_service.create_chat(&user, payload.title).await?;

    Ok((StatusCode::CREATED, Json(ChatResponse::from(chat))))
}

pub async fn list_chats_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<ChatResponse>>> {
    let chats = state
        .chat_service
        .user_chats(&user)
        .await?
        .into_iter()
        .map(ChatResponse::from)
        .collect();

    Ok(Json(chats))
}

pub async fn get_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<ChatWithMessagesResponse>> {
    let chat = state
        .chat_service
        .chat(&user, ChatId::from_uuid(chat_id))
        .await?;

    Ok(Json(ChatWithMessagesResponse::from(chat)))
}

pub async fn update_chat_status_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<UpdateChatStatusRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let status = ChatStatus::from_str(&payload.status)?;
    let chat = state
        .chat_service
        .set_status(&user, ChatId::from_uuid(chat_id), status)
        .await?;

    Ok(Json(ChatResponse::from(chat)))
}

pub async fn save_messages_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<SaveMessagesRequest>,
) -> ApiResult<StatusCode> {
    let messages = payload
        .messages
        .into_iter()
        .map(decode_message)
        .collect::<Result<Vec<_>, _>>()?;

    state
        .chat_service
        .save_messages(&user, ChatId::from_uuid(chat_id), messages)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_message_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<AddMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessageResponse>)> {
    let message = state
        .chat_service
        .add_message(
            &user,
            ChatId::from_uuid(chat_id),
            decode_message(payload.message)?,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ChatMessageResponse::from(message))))
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<Json<ChatMessageResponse>> {
    let reply = state
        .chat_service
        .send_message(&user, ChatId::from_uuid(chat_id), payload.content)
        .await?;

    Ok(Json(ChatMessageResponse::from(reply)))
}

fn decode_message(input: ChatMessageInput) -> Result<NewChatMessage, AppError> {
    let created_at = input
        .created_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    Ok(NewChatMessage {
        id: input.id,
        role: MessageRole::from_str(&input.role)?,
        content: input.content,
        created_at,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| AppError::Validation(format!("invalid timestamp '{value}': {error}")))
}

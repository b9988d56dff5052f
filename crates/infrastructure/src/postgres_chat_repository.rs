//! PostgreSQL-backed chat repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};

use severatee_application::{ChatRepository, NewChatMessage};
use severatee_core::{AppError, AppResult, UserId};
use severatee_domain::{Chat, ChatId, ChatMessage, ChatStatus, MessageRole};

/// PostgreSQL implementation of the chat repository port.
#[derive(Clone)]
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChatRow {
    id: uuid::Uuid,
    title: String,
    user_id: uuid::Uuid,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ChatRow {
    fn into_domain(self) -> AppResult<Chat> {
        Ok(Chat {
            id: ChatId::from_uuid(self.id),
            title: self.title,
            user_id: UserId::from_uuid(self.user_id),
            status: ChatStatus::from_str(&self.status).map_err(|error| {
                AppError::Internal(format!("failed to decode chat status: {error}"))
            })?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    chat_id: uuid::Uuid,
    role: String,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl MessageRow {
    fn into_domain(self) -> AppResult<ChatMessage> {
        Ok(ChatMessage {
            id: self.id,
            chat_id: ChatId::from_uuid(self.chat_id),
            role: MessageRole::from_str(&self.role).map_err(|error| {
                AppError::Internal(format!("failed to decode message role: {error}"))
            })?,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

const CHAT_COLUMNS: &str = "id, title, user_id, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, chat_id, role, content, created_at";

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn insert_chat(&self, user_id: UserId, title: &str) -> AppResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            INSERT INTO chats (user_id, title)
            VALUES ($1, $2)
            RETURNING {CHAT_COLUMNS}
            "#,
        ))
        .bind(user_id.as_uuid())
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert chat: {error}")))?;

        row.into_domain()
    }

    async fn find_chat(&self, chat_id: ChatId) -> AppResult<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE id = $1
            "#,
        ))
        .bind(chat_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find chat: {error}")))?;

        row.map(ChatRow::into_domain).transpose()
    }

    async fn list_chats_for_user(&self, user_id: UserId) -> AppResult<Vec<Chat>> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list chats: {error}")))?;

        rows.into_iter().map(ChatRow::into_domain).collect()
    }

    async fn list_messages(&self, chat_id: ChatId) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at, id
            "#,
        ))
        .bind(chat_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list messages: {error}")))?;

        rows.into_iter().map(MessageRow::into_domain).collect()
    }

    async fn set_chat_status(&self, chat_id: ChatId, status: ChatStatus) -> AppResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            UPDATE chats
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {CHAT_COLUMNS}
            "#,
        ))
        .bind(chat_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update chat status: {error}")))?
        .ok_or_else(|| AppError::NotFound("chat not found".to_owned()))?;

        row.into_domain()
    }

    async fn replace_messages(
        &self,
        chat_id: ChatId,
        messages: Vec<NewChatMessage>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM chat_messages
            WHERE chat_id = $1
            "#,
        )
        .bind(chat_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear messages: {error}")))?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (id, chat_id, role, content, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&message.id)
            .bind(chat_id.as_uuid())
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.created_at.unwrap_or_else(Utc::now))
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to insert message: {error}")))?;
        }

        sqlx::query(
            r#"
            UPDATE chats
            SET status = 'complete', updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(chat_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to touch chat: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn append_message(
        &self,
        chat_id: ChatId,
        message: NewChatMessage,
    ) -> AppResult<ChatMessage> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO chat_messages (id, chat_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(&message.id)
        .bind(chat_id.as_uuid())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.unwrap_or_else(Utc::now))
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert message: {error}")))?;

        sqlx::query(
            r#"
            UPDATE chats
            SET updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(chat_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to touch chat: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        row.into_domain()
    }
}

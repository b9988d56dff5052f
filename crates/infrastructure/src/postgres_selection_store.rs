//! PostgreSQL-backed last-selected-workspace store.
//!
//! One `last_workspace_id` row per user; stale selections are bypassed at
//! read time by the selection service, never deleted here.

use async_trait::async_trait;
use sqlx::PgPool;

use severatee_application::WorkspaceSelectionStore;
use severatee_core::{AppError, AppResult, UserId, WorkspaceId};

/// PostgreSQL implementation of the workspace selection store.
#[derive(Clone)]
pub struct PostgresWorkspaceSelectionStore {
    pool: PgPool,
}

impl PostgresWorkspaceSelectionStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceSelectionStore for PostgresWorkspaceSelectionStore {
    async fn last_selected(&self, user_id: UserId) -> AppResult<Option<WorkspaceId>> {
        let workspace_id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT last_workspace_id
            FROM workspace_selections
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load workspace selection: {error}"))
        })?;

        Ok(workspace_id.map(WorkspaceId::from_uuid))
    }

    async fn save_selection(&self, user_id: UserId, workspace_id: WorkspaceId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workspace_selections (user_id, last_workspace_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET
                last_workspace_id = EXCLUDED.last_workspace_id,
                updated_at = now()
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save workspace selection: {error}"))
        })?;

        Ok(())
    }
}

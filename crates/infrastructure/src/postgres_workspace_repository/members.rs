use severatee_domain::{OwnerMutation, ensure_not_last_owner};
use sqlx::Postgres;

use super::*;

impl PostgresWorkspaceRepository {
    pub(super) async fn find_membership_impl(
        &self,
        membership_id: MembershipId,
    ) -> AppResult<Option<WorkspaceMember>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM workspace_members
            WHERE id = $1
            "#,
        ))
        .bind(membership_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find membership: {error}")))?;

        row.map(MemberRow::into_domain).transpose()
    }

    pub(super) async fn find_active_membership_impl(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Option<WorkspaceMember>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2 AND deleted_at IS NULL
            LIMIT 1
            "#,
        ))
        .bind(workspace_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find active membership: {error}"))
        })?;

        row.map(MemberRow::into_domain).transpose()
    }

    pub(super) async fn list_members_impl(
        &self,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<MemberRecord>> {
        #[derive(Debug, sqlx::FromRow)]
        struct MemberJoinRow {
            id: uuid::Uuid,
            user_id: uuid::Uuid,
            role: String,
            name: Option<String>,
            email: Option<String>,
        }

        let rows = sqlx::query_as::<_, MemberJoinRow>(
            r#"
            SELECT members.id, members.user_id, members.role,
                   profiles.name, profiles.email
            FROM workspace_members AS members
            INNER JOIN profiles ON profiles.id = members.user_id
            WHERE members.workspace_id = $1 AND members.deleted_at IS NULL
            ORDER BY members.created_at, members.id
            "#,
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list members: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(MemberRecord {
                    membership_id: MembershipId::from_uuid(row.id),
                    user_id: UserId::from_uuid(row.user_id),
                    role: decode_role(&row.role)?,
                    name: row.name,
                    email: row.email,
                })
            })
            .collect()
    }

    pub(super) async fn change_member_role_impl(
        &self,
        membership_id: MembershipId,
        new_role: Role,
    ) -> AppResult<WorkspaceMember> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let target = Self::lock_membership(&mut transaction, membership_id).await?;
        let owner_count =
            Self::lock_active_owners(&mut transaction, target.workspace_id).await?;
        ensure_not_last_owner(
            target.role,
            OwnerMutation::ChangeRole(new_role),
            owner_count,
        )?;

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            UPDATE workspace_members
            SET role = $2, updated_at = now()
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#,
        ))
        .bind(membership_id.as_uuid())
        .bind(new_role.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update member role: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        row.into_domain()
    }

    pub(super) async fn remove_member_impl(
        &self,
        membership_id: MembershipId,
    ) -> AppResult<WorkspaceMember> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let target = Self::lock_membership(&mut transaction, membership_id).await?;
        let owner_count =
            Self::lock_active_owners(&mut transaction, target.workspace_id).await?;
        ensure_not_last_owner(target.role, OwnerMutation::Remove, owner_count)?;

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            UPDATE workspace_members
            SET deleted_at = now()
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#,
        ))
        .bind(membership_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove member: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        row.into_domain()
    }

    pub(super) async fn member_email_exists_impl(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM workspace_members AS members
                INNER JOIN profiles ON profiles.id = members.user_id
                WHERE members.workspace_id = $1
                  AND members.deleted_at IS NULL
                  AND LOWER(profiles.email) = LOWER($2)
            )
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check member email: {error}"))
        })
    }

    /// Locks the target membership row for the rest of the transaction.
    async fn lock_membership(
        transaction: &mut sqlx::Transaction<'_, Postgres>,
        membership_id: MembershipId,
    ) -> AppResult<WorkspaceMember> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM workspace_members
            WHERE id = $1
            FOR UPDATE
            "#,
        ))
        .bind(membership_id.as_uuid())
        .fetch_optional(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock membership: {error}")))?
        .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;

        row.into_domain()
    }

    /// Locks the workspace's active owner rows and returns their count.
    ///
    /// Locking makes the count-then-act guard atomic: two concurrent
    /// mutations against the last two owners serialize here instead of both
    /// observing a count of two.
    async fn lock_active_owners(
        transaction: &mut sqlx::Transaction<'_, Postgres>,
        workspace_id: WorkspaceId,
    ) -> AppResult<i64> {
        let owner_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM workspace_members
            WHERE workspace_id = $1 AND role = 'owner' AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock owner rows: {error}")))?;

        Ok(owner_ids.len() as i64)
    }
}

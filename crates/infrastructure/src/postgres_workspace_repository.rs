//! PostgreSQL-backed workspace repository.
//!
//! Owns the transactional guarantees of the workspace core: workspace
//! creation with first-owner enrollment, the last-owner guard evaluated
//! under row locks, and invitation acceptance as a single transaction.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use severatee_application::{
    InvitationRecord, MemberRecord, NewInvitation, NewWorkspace, UserInvitation, WorkspaceChanges,
    WorkspaceMembership, WorkspaceRepository,
};
use severatee_core::{AppError, AppResult, UserId, WorkspaceId};
use severatee_domain::{
    InvitationId, InvitationStatus, MembershipId, Role, Workspace, WorkspaceInvitation,
    WorkspaceMember,
};

mod invitations;
mod members;

/// PostgreSQL implementation of the workspace repository port.
#[derive(Clone)]
pub struct PostgresWorkspaceRepository {
    pool: PgPool,
}

impl PostgresWorkspaceRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct WorkspaceRow {
    id: uuid::Uuid,
    name: String,
    slug: Option<String>,
    description: Option<String>,
    created_by: uuid::Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: WorkspaceId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    id: uuid::Uuid,
    workspace_id: uuid::Uuid,
    user_id: uuid::Uuid,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl MemberRow {
    fn into_domain(self) -> AppResult<WorkspaceMember> {
        Ok(WorkspaceMember {
            id: MembershipId::from_uuid(self.id),
            workspace_id: WorkspaceId::from_uuid(self.workspace_id),
            user_id: UserId::from_uuid(self.user_id),
            role: decode_role(&self.role)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvitationRow {
    id: uuid::Uuid,
    workspace_id: uuid::Uuid,
    email: String,
    role: String,
    status: String,
    invited_by: Option<uuid::Uuid>,
    expires_at: chrono::DateTime<chrono::Utc>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl InvitationRow {
    fn into_domain(self) -> AppResult<WorkspaceInvitation> {
        Ok(WorkspaceInvitation {
            id: InvitationId::from_uuid(self.id),
            workspace_id: WorkspaceId::from_uuid(self.workspace_id),
            email: self.email,
            role: decode_role(&self.role)?,
            status: InvitationStatus::from_str(&self.status).map_err(|error| {
                AppError::Internal(format!("failed to decode invitation status: {error}"))
            })?,
            invited_by: self.invited_by.map(UserId::from_uuid),
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn decode_role(value: &str) -> AppResult<Role> {
    Role::from_str(value)
        .map_err(|error| AppError::Internal(format!("failed to decode stored role: {error}")))
}

/// Maps a unique-constraint violation to `Conflict`, anything else to
/// `Internal`.
fn conflict_or_internal(error: sqlx::Error, conflict_message: &str, context: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error {
        if database_error.code().as_deref() == Some("23505") {
            return AppError::Conflict(conflict_message.to_owned());
        }
    }

    AppError::Internal(format!("{context}: {error}"))
}

const WORKSPACE_COLUMNS: &str =
    "id, name, slug, description, created_by, created_at, updated_at, deleted_at";
const MEMBER_COLUMNS: &str =
    "id, workspace_id, user_id, role, created_at, updated_at, deleted_at";
const INVITATION_COLUMNS: &str =
    "id, workspace_id, email, role, status, invited_by, expires_at, created_at, updated_at";

#[async_trait]
impl WorkspaceRepository for PostgresWorkspaceRepository {
    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
    ) -> AppResult<(Workspace, WorkspaceMember)> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let workspace_row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            r#"
            INSERT INTO workspaces (name, slug, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {WORKSPACE_COLUMNS}
            "#,
        ))
        .bind(&workspace.name)
        .bind(&workspace.slug)
        .bind(&workspace.description)
        .bind(workspace.created_by.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            conflict_or_internal(
                error,
                "a workspace with this slug already exists",
                "failed to insert workspace",
            )
        })?;

        let member_row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING {MEMBER_COLUMNS}
            "#,
        ))
        .bind(workspace_row.id)
        .bind(workspace.created_by.as_uuid())
        .bind(Role::Owner.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert owner membership: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok((Workspace::from(workspace_row), member_row.into_domain()?))
    }

    async fn find_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Option<Workspace>> {
        let row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            r#"
            SELECT {WORKSPACE_COLUMNS}
            FROM workspaces
            WHERE id = $1
            "#,
        ))
        .bind(workspace_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find workspace: {error}")))?;

        Ok(row.map(Workspace::from))
    }

    async fn find_live_workspace_by_slug(&self, slug: &str) -> AppResult<Option<Workspace>> {
        let row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            r#"
            SELECT {WORKSPACE_COLUMNS}
            FROM workspaces
            WHERE slug = $1 AND deleted_at IS NULL
            LIMIT 1
            "#,
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find workspace by slug: {error}")))?;

        Ok(row.map(Workspace::from))
    }

    async fn update_workspace(
        &self,
        workspace_id: WorkspaceId,
        changes: WorkspaceChanges,
    ) -> AppResult<Workspace> {
        let row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            r#"
            UPDATE workspaces
            SET name = $2, slug = $3, description = $4, updated_at = now()
            WHERE id = $1
            RETURNING {WORKSPACE_COLUMNS}
            "#,
        ))
        .bind(workspace_id.as_uuid())
        .bind(&changes.name)
        .bind(&changes.slug)
        .bind(&changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            conflict_or_internal(
                error,
                "a workspace with this slug already exists",
                "failed to update workspace",
            )
        })?
        .ok_or_else(|| AppError::NotFound(format!("workspace '{workspace_id}' not found")))?;

        Ok(Workspace::from(row))
    }

    async fn list_workspaces_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceMembership>> {
        #[derive(Debug, FromRow)]
        struct MembershipJoinRow {
            #[sqlx(flatten)]
            workspace: WorkspaceRow,
            member_role: String,
        }

        let rows = sqlx::query_as::<_, MembershipJoinRow>(
            r#"
            SELECT workspaces.id, workspaces.name, workspaces.slug, workspaces.description,
                   workspaces.created_by, workspaces.created_at, workspaces.updated_at,
                   workspaces.deleted_at, members.role AS member_role
            FROM workspace_members AS members
            INNER JOIN workspaces ON workspaces.id = members.workspace_id
            WHERE members.user_id = $1
              AND members.deleted_at IS NULL
              AND workspaces.deleted_at IS NULL
            ORDER BY workspaces.created_at, workspaces.id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user workspaces: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(WorkspaceMembership {
                    workspace: Workspace::from(row.workspace),
                    role: decode_role(&row.member_role)?,
                })
            })
            .collect()
    }

    async fn find_membership(
        &self,
        membership_id: MembershipId,
    ) -> AppResult<Option<WorkspaceMember>> {
        self.find_membership_impl(membership_id).await
    }

    async fn find_active_membership(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Option<WorkspaceMember>> {
        self.find_active_membership_impl(workspace_id, user_id)
            .await
    }

    async fn list_members(&self, workspace_id: WorkspaceId) -> AppResult<Vec<MemberRecord>> {
        self.list_members_impl(workspace_id).await
    }

    async fn change_member_role(
        &self,
        membership_id: MembershipId,
        new_role: Role,
    ) -> AppResult<WorkspaceMember> {
        self.change_member_role_impl(membership_id, new_role).await
    }

    async fn remove_member(&self, membership_id: MembershipId) -> AppResult<WorkspaceMember> {
        self.remove_member_impl(membership_id).await
    }

    async fn member_email_exists(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<bool> {
        self.member_email_exists_impl(workspace_id, email).await
    }

    async fn create_invitation(
        &self,
        invitation: NewInvitation,
    ) -> AppResult<WorkspaceInvitation> {
        self.create_invitation_impl(invitation).await
    }

    async fn find_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        self.find_invitation_impl(invitation_id).await
    }

    async fn find_pending_invitation(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        self.find_pending_invitation_impl(workspace_id, email).await
    }

    async fn list_invitations(
        &self,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<InvitationRecord>> {
        self.list_invitations_impl(workspace_id).await
    }

    async fn list_invitations_for_email(&self, email: &str) -> AppResult<Vec<UserInvitation>> {
        self.list_invitations_for_email_impl(email).await
    }

    async fn delete_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceInvitation> {
        self.delete_invitation_impl(invitation_id).await
    }

    async fn accept_invitation(
        &self,
        invitation_id: InvitationId,
        user_id: UserId,
    ) -> AppResult<(Workspace, WorkspaceMember)> {
        self.accept_invitation_impl(invitation_id, user_id).await
    }
}

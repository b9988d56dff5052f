use super::*;

impl PostgresWorkspaceRepository {
    pub(super) async fn create_invitation_impl(
        &self,
        invitation: NewInvitation,
    ) -> AppResult<WorkspaceInvitation> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            INSERT INTO workspace_invitations (workspace_id, email, role, status, invited_by, expires_at)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING {INVITATION_COLUMNS}
            "#,
        ))
        .bind(invitation.workspace_id.as_uuid())
        .bind(&invitation.email)
        .bind(invitation.role.as_str())
        .bind(invitation.invited_by.as_uuid())
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            conflict_or_internal(
                error,
                "a pending invitation already exists for this email",
                "failed to insert invitation",
            )
        })?;

        row.into_domain()
    }

    pub(super) async fn find_invitation_impl(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM workspace_invitations
            WHERE id = $1
            "#,
        ))
        .bind(invitation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find invitation: {error}")))?;

        row.map(InvitationRow::into_domain).transpose()
    }

    pub(super) async fn find_pending_invitation_impl(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM workspace_invitations
            WHERE workspace_id = $1
              AND LOWER(email) = LOWER($2)
              AND status = 'pending'
            LIMIT 1
            "#,
        ))
        .bind(workspace_id.as_uuid())
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find pending invitation: {error}"))
        })?;

        row.map(InvitationRow::into_domain).transpose()
    }

    pub(super) async fn list_invitations_impl(
        &self,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<InvitationRecord>> {
        #[derive(Debug, sqlx::FromRow)]
        struct InvitationJoinRow {
            #[sqlx(flatten)]
            invitation: InvitationRow,
            inviter_name: Option<String>,
            inviter_email: Option<String>,
        }

        let rows = sqlx::query_as::<_, InvitationJoinRow>(
            r#"
            SELECT invitations.id, invitations.workspace_id, invitations.email,
                   invitations.role, invitations.status, invitations.invited_by,
                   invitations.expires_at, invitations.created_at, invitations.updated_at,
                   profiles.name AS inviter_name, profiles.email AS inviter_email
            FROM workspace_invitations AS invitations
            LEFT JOIN profiles ON profiles.id = invitations.invited_by
            WHERE invitations.workspace_id = $1 AND invitations.status = 'pending'
            ORDER BY invitations.created_at, invitations.id
            "#,
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list invitations: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(InvitationRecord {
                    invitation: row.invitation.into_domain()?,
                    inviter_name: row.inviter_name,
                    inviter_email: row.inviter_email,
                })
            })
            .collect()
    }

    pub(super) async fn list_invitations_for_email_impl(
        &self,
        email: &str,
    ) -> AppResult<Vec<UserInvitation>> {
        #[derive(Debug, sqlx::FromRow)]
        struct UserInvitationRow {
            #[sqlx(flatten)]
            invitation: InvitationRow,
            #[sqlx(flatten)]
            workspace: WorkspaceJoinRow,
        }

        #[derive(Debug, sqlx::FromRow)]
        struct WorkspaceJoinRow {
            workspace_row_id: uuid::Uuid,
            workspace_name: String,
            workspace_slug: Option<String>,
            workspace_description: Option<String>,
            workspace_created_by: uuid::Uuid,
            workspace_created_at: chrono::DateTime<chrono::Utc>,
            workspace_updated_at: chrono::DateTime<chrono::Utc>,
            workspace_deleted_at: Option<chrono::DateTime<chrono::Utc>>,
        }

        let rows = sqlx::query_as::<_, UserInvitationRow>(
            r#"
            SELECT invitations.id, invitations.workspace_id, invitations.email,
                   invitations.role, invitations.status, invitations.invited_by,
                   invitations.expires_at, invitations.created_at, invitations.updated_at,
                   workspaces.id AS workspace_row_id,
                   workspaces.name AS workspace_name,
                   workspaces.slug AS workspace_slug,
                   workspaces.description AS workspace_description,
                   workspaces.created_by AS workspace_created_by,
                   workspaces.created_at AS workspace_created_at,
                   workspaces.updated_at AS workspace_updated_at,
                   workspaces.deleted_at AS workspace_deleted_at
            FROM workspace_invitations AS invitations
            INNER JOIN workspaces ON workspaces.id = invitations.workspace_id
            WHERE LOWER(invitations.email) = LOWER($1)
              AND invitations.status = 'pending'
              AND workspaces.deleted_at IS NULL
            ORDER BY invitations.created_at, invitations.id
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list invitations for email: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(UserInvitation {
                    invitation: row.invitation.into_domain()?,
                    workspace: Workspace {
                        id: WorkspaceId::from_uuid(row.workspace.workspace_row_id),
                        name: row.workspace.workspace_name,
                        slug: row.workspace.workspace_slug,
                        description: row.workspace.workspace_description,
                        created_by: UserId::from_uuid(row.workspace.workspace_created_by),
                        created_at: row.workspace.workspace_created_at,
                        updated_at: row.workspace.workspace_updated_at,
                        deleted_at: row.workspace.workspace_deleted_at,
                    },
                })
            })
            .collect()
    }

    pub(super) async fn delete_invitation_impl(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceInvitation> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            DELETE FROM workspace_invitations
            WHERE id = $1
            RETURNING {INVITATION_COLUMNS}
            "#,
        ))
        .bind(invitation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete invitation: {error}")))?
        .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;

        row.into_domain()
    }

    pub(super) async fn accept_invitation_impl(
        &self,
        invitation_id: InvitationId,
        user_id: UserId,
    ) -> AppResult<(Workspace, WorkspaceMember)> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        // Lock the invitation row so a concurrent accept or revoke of the
        // same invitation serializes behind this transaction.
        let invitation_row = sqlx::query_as::<_, InvitationRow>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM workspace_invitations
            WHERE id = $1
            FOR UPDATE
            "#,
        ))
        .bind(invitation_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock invitation: {error}")))?
        .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;
        let invitation = invitation_row.into_domain()?;

        let workspace_row = sqlx::query_as::<_, WorkspaceRow>(&format!(
            r#"
            SELECT {WORKSPACE_COLUMNS}
            FROM workspaces
            WHERE id = $1
            "#,
        ))
        .bind(invitation.workspace_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load workspace: {error}")))?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "workspace '{}' not found",
                invitation.workspace_id
            ))
        })?;

        let member_row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING {MEMBER_COLUMNS}
            "#,
        ))
        .bind(invitation.workspace_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(invitation.role.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            conflict_or_internal(
                error,
                "user is already a member of this workspace",
                "failed to insert membership",
            )
        })?;

        sqlx::query(
            r#"
            DELETE FROM workspace_invitations
            WHERE id = $1
            "#,
        )
        .bind(invitation_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete invitation: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok((Workspace::from(workspace_row), member_row.into_domain()?))
    }
}

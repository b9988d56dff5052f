//! Workspace membership ports and application service.
//!
//! Owns the workspace lifecycle: creation, settings updates, member role
//! changes and removals, and the invitation flow. Every mutation is gated
//! server-side by the role/permission table; the client-side permission
//! cache is advisory only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use severatee_core::{AppError, AppResult, NonEmptyString, UserIdentity, WorkspaceId};
use severatee_domain::{
    EmailAddress, INVITATION_VALIDITY_DAYS, InvitationId, MembershipId, Permission, Role,
    Workspace, WorkspaceInvitation, WorkspaceMember, can_perform, permissions_for, validate_slug,
};

use crate::profile_service::ProfileRepository;
use crate::workspace_ports::{
    InvitationRecord, MemberRecord, NewInvitation, NewWorkspace, UserInvitation, WorkspaceChanges,
    WorkspaceRepository,
};

#[cfg(test)]
mod tests;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Invitation notification handed to the email adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationEmail {
    /// Invitee address.
    pub to: String,
    /// Workspace display name.
    pub workspace_name: String,
    /// Display name of the inviting user.
    pub inviter_name: String,
    /// Role granted on acceptance.
    pub role: Role,
    /// Frontend link for accepting the invitation.
    pub accept_url: String,
    /// Invitation expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Port for sending invitation emails. Infrastructure provides SMTP or
/// console implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a workspace invitation notification.
    async fn send_workspace_invitation(&self, email: &InvitationEmail) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Input payload for workspace creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWorkspaceInput {
    /// Display name.
    pub name: String,
    /// Optional URL slug.
    pub slug: Option<String>,
    /// Optional description.
    pub description: Option<String>,
}

/// Input payload for the general-settings update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateWorkspaceInput {
    /// Target workspace.
    pub workspace_id: WorkspaceId,
    /// New display name.
    pub name: String,
    /// New slug; `None` clears it.
    pub slug: Option<String>,
    /// New description; `None` clears it.
    pub description: Option<String>,
}

/// Input payload for issuing an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvitationInput {
    /// Target workspace.
    pub workspace_id: WorkspaceId,
    /// Invitee email address.
    pub email: String,
    /// Role granted on acceptance; `owner` is rejected.
    pub role: Role,
}

/// Policy toggles for invitation acceptance.
///
/// Both default to enabled; the permissive settings reproduce the historical
/// behavior where any authenticated holder of an invitation id could accept
/// it at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationPolicy {
    /// Require the accepting principal's profile email to match the
    /// invitation email.
    pub require_email_match: bool,
    /// Reject acceptance after the expiry timestamp.
    pub enforce_expiry: bool,
}

impl Default for InvitationPolicy {
    fn default() -> Self {
        Self {
            require_email_match: true,
            enforce_expiry: true,
        }
    }
}

/// A workspace joined with the caller's role and derived permissions,
/// consumed by the client-side permission cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceAccess {
    /// The workspace.
    pub workspace: Workspace,
    /// The caller's role.
    pub role: Role,
    /// Permissions derived from the role.
    pub permissions: Vec<Permission>,
}

impl WorkspaceAccess {
    fn new(workspace: Workspace, role: Role) -> Self {
        Self {
            workspace,
            role,
            permissions: permissions_for(role).to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for workspace, membership, and invitation workflows.
#[derive(Clone)]
pub struct WorkspaceService {
    repository: Arc<dyn WorkspaceRepository>,
    profile_repository: Arc<dyn ProfileRepository>,
    email_service: Arc<dyn EmailService>,
    invitation_policy: InvitationPolicy,
    frontend_url: String,
}

impl WorkspaceService {
    /// Creates a new workspace service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WorkspaceRepository>,
        profile_repository: Arc<dyn ProfileRepository>,
        email_service: Arc<dyn EmailService>,
        invitation_policy: InvitationPolicy,
        frontend_url: String,
    ) -> Self {
        Self {
            repository,
            profile_repository,
            email_service,
            invitation_policy,
            frontend_url,
        }
    }

    /// Creates a workspace and enrolls the caller as its first owner.
    pub async fn create_workspace(
        &self,
        actor: &UserIdentity,
        input: CreateWorkspaceInput,
    ) -> AppResult<WorkspaceAccess> {
        let name = NonEmptyString::new(input.name)?;

        if let Some(slug) = input.slug.as_deref() {
            validate_slug(slug)?;
            self.ensure_slug_available(slug, None).await?;
        }

        let (workspace, member) = self
            .repository
            .create_workspace_with_owner(NewWorkspace {
                name: name.into(),
                slug: input.slug,
                description: input.description,
                created_by: actor.user_id(),
            })
            .await?;

        Ok(WorkspaceAccess::new(workspace, member.role))
    }

    /// Lists the caller's workspaces with role and derived permissions.
    pub async fn user_workspaces(&self, actor: &UserIdentity) -> AppResult<Vec<WorkspaceAccess>> {
        let memberships = self
            .repository
            .list_workspaces_for_user(actor.user_id())
            .await?;

        Ok(memberships
            .into_iter()
            .map(|membership| WorkspaceAccess::new(membership.workspace, membership.role))
            .collect())
    }

    /// Lists active members of a workspace with profile display fields.
    pub async fn workspace_members(
        &self,
        actor: &UserIdentity,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<MemberRecord>> {
        self.require_permission(actor, workspace_id, Permission::ViewWorkspace)
            .await?;

        self.repository.list_members(workspace_id).await
    }

    /// Changes a member's role, subject to the last-owner invariant.
    pub async fn update_member_role(
        &self,
        actor: &UserIdentity,
        membership_id: MembershipId,
        new_role: Role,
    ) -> AppResult<WorkspaceMember> {
        let target = self
            .repository
            .find_membership(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;

        self.require_permission(actor, target.workspace_id, Permission::ManageMembers)
            .await?;

        self.repository
            .change_member_role(membership_id, new_role)
            .await
    }

    /// Soft-deletes a membership, subject to the last-owner invariant.
    pub async fn remove_member(
        &self,
        actor: &UserIdentity,
        membership_id: MembershipId,
    ) -> AppResult<WorkspaceMember> {
        let target = self
            .repository
            .find_membership(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;

        self.require_permission(actor, target.workspace_id, Permission::ManageMembers)
            .await?;

        self.repository.remove_member(membership_id).await
    }

    /// Updates workspace name, slug, and description.
    pub async fn update_workspace(
        &self,
        actor: &UserIdentity,
        input: UpdateWorkspaceInput,
    ) -> AppResult<Workspace> {
        let name = NonEmptyString::new(input.name)?;

        self.require_permission(actor, input.workspace_id, Permission::EditWorkspace)
            .await?;

        if let Some(slug) = input.slug.as_deref() {
            validate_slug(slug)?;
            self.ensure_slug_available(slug, Some(input.workspace_id))
                .await?;
        }

        self.repository
            .update_workspace(
                input.workspace_id,
                WorkspaceChanges {
                    name: name.into(),
                    slug: input.slug,
                    description: input.description,
                },
            )
            .await
    }

    /// Issues a pending invitation and sends the notification email.
    pub async fn create_invitation(
        &self,
        actor: &UserIdentity,
        input: CreateInvitationInput,
    ) -> AppResult<WorkspaceInvitation> {
        if input.role == Role::Owner {
            return Err(AppError::Validation(
                "invitations cannot grant the owner role".to_owned(),
            ));
        }

        let email = EmailAddress::new(input.email)?;

        self.require_permission(actor, input.workspace_id, Permission::InviteMembers)
            .await?;

        // Pre-checks; the storage-level uniqueness constraint stays
        // authoritative under concurrent inserts.
        if self
            .repository
            .find_pending_invitation(input.workspace_id, email.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "an invitation for this email already exists".to_owned(),
            ));
        }

        if self
            .repository
            .member_email_exists(input.workspace_id, email.as_str())
            .await?
        {
            return Err(AppError::Conflict(
                "this user is already a member of the workspace".to_owned(),
            ));
        }

        let invitation = self
            .repository
            .create_invitation(NewInvitation {
                workspace_id: input.workspace_id,
                email: email.as_str().to_owned(),
                role: input.role,
                invited_by: actor.user_id(),
                expires_at: Utc::now() + Duration::days(INVITATION_VALIDITY_DAYS),
            })
            .await?;

        let workspace_name = self
            .repository
            .find_workspace(input.workspace_id)
            .await?
            .map(|workspace| workspace.name)
            .unwrap_or_default();

        // The invitation row is already visible in the invitations table, so
        // a failed notification is recoverable from the UI.
        let _ = self
            .email_service
            .send_workspace_invitation(&InvitationEmail {
                to: invitation.email.clone(),
                workspace_name,
                inviter_name: actor.display_name().to_owned(),
                role: invitation.role,
                accept_url: format!("{}/invitations/{}", self.frontend_url, invitation.id),
                expires_at: invitation.expires_at,
            })
            .await;

        Ok(invitation)
    }

    /// Lists pending invitations for a workspace with inviter display info.
    pub async fn workspace_invitations(
        &self,
        actor: &UserIdentity,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<InvitationRecord>> {
        self.require_permission(actor, workspace_id, Permission::ViewWorkspace)
            .await?;

        self.repository.list_invitations(workspace_id).await
    }

    /// Revokes an invitation and returns the removed row for confirmation
    /// messaging.
    pub async fn revoke_invitation(
        &self,
        actor: &UserIdentity,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceInvitation> {
        let invitation = self
            .repository
            .find_invitation(invitation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;

        self.require_permission(actor, invitation.workspace_id, Permission::ManageMembers)
            .await?;

        self.repository.delete_invitation(invitation_id).await
    }

    /// Lists pending invitations addressed to the caller's profile email.
    pub async fn user_invitations(&self, actor: &UserIdentity) -> AppResult<Vec<UserInvitation>> {
        let email = self.resolve_profile_email(actor).await?;

        self.repository.list_invitations_for_email(&email).await
    }

    /// Accepts an invitation, converting it into an active membership.
    pub async fn accept_invitation(
        &self,
        actor: &UserIdentity,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceAccess> {
        let invitation = self
            .repository
            .find_invitation(invitation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;

        if self.invitation_policy.require_email_match {
            let email = self.resolve_profile_email(actor).await?;
            if !email.eq_ignore_ascii_case(&invitation.email) {
                return Err(AppError::Forbidden(
                    "this invitation was issued to a different email address".to_owned(),
                ));
            }
        }

        if self.invitation_policy.enforce_expiry && invitation.is_expired(Utc::now()) {
            return Err(AppError::Forbidden("this invitation has expired".to_owned()));
        }

        let (workspace, member) = self
            .repository
            .accept_invitation(invitation_id, actor.user_id())
            .await?;

        Ok(WorkspaceAccess::new(workspace, member.role))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn require_permission(
        &self,
        actor: &UserIdentity,
        workspace_id: WorkspaceId,
        permission: Permission,
    ) -> AppResult<WorkspaceMember> {
        let membership = self
            .repository
            .find_active_membership(workspace_id, actor.user_id())
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(format!(
                    "user '{}' is not a member of workspace '{workspace_id}'",
                    actor.user_id()
                ))
            })?;

        if !can_perform(permissions_for(membership.role), permission) {
            return Err(AppError::Forbidden(format!(
                "role '{}' is missing permission '{}'",
                membership.role,
                permission.as_str()
            )));
        }

        Ok(membership)
    }

    async fn ensure_slug_available(
        &self,
        slug: &str,
        exclude: Option<WorkspaceId>,
    ) -> AppResult<()> {
        if let Some(existing) = self.repository.find_live_workspace_by_slug(slug).await? {
            if exclude != Some(existing.id) {
                return Err(AppError::Conflict(
                    "a workspace with this slug already exists".to_owned(),
                ));
            }
        }

        Ok(())
    }

    async fn resolve_profile_email(&self, actor: &UserIdentity) -> AppResult<String> {
        self.profile_repository
            .find(actor.user_id())
            .await?
            .and_then(|profile| profile.email)
            .ok_or_else(|| {
                AppError::Validation("user profile has no email address".to_owned())
            })
    }
}

//! Repository port for workspaces, memberships, and invitations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use severatee_core::{AppResult, UserId, WorkspaceId};
use severatee_domain::{
    InvitationId, MembershipId, Role, Workspace, WorkspaceInvitation, WorkspaceMember,
};

/// Insert payload for a new workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkspace {
    /// Display name.
    pub name: String,
    /// Optional URL slug.
    pub slug: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user, enrolled as the first owner.
    pub created_by: UserId,
}

/// Field changes applied by a workspace settings update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceChanges {
    /// New display name.
    pub name: String,
    /// New slug; `None` clears it.
    pub slug: Option<String>,
    /// New description; `None` clears it.
    pub description: Option<String>,
}

/// Insert payload for a new invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    /// Target workspace.
    pub workspace_id: WorkspaceId,
    /// Invitee email, lowercased.
    pub email: String,
    /// Role granted on acceptance.
    pub role: Role,
    /// Inviting user.
    pub invited_by: UserId,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

/// A workspace joined with the caller's role in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMembership {
    /// The workspace.
    pub workspace: Workspace,
    /// The caller's role.
    pub role: Role,
}

/// An active membership joined with profile display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    /// Membership row id.
    pub membership_id: MembershipId,
    /// The bound user.
    pub user_id: UserId,
    /// Role within the workspace.
    pub role: Role,
    /// Profile display name, when set.
    pub name: Option<String>,
    /// Profile email, when set.
    pub email: Option<String>,
}

/// A pending invitation joined with inviter display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRecord {
    /// The invitation row.
    pub invitation: WorkspaceInvitation,
    /// Inviter display name, when resolvable.
    pub inviter_name: Option<String>,
    /// Inviter email, when resolvable.
    pub inviter_email: Option<String>,
}

/// A pending invitation joined with its live workspace, from the invitee's
/// point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInvitation {
    /// The invitation row.
    pub invitation: WorkspaceInvitation,
    /// The workspace it grants access to.
    pub workspace: Workspace,
}

/// Repository port for workspace, membership, and invitation persistence.
///
/// Implementations own atomicity: multi-row operations
/// ([`create_workspace_with_owner`](WorkspaceRepository::create_workspace_with_owner),
/// [`accept_invitation`](WorkspaceRepository::accept_invitation)) and the
/// owner-count guard inside
/// [`change_member_role`](WorkspaceRepository::change_member_role) and
/// [`remove_member`](WorkspaceRepository::remove_member) must each run in a
/// single transaction so no partial state is ever observable. Uniqueness of
/// active `(workspace, user)` memberships and pending `(workspace, email)`
/// invitations is enforced at the storage layer and surfaces as `Conflict`.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Inserts a workspace and its first owner membership atomically.
    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
    ) -> AppResult<(Workspace, WorkspaceMember)>;

    /// Finds a workspace by id, soft-deleted or not.
    async fn find_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Option<Workspace>>;

    /// Finds a live workspace by slug.
    async fn find_live_workspace_by_slug(&self, slug: &str) -> AppResult<Option<Workspace>>;

    /// Applies settings changes and refreshes the update timestamp.
    async fn update_workspace(
        &self,
        workspace_id: WorkspaceId,
        changes: WorkspaceChanges,
    ) -> AppResult<Workspace>;

    /// Lists live workspaces where the user holds an active membership,
    /// ordered by workspace creation time.
    async fn list_workspaces_for_user(&self, user_id: UserId)
    -> AppResult<Vec<WorkspaceMembership>>;

    /// Finds a membership row by id, soft-deleted or not.
    async fn find_membership(
        &self,
        membership_id: MembershipId,
    ) -> AppResult<Option<WorkspaceMember>>;

    /// Finds the active membership binding a user to a workspace.
    async fn find_active_membership(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Option<WorkspaceMember>>;

    /// Lists active memberships with profile display fields, ordered by
    /// membership creation time.
    async fn list_members(&self, workspace_id: WorkspaceId) -> AppResult<Vec<MemberRecord>>;

    /// Sets the role on a membership.
    ///
    /// Rejects with `Forbidden` when the target is the last active owner and
    /// the new role is not `owner`; the count and the write happen in one
    /// transaction.
    async fn change_member_role(
        &self,
        membership_id: MembershipId,
        new_role: Role,
    ) -> AppResult<WorkspaceMember>;

    /// Soft-deletes a membership.
    ///
    /// Rejects with `Forbidden` when the target is the last active owner;
    /// the count and the write happen in one transaction.
    async fn remove_member(&self, membership_id: MembershipId) -> AppResult<WorkspaceMember>;

    /// Returns whether an email belongs to an active member of a workspace.
    async fn member_email_exists(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<bool>;

    /// Inserts a pending invitation.
    async fn create_invitation(
        &self,
        invitation: NewInvitation,
    ) -> AppResult<WorkspaceInvitation>;

    /// Finds an invitation by id.
    async fn find_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<Option<WorkspaceInvitation>>;

    /// Finds the pending invitation for a workspace/email pair.
    async fn find_pending_invitation(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<Option<WorkspaceInvitation>>;

    /// Lists pending invitations for a workspace with inviter display
    /// fields, ordered by creation time.
    async fn list_invitations(&self, workspace_id: WorkspaceId)
    -> AppResult<Vec<InvitationRecord>>;

    /// Lists pending invitations addressed to an email, joined with live
    /// workspaces.
    async fn list_invitations_for_email(&self, email: &str) -> AppResult<Vec<UserInvitation>>;

    /// Deletes an invitation and returns the removed row.
    ///
    /// Fails `NotFound` when the row is absent.
    async fn delete_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceInvitation>;

    /// Converts an invitation into a membership atomically: inserts the
    /// membership at the invited role and deletes the invitation row, or
    /// changes nothing.
    async fn accept_invitation(
        &self,
        invitation_id: InvitationId,
        user_id: UserId,
    ) -> AppResult<(Workspace, WorkspaceMember)>;
}

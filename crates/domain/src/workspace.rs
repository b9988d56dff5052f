//! Workspace membership model: roles, permissions, invitations, and the
//! invariants the workspace service enforces over them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use severatee_core::{AppError, AppResult, UserId, WorkspaceId};
use uuid::Uuid;

/// Number of days an invitation stays valid after creation.
pub const INVITATION_VALIDITY_DAYS: i64 = 30;

/// Role of a member within a workspace.
///
/// Privilege is not ordered; each role maps to an explicit permission set
/// through [`permissions_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including destructive workspace operations.
    Owner,
    /// Day-to-day administration without workspace deletion.
    Admin,
    /// Read-only participant.
    Member,
}

impl Role {
    /// Returns the stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// A grantable capability checked before a mutating or sensitive operation.
///
/// The wire values are shared with the frontend permission cache, which does
/// its own UI gating from the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Allows reading workspace data and member listings.
    ViewWorkspace,
    /// Allows updating workspace name, slug, and description.
    EditWorkspace,
    /// Allows deleting the workspace.
    DeleteWorkspace,
    /// Allows creating invitations.
    InviteMembers,
    /// Allows changing member roles, removing members, and revoking
    /// invitations.
    ManageMembers,
}

impl Permission {
    /// Returns the stable transport value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewWorkspace => "VIEW_WORKSPACE",
            Self::EditWorkspace => "EDIT_WORKSPACE",
            Self::DeleteWorkspace => "DELETE_WORKSPACE",
            Self::InviteMembers => "INVITE_MEMBERS",
            Self::ManageMembers => "MANAGE_MEMBERS",
        }
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "VIEW_WORKSPACE" => Ok(Self::ViewWorkspace),
            "EDIT_WORKSPACE" => Ok(Self::EditWorkspace),
            "DELETE_WORKSPACE" => Ok(Self::DeleteWorkspace),
            "INVITE_MEMBERS" => Ok(Self::InviteMembers),
            "MANAGE_MEMBERS" => Ok(Self::ManageMembers),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

/// Returns the permission set granted by a role.
///
/// Total over all roles; adding a role without extending this table is a
/// programming error caught at compile time by the exhaustive match.
#[must_use]
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Owner => &[
            Permission::ViewWorkspace,
            Permission::EditWorkspace,
            Permission::DeleteWorkspace,
            Permission::InviteMembers,
            Permission::ManageMembers,
        ],
        Role::Admin => &[
            Permission::ViewWorkspace,
            Permission::EditWorkspace,
            Permission::InviteMembers,
            Permission::ManageMembers,
        ],
        Role::Member => &[Permission::ViewWorkspace],
    }
}

/// Returns whether a permission set allows an action.
///
/// The single policy predicate used for both server-side enforcement and the
/// UI gating payloads, so the two cannot diverge.
#[must_use]
pub fn can_perform(permissions: &[Permission], permission: Permission) -> bool {
    permissions.contains(&permission)
}

/// Validates a workspace slug: lowercase alphanumerics and hyphens only.
pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty() {
        return Err(AppError::Validation(
            "workspace slug must not be empty".to_owned(),
        ));
    }

    if slug.len() > 100 {
        return Err(AppError::Validation(
            "workspace slug must not exceed 100 characters".to_owned(),
        ));
    }

    if !slug
        .chars()
        .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-')
    {
        return Err(AppError::Validation(format!(
            "workspace slug '{slug}' may only contain lowercase letters, digits, and hyphens"
        )));
    }

    Ok(())
}

/// Unique identifier for a membership record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipId(Uuid);

impl MembershipId {
    /// Creates a new random membership identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a membership identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MembershipId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MembershipId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for an invitation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(Uuid);

impl InvitationId {
    /// Creates a new random invitation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an invitation identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for InvitationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A tenant unit owning memberships and invitations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Stable workspace identifier.
    pub id: WorkspaceId,
    /// Display name.
    pub name: String,
    /// Optional URL slug, globally unique among live workspaces.
    pub slug: Option<String>,
    /// Optional free-form description.
    pub description: Option<String>,
    /// The user who created the workspace.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; `None` means the workspace is live.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workspace {
    /// Returns whether the workspace has not been soft-deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// The binding of a user to a workspace with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    /// Stable membership identifier.
    pub id: MembershipId,
    /// Workspace the membership belongs to.
    pub workspace_id: WorkspaceId,
    /// The bound user.
    pub user_id: UserId,
    /// Role granted within the workspace.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; `None` means the membership is active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WorkspaceMember {
    /// Returns whether the membership has not been soft-deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Lifecycle state of an invitation.
///
/// Only `pending` rows are ever persisted: acceptance and revocation delete
/// the row instead of transitioning it. The terminal variants exist for the
/// stored enum type and transport compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Awaiting acceptance or revocation.
    Pending,
    /// Converted into a membership.
    Accepted,
    /// Declined by the invitee.
    Declined,
    /// Past its expiry timestamp.
    Expired,
}

impl InvitationStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown invitation status '{value}'"
            ))),
        }
    }
}

/// A pending offer of membership at a given role, bound to an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInvitation {
    /// Stable invitation identifier.
    pub id: InvitationId,
    /// Workspace the invitation grants access to.
    pub workspace_id: WorkspaceId,
    /// Invitee email address, lowercased.
    pub email: String,
    /// Role granted on acceptance; never `owner`.
    pub role: Role,
    /// Lifecycle state.
    pub status: InvitationStatus,
    /// The inviting user, if still known.
    pub invited_by: Option<UserId>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceInvitation {
    /// Returns whether the invitation has passed its expiry timestamp.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A mutation against an owner membership subject to the last-owner guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerMutation {
    /// Changing the membership role.
    ChangeRole(Role),
    /// Soft-deleting the membership.
    Remove,
}

/// Rejects mutations that would leave a workspace without an active owner.
///
/// Must be evaluated inside the same storage transaction that performs the
/// mutation, with the workspace's membership rows locked, so the count cannot
/// go stale between check and write.
pub fn ensure_not_last_owner(
    target_role: Role,
    mutation: OwnerMutation,
    active_owner_count: i64,
) -> AppResult<()> {
    if target_role != Role::Owner {
        return Ok(());
    }

    match mutation {
        OwnerMutation::ChangeRole(new_role) if new_role == Role::Owner => Ok(()),
        OwnerMutation::ChangeRole(_) if active_owner_count <= 1 => Err(AppError::Forbidden(
            "cannot change role of the last owner".to_owned(),
        )),
        OwnerMutation::Remove if active_owner_count <= 1 => Err(AppError::Forbidden(
            "cannot remove the last owner of the workspace".to_owned(),
        )),
        _ => Ok(()),
    }
}

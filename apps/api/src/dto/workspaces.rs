use serde::{Deserialize, Serialize};
use severatee_application::{
    InvitationRecord, MemberRecord, UserInvitation, WorkspaceAccess,
};
use severatee_domain::{Workspace, WorkspaceInvitation, WorkspaceMember};
use ts_rs::TS;

/// Incoming payload for workspace creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-workspace-request.ts"
)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Incoming payload for the general-settings update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-workspace-request.ts"
)]
pub struct UpdateWorkspaceRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Incoming payload for a member role change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-member-role-request.ts"
)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

/// Incoming payload for issuing an invitation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-invitation-request.ts"
)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: String,
}

/// Incoming payload for switching the current workspace.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/select-workspace-request.ts"
)]
pub struct SelectWorkspaceRequest {
    pub workspace_id: String,
}

/// API representation of a workspace.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/workspace-response.ts"
)]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Compact workspace reference used in invitee-facing listings.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/workspace-summary-response.ts"
)]
pub struct WorkspaceSummaryResponse {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
}

/// A workspace with the caller's role and derived permissions; the payload
/// the client-side permission cache is built from.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/workspace-access-response.ts"
)]
pub struct WorkspaceAccessResponse {
    pub workspace: WorkspaceResponse,
    pub role: String,
    pub permissions: Vec<String>,
}

/// API representation of a workspace member.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/member-response.ts"
)]
pub struct MemberResponse {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// API representation of an invitation.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/invitation-response.ts"
)]
pub struct InvitationResponse {
    pub id: String,
    pub workspace_id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub invited_by: Option<String>,
    pub inviter_name: Option<String>,
    pub inviter_email: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}

/// An invitation joined with its workspace, from the invitee's point of
/// view.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/user-invitation-response.ts"
)]
pub struct UserInvitationResponse {
    pub invitation: InvitationResponse,
    pub workspace: WorkspaceSummaryResponse,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(value: Workspace) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            slug: value.slug,
            description: value.description,
            created_by: value.created_by.to_string(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<Workspace> for WorkspaceSummaryResponse {
    fn from(value: Workspace) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            slug: value.slug,
        }
    }
}

impl From<WorkspaceAccess> for WorkspaceAccessResponse {
    fn from(value: WorkspaceAccess) -> Self {
        Self {
            workspace: WorkspaceResponse::from(value.workspace),
            role: value.role.as_str().to_owned(),
            permissions: value
                .permissions
                .into_iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}

impl From<MemberRecord> for MemberResponse {
    fn from(value: MemberRecord) -> Self {
        Self {
            id: value.membership_id.to_string(),
            user_id: value.user_id.to_string(),
            role: value.role.as_str().to_owned(),
            name: value.name,
            email: value.email,
        }
    }
}

/// Membership row echoed back after a role change or removal.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/membership-response.ts"
)]
pub struct MembershipResponse {
    pub id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub role: String,
    pub deleted_at: Option<String>,
}

impl From<WorkspaceMember> for MembershipResponse {
    fn from(value: WorkspaceMember) -> Self {
        Self {
            id: value.id.to_string(),
            workspace_id: value.workspace_id.to_string(),
            user_id: value.user_id.to_string(),
            role: value.role.as_str().to_owned(),
            deleted_at: value.deleted_at.map(|timestamp| timestamp.to_rfc3339()),
        }
    }
}

impl From<WorkspaceInvitation> for InvitationResponse {
    fn from(value: WorkspaceInvitation) -> Self {
        Self {
            id: value.id.to_string(),
            workspace_id: value.workspace_id.to_string(),
            email: value.email,
            role: value.role.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            invited_by: value.invited_by.map(|user_id| user_id.to_string()),
            inviter_name: None,
            inviter_email: None,
            expires_at: value.expires_at.to_rfc3339(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

impl From<InvitationRecord> for InvitationResponse {
    fn from(value: InvitationRecord) -> Self {
        let mut response = Self::from(value.invitation);
        response.inviter_name = value.inviter_name;
        response.inviter_email = value.inviter_email;
        response
    }
}

impl From<UserInvitation> for UserInvitationResponse {
    fn from(value: UserInvitation) -> Self {
        Self {
            invitation: InvitationResponse::from(value.invitation),
            workspace: WorkspaceSummaryResponse::from(value.workspace),
        }
    }
}

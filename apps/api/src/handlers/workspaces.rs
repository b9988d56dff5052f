use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use severatee_application::{CreateInvitationInput, CreateWorkspaceInput, UpdateWorkspaceInput};
use severatee_core::{AppError, UserIdentity, WorkspaceId};
use severatee_domain::{InvitationId, MembershipId, Role};
use uuid::Uuid;

use crate::dto::{
    CreateInvitationRequest, CreateWorkspaceRequest, InvitationResponse, MemberResponse,
    MembershipResponse, SelectWorkspaceRequest, UpdateMemberRoleRequest, UpdateWorkspaceRequest,
    UserInvitationResponse, WorkspaceAccessResponse, WorkspaceResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<WorkspaceAccessResponse>)> {
    let access = state
        .workspace_service
        .create_workspace(
            &user,
            CreateWorkspaceInput {
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(WorkspaceAccessResponse::from(access))))
}

pub async fn list_user_workspaces_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<WorkspaceAccessResponse>>> {
    let workspaces = state
        .workspace_service
        .user_workspaces(&user)
        .await?
        .into_iter()
        .map(WorkspaceAccessResponse::from)
        .collect();

    Ok(Json(workspaces))
}

pub async fn update_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<UpdateWorkspaceRequest>,
) -> ApiResult<Json<WorkspaceResponse>> {
    let workspace = state
        .workspace_service
        .update_workspace(
            &user,
            UpdateWorkspaceInput {
                workspace_id: WorkspaceId::from_uuid(workspace_id),
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
            },
        )
        .await?;

    Ok(Json(WorkspaceResponse::from(workspace)))
}

pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state
        .workspace_service
        .workspace_members(&user, WorkspaceId::from_uuid(workspace_id))
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(members))
}

pub async fn update_member_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<MembershipResponse>> {
    let role = Role::from_str(&payload.role)?;
    let member = state
        .workspace_service
        .update_member_role(&user, MembershipId::from_uuid(member_id), role)
        .await?;

    Ok(Json(MembershipResponse::from(member)))
}

pub async fn remove_member_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Json<MembershipResponse>> {
    let member = state
        .workspace_service
        .remove_member(&user, MembershipId::from_uuid(member_id))
        .await?;

    Ok(Json(MembershipResponse::from(member)))
}

pub async fn create_invitation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<InvitationResponse>)> {
    let role = Role::from_str(&payload.role)?;
    let invitation = state
        .workspace_service
        .create_invitation(
            &user,
            CreateInvitationInput {
                workspace_id: WorkspaceId::from_uuid(workspace_id),
                email: payload.email,
                role,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(InvitationResponse::from(invitation))))
}

pub async fn list_workspace_invitations_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InvitationResponse>>> {
    let invitations = state
        .workspace_service
        .workspace_invitations(&user, WorkspaceId::from_uuid(workspace_id))
        .await?
        .into_iter()
        .map(InvitationResponse::from)
        .collect();

    Ok(Json(invitations))
}

pub async fn revoke_invitation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<Json<InvitationResponse>> {
    let invitation = state
        .workspace_service
        .revoke_invitation(&user, InvitationId::from_uuid(invitation_id))
        .await?;

    Ok(Json(InvitationResponse::from(invitation)))
}

pub async fn list_user_invitations_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<UserInvitationResponse>>> {
    let invitations = state
        .workspace_service
        .user_invitations(&user)
        .await?
        .into_iter()
        .map(UserInvitationResponse::from)
        .collect();

    Ok(Json(invitations))
}

pub async fn accept_invitation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<Json<WorkspaceAccessResponse>> {
    let access = state
        .workspace_service
        .accept_invitation(&user, InvitationId::from_uuid(invitation_id))
        .await?;

    Ok(Json(WorkspaceAccessResponse::from(access)))
}

pub async fn current_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Option<WorkspaceAccessResponse>>> {
    let current = state
        .selection_service
        .current(&user)
        .await?
        .map(WorkspaceAccessResponse::from);

    Ok(Json(current))
}

pub async fn select_workspace_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SelectWorkspaceRequest>,
) -> ApiResult<Json<WorkspaceAccessResponse>> {
    let workspace_id = Uuid::from_str(&payload.workspace_id)
        .map_err(|error| AppError::Validation(format!("invalid workspace id: {error}")))?;

    let access = state
        .selection_service
        .select(&user, WorkspaceId::from_uuid(workspace_id))
        .await?;

    Ok(Json(WorkspaceAccessResponse::from(access)))
}

//! In-memory store shared by service tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use severatee_core::{AppError, AppResult, UserId, WorkspaceId};
use severatee_domain::{
    InvitationId, InvitationStatus, MembershipId, OwnerMutation, Profile, Role, Workspace,
    WorkspaceInvitation, WorkspaceMember, ensure_not_last_owner,
};
use tokio::sync::Mutex;

use crate::profile_service::{NewProfile, ProfileChanges, ProfileRepository};
use crate::workspace_ports::{
    InvitationRecord, MemberRecord, NewInvitation, NewWorkspace, UserInvitation, WorkspaceChanges,
    WorkspaceMembership, WorkspaceRepository,
};
use crate::workspace_selection::WorkspaceSelectionStore;

#[derive(Default)]
struct State {
    workspaces: Vec<Workspace>,
    members: Vec<WorkspaceMember>,
    invitations: Vec<WorkspaceInvitation>,
    profiles: HashMap<UserId, Profile>,
    selections: HashMap<UserId, WorkspaceId>,
}

/// In-memory implementation of the persistence ports, mirroring the
/// transactional guarantees the PostgreSQL adapters provide.
#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a user with a profile row and returns the generated id.
    pub(crate) async fn register_user(&self, name: &str, email: &str) -> UserId {
        let user_id = UserId::new();
        let now = Utc::now();
        self.state.lock().await.profiles.insert(
            user_id,
            Profile {
                id: user_id,
                name: Some(name.to_owned()),
                avatar_url: None,
                username: None,
                email: Some(email.to_owned()),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        );
        user_id
    }

    /// Snapshot of all membership rows, soft-deleted included.
    pub(crate) async fn member_rows(&self) -> Vec<WorkspaceMember> {
        self.state.lock().await.members.clone()
    }

    /// Snapshot of all invitation rows.
    pub(crate) async fn invitation_rows(&self) -> Vec<WorkspaceInvitation> {
        self.state.lock().await.invitations.clone()
    }

    /// Rewrites an invitation's expiry, for expiry-policy tests.
    pub(crate) async fn age_invitation(&self, invitation_id: InvitationId, expires_at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        for invitation in &mut state.invitations {
            if invitation.id == invitation_id {
                invitation.expires_at = expires_at;
            }
        }
    }

    fn active_owner_count(state: &State, workspace_id: WorkspaceId) -> i64 {
        state
            .members
            .iter()
            .filter(|member| {
                member.workspace_id == workspace_id
                    && member.role == Role::Owner
                    && member.is_active()
            })
            .count() as i64
    }
}

#[async_trait]
impl WorkspaceRepository for FakeStore {
    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
    ) -> AppResult<(Workspace, WorkspaceMember)> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let created = Workspace {
            id: WorkspaceId::new(),
            name: workspace.name,
            slug: workspace.slug,
            description: workspace.description,
            created_by: workspace.created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let member = WorkspaceMember {
            id: MembershipId::new(),
            workspace_id: created.id,
            user_id: workspace.created_by,
            role: Role::Owner,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        state.workspaces.push(created.clone());
        state.members.push(member.clone());
        Ok((created, member))
    }

    async fn find_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Option<Workspace>> {
        let state = self.state.lock().await;
        Ok(state
            .workspaces
            .iter()
            .find(|workspace| workspace.id == workspace_id)
            .cloned())
    }

    async fn find_live_workspace_by_slug(&self, slug: &str) -> AppResult<Option<Workspace>> {
        let state = self.state.lock().await;
        Ok(state
            .workspaces
            .iter()
            .find(|workspace| workspace.is_active() && workspace.slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn update_workspace(
        &self,
        workspace_id: WorkspaceId,
        changes: WorkspaceChanges,
    ) -> AppResult<Workspace> {
        let mut state = self.state.lock().await;
        let workspace = state
            .workspaces
            .iter_mut()
            .find(|workspace| workspace.id == workspace_id)
            .ok_or_else(|| AppError::NotFound(format!("workspace '{workspace_id}' not found")))?;

        workspace.name = changes.name;
        workspace.slug = changes.slug;
        workspace.description = changes.description;
        workspace.updated_at = Utc::now();
        Ok(workspace.clone())
    }

    async fn list_workspaces_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<WorkspaceMembership>> {
        let state = self.state.lock().await;
        let mut memberships: Vec<WorkspaceMembership> = state
            .members
            .iter()
            .filter(|member| member.user_id == user_id && member.is_active())
            .filter_map(|member| {
                state
                    .workspaces
                    .iter()
                    .find(|workspace| workspace.id == member.workspace_id && workspace.is_active())
                    .map(|workspace| WorkspaceMembership {
                        workspace: workspace.clone(),
                        role: member.role,
                    })
            })
            .collect();
        memberships.sort_by_key(|membership| {
            (
                membership.workspace.created_at,
                membership.workspace.id.as_uuid(),
            )
        });
        Ok(memberships)
    }

    async fn find_membership(
        &self,
        membership_id: MembershipId,
    ) -> AppResult<Option<WorkspaceMember>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .find(|member| member.id == membership_id)
            .cloned())
    }

    async fn find_active_membership(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> AppResult<Option<WorkspaceMember>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .find(|member| {
                member.workspace_id == workspace_id
                    && member.user_id == user_id
                    && member.is_active()
            })
            .cloned())
    }

    async fn list_members(&self, workspace_id: WorkspaceId) -> AppResult<Vec<MemberRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<MemberRecord> = state
            .members
            .iter()
            .filter(|member| member.workspace_id == workspace_id && member.is_active())
            .map(|member| {
                let profile = state.profiles.get(&member.user_id);
                MemberRecord {
                    membership_id: member.id,
                    user_id: member.user_id,
                    role: member.role,
                    name: profile.and_then(|profile| profile.name.clone()),
                    email: profile.and_then(|profile| profile.email.clone()),
                }
            })
            .collect();
        records.sort_by_key(|record| {
            state
                .members
                .iter()
                .find(|member| member.id == record.membership_id)
                .map(|member| member.created_at)
        });
        Ok(records)
    }

    async fn change_member_role(
        &self,
        membership_id: MembershipId,
        new_role: Role,
    ) -> AppResult<WorkspaceMember> {
        let mut state = self.state.lock().await;
        let (workspace_id, current_role) = state
            .members
            .iter()
            .find(|member| member.id == membership_id)
            .map(|member| (member.workspace_id, member.role))
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;

        let owner_count = Self::active_owner_count(&state, workspace_id);
        ensure_not_last_owner(current_role, OwnerMutation::ChangeRole(new_role), owner_count)?;

        let member = state
            .members
            .iter_mut()
            .find(|member| member.id == membership_id)
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;
        member.role = new_role;
        member.updated_at = Utc::now();
        Ok(member.clone())
    }

    async fn remove_member(&self, membership_id: MembershipId) -> AppResult<WorkspaceMember> {
        let mut state = self.state.lock().await;
        let (workspace_id, current_role) = state
            .members
            .iter()
            .find(|member| member.id == membership_id)
            .map(|member| (member.workspace_id, member.role))
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;

        let owner_count = Self::active_owner_count(&state, workspace_id);
        ensure_not_last_owner(current_role, OwnerMutation::Remove, owner_count)?;

        let member = state
            .members
            .iter_mut()
            .find(|member| member.id == membership_id)
            .ok_or_else(|| AppError::NotFound("member not found".to_owned()))?;
        member.deleted_at = Some(Utc::now());
        Ok(member.clone())
    }

    async fn member_email_exists(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.members.iter().any(|member| {
            member.workspace_id == workspace_id
                && member.is_active()
                && state
                    .profiles
                    .get(&member.user_id)
                    .and_then(|profile| profile.email.as_deref())
                    .is_some_and(|profile_email| profile_email.eq_ignore_ascii_case(email))
        }))
    }

    async fn create_invitation(
        &self,
        invitation: NewInvitation,
    ) -> AppResult<WorkspaceInvitation> {
        let mut state = self.state.lock().await;

        // Emulates the partial unique index on pending (workspace, email).
        if state.invitations.iter().any(|existing| {
            existing.workspace_id == invitation.workspace_id
                && existing.status == InvitationStatus::Pending
                && existing.email.eq_ignore_ascii_case(&invitation.email)
        }) {
            return Err(AppError::Conflict(
                "a pending invitation already exists for this email".to_owned(),
            ));
        }

        let now = Utc::now();
        let created = WorkspaceInvitation {
            id: InvitationId::new(),
            workspace_id: invitation.workspace_id,
            email: invitation.email,
            role: invitation.role,
            status: InvitationStatus::Pending,
            invited_by: Some(invitation.invited_by),
            expires_at: invitation.expires_at,
            created_at: now,
            updated_at: now,
        };
        state.invitations.push(created.clone());
        Ok(created)
    }

    async fn find_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .find(|invitation| invitation.id == invitation_id)
            .cloned())
    }

    async fn find_pending_invitation(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
    ) -> AppResult<Option<WorkspaceInvitation>> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .find(|invitation| {
                invitation.workspace_id == workspace_id
                    && invitation.status == InvitationStatus::Pending
                    && invitation.email.eq_ignore_ascii_case(email)
            })
            .cloned())
    }

    async fn list_invitations(
        &self,
        workspace_id: WorkspaceId,
    ) -> AppResult<Vec<InvitationRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .filter(|invitation| {
                invitation.workspace_id == workspace_id
                    && invitation.status == InvitationStatus::Pending
            })
            .map(|invitation| {
                let inviter = invitation
                    .invited_by
                    .and_then(|user_id| state.profiles.get(&user_id));
                InvitationRecord {
                    invitation: invitation.clone(),
                    inviter_name: inviter.and_then(|profile| profile.name.clone()),
                    inviter_email: inviter.and_then(|profile| profile.email.clone()),
                }
            })
            .collect())
    }

    async fn list_invitations_for_email(&self, email: &str) -> AppResult<Vec<UserInvitation>> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .filter(|invitation| {
                invitation.status == InvitationStatus::Pending
                    && invitation.email.eq_ignore_ascii_case(email)
            })
            .filter_map(|invitation| {
                state
                    .workspaces
                    .iter()
                    .find(|workspace| workspace.id == invitation.workspace_id && workspace.is_active())
                    .map(|workspace| UserInvitation {
                        invitation: invitation.clone(),
                        workspace: workspace.clone(),
                    })
            })
            .collect())
    }

    async fn delete_invitation(
        &self,
        invitation_id: InvitationId,
    ) -> AppResult<WorkspaceInvitation> {
        let mut state = self.state.lock().await;
        let position = state
            .invitations
            .iter()
            .position(|invitation| invitation.id == invitation_id)
            .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;
        Ok(state.invitations.remove(position))
    }

    async fn accept_invitation(
        &self,
        invitation_id: InvitationId,
        user_id: UserId,
    ) -> AppResult<(Workspace, WorkspaceMember)> {
        let mut state = self.state.lock().await;
        let position = state
            .invitations
            .iter()
            .position(|invitation| invitation.id == invitation_id)
            .ok_or_else(|| AppError::NotFound("invitation not found".to_owned()))?;
        let invitation = state.invitations[position].clone();

        let workspace = state
            .workspaces
            .iter()
            .find(|workspace| workspace.id == invitation.workspace_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "workspace '{}' not found",
                    invitation.workspace_id
                ))
            })?;

        // Emulates the partial unique index on active (workspace, user).
        if state.members.iter().any(|member| {
            member.workspace_id == invitation.workspace_id
                && member.user_id == user_id
                && member.is_active()
        }) {
            return Err(AppError::Conflict(
                "user is already a member of this workspace".to_owned(),
            ));
        }

        let now = Utc::now();
        let member = WorkspaceMember {
            id: MembershipId::new(),
            workspace_id: invitation.workspace_id,
            user_id,
            role: invitation.role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.members.push(member.clone());
        state.invitations.remove(position);
        Ok((workspace, member))
    }
}

#[async_trait]
impl ProfileRepository for FakeStore {
    async fn find(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        let state = self.state.lock().await;
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn insert(&self, profile: NewProfile) -> AppResult<Profile> {
        let mut state = self.state.lock().await;
        if state.profiles.contains_key(&profile.id) {
            return Err(AppError::Conflict(format!(
                "profile '{}' already exists",
                profile.id
            )));
        }

        let now = Utc::now();
        let created = Profile {
            id: profile.id,
            name: profile.name,
            avatar_url: None,
            username: None,
            email: profile.email,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, user_id: UserId, changes: ProfileChanges) -> AppResult<Profile> {
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("profile '{user_id}' not found")))?;

        if let Some(name) = changes.name {
            profile.name = Some(name);
        }
        if let Some(avatar_url) = changes.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        if let Some(username) = changes.username {
            profile.username = Some(username);
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl WorkspaceSelectionStore for FakeStore {
    async fn last_selected(&self, user_id: UserId) -> AppResult<Option<WorkspaceId>> {
        let state = self.state.lock().await;
        Ok(state.selections.get(&user_id).copied())
    }

    async fn save_selection(&self, user_id: UserId, workspace_id: WorkspaceId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.selections.insert(user_id, workspace_id);
        Ok(())
    }
}

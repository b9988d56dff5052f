use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use severatee_core::{AppError, AppResult, UserId, UserIdentity};
use severatee_domain::{InvitationId, Permission, Role};
use tokio::sync::Mutex;

use crate::test_support::FakeStore;

use super::{
    CreateInvitationInput, CreateWorkspaceInput, EmailService, InvitationEmail, InvitationPolicy,
    UpdateWorkspaceInput, WorkspaceService,
};

#[derive(Default)]
struct FakeEmailService {
    sent: Mutex<Vec<InvitationEmail>>,
}

#[async_trait]
impl EmailService for FakeEmailService {
    async fn send_workspace_invitation(&self, email: &InvitationEmail) -> AppResult<()> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

fn identity(store_user: UserId, name: &str, email: &str) -> UserIdentity {
    UserIdentity::new(store_user, name, Some(email.to_owned()))
}

fn service_with_policy(
    store: Arc<FakeStore>,
    policy: InvitationPolicy,
) -> (WorkspaceService, Arc<FakeEmailService>) {
    let email_service = Arc::new(FakeEmailService::default());
    let service = WorkspaceService::new(
        store.clone(),
        store,
        email_service.clone(),
        policy,
        "http://localhost:3000".to_owned(),
    );
    (service, email_service)
}

fn service(store: Arc<FakeStore>) -> (WorkspaceService, Arc<FakeEmailService>) {
    service_with_policy(store, InvitationPolicy::default())
}

async fn create_workspace(
    service: &WorkspaceService,
    actor: &UserIdentity,
    name: &str,
    slug: Option<&str>,
) -> super::WorkspaceAccess {
    service
        .create_workspace(
            actor,
            CreateWorkspaceInput {
                name: name.to_owned(),
                slug: slug.map(str::to_owned),
                description: None,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("workspace creation failed: {error}"))
}

#[tokio::test]
async fn creator_is_enrolled_as_owner_with_all_permissions() {
    let store = Arc::new(FakeStore::new());
    let user = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store.clone());
    let actor = identity(user, "U1", "u1@acme.example");

    let access = create_workspace(&service, &actor, "Acme", Some("acme")).await;

    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.permissions.len(), 5);
    assert!(access.permissions.contains(&Permission::DeleteWorkspace));

    let members = store.member_rows().await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, user);
    assert_eq!(members[0].role, Role::Owner);
}

#[tokio::test]
async fn duplicate_slug_is_rejected_at_creation() {
    let store = Arc::new(FakeStore::new());
    let user = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store);
    let actor = identity(user, "U1", "u1@acme.example");

    create_workspace(&service, &actor, "Acme", Some("acme")).await;

    let result = service
        .create_workspace(
            &actor,
            CreateWorkspaceInput {
                name: "Acme Two".to_owned(),
                slug: Some("acme".to_owned()),
                description: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn invite_then_accept_converts_to_membership() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let invitee_id = store.register_user("U2", "u2@acme.example").await;
    let (service, email_service) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let invitee = identity(invitee_id, "U2", "u2@acme.example");

    let access = create_workspace(&service, &owner, "Acme", Some("acme")).await;

    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));

    assert_eq!(email_service.sent.lock().await.len(), 1);

    let pending = service
        .user_invitations(&invitee)
        .await
        .unwrap_or_else(|error| panic!("listing failed: {error}"));
    assert_eq!(pending.len(), 1);

    let accepted = service
        .accept_invitation(&invitee, invitation.id)
        .await
        .unwrap_or_else(|error| panic!("acceptance failed: {error}"));
    assert_eq!(accepted.role, Role::Member);
    assert_eq!(accepted.permissions, vec![Permission::ViewWorkspace]);

    // The invitation row is gone and the membership shows up.
    assert!(store.invitation_rows().await.is_empty());
    let workspaces = service
        .user_workspaces(&invitee)
        .await
        .unwrap_or_else(|error| panic!("listing failed: {error}"));
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].workspace.name, "Acme");
}

#[tokio::test]
async fn duplicate_pending_invitation_is_rejected() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let access = create_workspace(&service, &owner, "W", None).await;

    let input = CreateInvitationInput {
        workspace_id: access.workspace.id,
        email: "x@y.example".to_owned(),
        role: Role::Admin,
    };
    let first = service.create_invitation(&owner, input.clone()).await;
    assert!(first.is_ok());

    let second = service.create_invitation(&owner, input).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(store.invitation_rows().await.len(), 1);
}

#[tokio::test]
async fn invitation_for_existing_member_is_rejected() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store);
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let access = create_workspace(&service, &owner, "W", None).await;

    let result = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u1@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn invitation_cannot_grant_owner_role() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store);
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let access = create_workspace(&service, &owner, "W", None).await;

    let result = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "x@y.example".to_owned(),
                role: Role::Owner,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn invitation_requires_invite_permission() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let member_id = store.register_user("U2", "u2@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let member = identity(member_id, "U2", "u2@acme.example");
    let access = create_workspace(&service, &owner, "W", None).await;

    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));
    let accepted = service.accept_invitation(&member, invitation.id).await;
    assert!(accepted.is_ok());

    let result = service
        .create_invitation(
            &member,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "x@y.example".to_owned(),
                role: Role::Member,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn removing_second_to_last_owner_succeeds_then_last_owner_is_protected() {
    let store = Arc::new(FakeStore::new());
    let u1 = store.register_user("U1", "u1@acme.example").await;
    let u2 = store.register_user("U2", "u2@acme.example").await;
    let (service, _) = service(store.clone());
    let owner1 = identity(u1, "U1", "u1@acme.example");
    let owner2 = identity(u2, "U2", "u2@acme.example");

    let access = create_workspace(&service, &owner1, "W", None).await;
    let invitation = service
        .create_invitation(
            &owner1,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));
    let accepted = service.accept_invitation(&owner2, invitation.id).await;
    assert!(accepted.is_ok());

    // Promote U2 to owner so the workspace has exactly two owners.
    let members = service
        .workspace_members(&owner1, access.workspace.id)
        .await
        .unwrap_or_else(|error| panic!("listing failed: {error}"));
    let u2_membership = members
        .iter()
        .find(|record| record.user_id == u2)
        .unwrap_or_else(|| panic!("U2 membership missing"));
    let promoted = service
        .update_member_role(&owner1, u2_membership.membership_id, Role::Owner)
        .await;
    assert!(promoted.is_ok());

    // Two owners: removing U2 succeeds.
    let removed = service
        .remove_member(&owner1, u2_membership.membership_id)
        .await;
    assert!(removed.is_ok());

    // One owner left: removing U1 must fail and change nothing.
    let u1_membership = members
        .iter()
        .find(|record| record.user_id == u1)
        .unwrap_or_else(|| panic!("U1 membership missing"));
    let before = store.member_rows().await;
    let result = service
        .remove_member(&owner1, u1_membership.membership_id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(store.member_rows().await, before);
}

#[tokio::test]
async fn demoting_the_last_owner_is_rejected_and_state_unchanged() {
    let store = Arc::new(FakeStore::new());
    let u1 = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(u1, "U1", "u1@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let members = service
        .workspace_members(&owner, access.workspace.id)
        .await
        .unwrap_or_else(|error| panic!("listing failed: {error}"));

    let before = store.member_rows().await;
    let result = service
        .update_member_role(&owner, members[0].membership_id, Role::Admin)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(store.member_rows().await, before);
}

#[tokio::test]
async fn update_workspace_requires_edit_permission() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let member_id = store.register_user("U2", "u2@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let member = identity(member_id, "U2", "u2@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));
    let accepted = service.accept_invitation(&member, invitation.id).await;
    assert!(accepted.is_ok());

    let result = service
        .update_workspace(
            &member,
            UpdateWorkspaceInput {
                workspace_id: access.workspace.id,
                name: "Renamed".to_owned(),
                slug: None,
                description: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // The workspace row is unchanged.
    let reloaded = service
        .user_workspaces(&owner)
        .await
        .unwrap_or_else(|error| panic!("listing failed: {error}"));
    assert_eq!(reloaded[0].workspace.name, "W");
}

#[tokio::test]
async fn update_workspace_rejects_taken_slug() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store);
    let owner = identity(owner_id, "U1", "u1@acme.example");

    create_workspace(&service, &owner, "First", Some("first")).await;
    let second = create_workspace(&service, &owner, "Second", Some("second")).await;

    let result = service
        .update_workspace(
            &owner,
            UpdateWorkspaceInput {
                workspace_id: second.workspace.id,
                name: "Second".to_owned(),
                slug: Some("first".to_owned()),
                description: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn accepting_with_mismatched_email_is_forbidden() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let other_id = store.register_user("U3", "u3@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let other = identity(other_id, "U3", "u3@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));

    let result = service.accept_invitation(&other, invitation.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(store.invitation_rows().await.len(), 1);
}

#[tokio::test]
async fn expired_invitation_cannot_be_accepted() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let invitee_id = store.register_user("U2", "u2@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let invitee = identity(invitee_id, "U2", "u2@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));

    store
        .age_invitation(invitation.id, Utc::now() - Duration::days(1))
        .await;

    let result = service.accept_invitation(&invitee, invitation.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    // The row stays in place for revocation or re-issue.
    assert_eq!(store.invitation_rows().await.len(), 1);
}

#[tokio::test]
async fn accepting_missing_invitation_changes_nothing() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");

    create_workspace(&service, &owner, "W", None).await;
    let members_before = store.member_rows().await;

    let result = service.accept_invitation(&owner, InvitationId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(store.member_rows().await, members_before);
}

#[tokio::test]
async fn second_acceptance_by_same_user_is_a_conflict() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let invitee_id = store.register_user("U2", "u2@acme.example").await;
    let (service, _) = service_with_policy(
        store.clone(),
        InvitationPolicy {
            require_email_match: false,
            enforce_expiry: true,
        },
    );
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let invitee = identity(invitee_id, "U2", "u2@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let first = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2@acme.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));
    let second = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "u2-alias@acme.example".to_owned(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));

    let accepted = service.accept_invitation(&invitee, first.id).await;
    assert!(accepted.is_ok());

    let result = service.accept_invitation(&invitee, second.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Exactly one active membership for the (workspace, user) pair.
    let active = store
        .member_rows()
        .await
        .into_iter()
        .filter(|member| member.user_id == invitee_id && member.is_active())
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn revoking_returns_the_deleted_row() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let (service, _) = service(store.clone());
    let owner = identity(owner_id, "U1", "u1@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;
    let invitation = service
        .create_invitation(
            &owner,
            CreateInvitationInput {
                workspace_id: access.workspace.id,
                email: "x@y.example".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("invitation failed: {error}"));

    let revoked = service.revoke_invitation(&owner, invitation.id).await;
    assert!(revoked.is_ok());
    assert_eq!(
        revoked.ok().map(|row| row.email),
        Some("x@y.example".to_owned())
    );
    assert!(store.invitation_rows().await.is_empty());

    let again = service.revoke_invitation(&owner, invitation.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn member_listing_requires_membership() {
    let store = Arc::new(FakeStore::new());
    let owner_id = store.register_user("U1", "u1@acme.example").await;
    let outsider_id = store.register_user("U9", "u9@acme.example").await;
    let (service, _) = service(store);
    let owner = identity(owner_id, "U1", "u1@acme.example");
    let outsider = identity(outsider_id, "U9", "u9@acme.example");

    let access = create_workspace(&service, &owner, "W", None).await;

    let result = service
        .workspace_members(&outsider, access.workspace.id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn user_invitations_require_a_profile_email() {
    let store = Arc::new(FakeStore::new());
    let (service, _) = service(store);
    // Identity without a profile row at all.
    let ghost = UserIdentity::new(UserId::new(), "Ghost", None);

    let result = service.user_invitations(&ghost).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

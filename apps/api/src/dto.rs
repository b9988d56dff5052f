//! Transport types exported to the TypeScript frontend via ts-rs.

mod auth;
mod chats;
mod common;
mod profiles;
mod tasks;
mod workspaces;

pub use auth::{CreateSessionRequest, UserIdentityResponse};
pub use chats::{
    AddMessageRequest, ChatMessageInput, ChatMessageResponse, ChatResponse,
    ChatWithMessagesResponse, CreateChatRequest, SaveMessagesRequest, SendMessageRequest,
    UpdateChatStatusRequest,
};
pub use common::HealthResponse;
pub use profiles::{ProfileResponse, UpdateProfileRequest};
pub use tasks::{
    AgentResponse, CreateAgentRequest, CreateTaskRequest, SubmitTaskRequest, TaskResponse,
    TaskWithAgentResponse, UpdateAgentRequest, UpdateTaskStatusRequest,
};
pub use workspaces::{
    CreateInvitationRequest, CreateWorkspaceRequest, InvitationResponse, MemberResponse,
    MembershipResponse, SelectWorkspaceRequest, UpdateMemberRoleRequest, UpdateWorkspaceRequest,
    UserInvitationResponse, WorkspaceAccessResponse, WorkspaceResponse, WorkspaceSummaryResponse,
};

use serde::{Deserialize, Serialize};
use severatee_application::TaskWithAgent;
use severatee_domain::{Agent, Task};
use ts_rs::TS;

/// Incoming payload for agent creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-agent-request.ts"
)]
pub struct CreateAgentRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Incoming payload for an agent update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-agent-request.ts"
)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Incoming payload for task creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/create-task-request.ts"
)]
pub struct CreateTaskRequest {
    pub name: String,
    pub instructions: String,
    pub agent_id: String,
    pub due_date: Option<String>,
}

/// Incoming payload for a task status update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-task-status-request.ts"
)]
pub struct UpdateTaskStatusRequest {
    pub status: String,
    pub progress: i32,
}

/// Incoming payload for a task submission.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/submit-task-request.ts"
)]
pub struct SubmitTaskRequest {
    pub answer: String,
    pub progress: i32,
}

/// API representation of an agent.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/agent-response.ts"
)]
pub struct AgentResponse {
    pub id: String,
    pub name: String,
    pub wallet_address: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// API representation of a task.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/task-response.ts"
)]
pub struct TaskResponse {
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub agent_id: String,
    pub status: String,
    pub progress: i32,
    pub answer: Option<String>,
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
    pub vault_record_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A task joined with its agent.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/task-with-agent-response.ts"
)]
pub struct TaskWithAgentResponse {
    pub task: TaskResponse,
    pub agent: AgentResponse,
}

impl From<Agent> for AgentResponse {
    fn from(value: Agent) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            wallet_address: value.wallet_address,
            description: value.description,
            status: value.status.as_str().to_owned(),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(value: Task) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            instructions: value.instructions,
            agent_id: value.agent_id.to_string(),
            status: value.status.as_str().to_owned(),
            progress: value.progress,
            answer: value.answer,
            due_date: value.due_date.map(|timestamp| timestamp.to_rfc3339()),
            completed_at: value.completed_at.map(|timestamp| timestamp.to_rfc3339()),
            vault_record_id: value.vault_record_id,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

impl From<TaskWithAgent> for TaskWithAgentResponse {
    fn from(value: TaskWithAgent) -> Self {
        Self {
            task: TaskResponse::from(value.task),
            agent: AgentResponse::from(value.agent),
        }
    }
}

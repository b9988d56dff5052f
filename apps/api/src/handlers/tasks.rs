use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use severatee_application::{AgentChanges, NewAgentInput, NewTaskInput, TaskFilter};
use severatee_core::{AppError, UserIdentity};
use severatee_domain::{AgentId, AgentStatus, TaskId, TaskStatus};
use uuid::Uuid;

use crate::dto::{
    AgentResponse, CreateAgentRequest, CreateTaskRequest, SubmitTaskRequest, TaskResponse,
    TaskWithAgentResponse, UpdateAgentRequest, UpdateTaskStatusRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_agent_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Json(payload): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<AgentResponse>)> {
    let agent = state
        .task_service
        .create_agent(NewAgentInput {
            name: payload.name,
            description: payload.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AgentResponse::from(agent))))
}

pub async fn list_agents_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<AgentResponse>>> {
    let agents = state
        .task_service
        .agents()
        .await?
        .into_iter()
        .map(AgentResponse::from)
        .collect();

    Ok(Json(agents))
}

pub async fn get_agent_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<Json<AgentResponse>> {
    let agent = state.task_service.agent(AgentId::from_uuid(agent_id)).await?;

    Ok(Json(AgentResponse::from(agent)))
}

pub async fn update_agent_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(agent_id): Path<Uuid>,
    Json(payload): Json<UpdateAgentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let status = payload
        .status
        .as_deref()
        .map(AgentStatus::from_str)
        .transpose()?;

    let agent = state
        .task_service
        .update_agent(
            AgentId::from_uuid(agent_id),
            AgentChanges {
                name: payload.name,
                description: payload.description,
                status,
            },
        )
        .await?;

    Ok(Json(AgentResponse::from(agent)))
}

pub async fn delete_agent_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .task_service
        .delete_agent(AgentId::from_uuid(agent_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_task_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let agent_id = Uuid::from_str(&payload.agent_id)
        .map_err(|error| AppError::Validation(format!("invalid agent id: {error}")))?;
    let due_date = payload
        .due_date
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    let task = state
        .task_service
        .create_task(NewTaskInput {
            name: payload.name,
            instructions: payload.instructions,
            agent_id: AgentId::from_uuid(agent_id),
            due_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// Listing filters accepted by the task index.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub agent_id: Option<Uuid>,
}

pub async fn list_tasks_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<TaskWithAgentResponse>>> {
    let status = query
        .status
        .as_deref()
        .map(TaskStatus::from_str)
        .transpose()?;

    let tasks = state
        .task_service
        .tasks(TaskFilter {
            status,
            agent_id: query.agent_id.map(AgentId::from_uuid),
        })
        .await?
        .into_iter()
        .map(TaskWithAgentResponse::from)
        .collect();

    Ok(Json(tasks))
}

pub async fn update_task_status_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskStatusRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let status = TaskStatus::from_str(&payload.status)?;
    let task = state
        .task_service
        .update_task_status(TaskId::from_uuid(task_id), status, payload.progress)
        .await?;

    Ok(Json(TaskResponse::from(task)))
}

pub async fn submit_task_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SubmitTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .task_service
        .submit_answer(TaskId::from_uuid(task_id), payload.answer, payload.progress)
        .await?;

    Ok(Json(TaskResponse::from(task)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| AppError::Validation(format!("invalid timestamp '{value}': {error}")))
}

//! PostgreSQL-backed agent and task repository.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use severatee_application::{
    AgentChanges, AgentTaskRepository, NewTask, TaskFilter, TaskWithAgent,
};
use severatee_core::{AppError, AppResult};
use severatee_domain::{Agent, AgentId, AgentStatus, Task, TaskId, TaskStatus};

/// PostgreSQL implementation of the agent/task repository port.
#[derive(Clone)]
pub struct PostgresAgentTaskRepository {
    pool: PgPool,
}

impl PostgresAgentTaskRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AgentRow {
    id: uuid::Uuid,
    name: String,
    wallet_address: Option<String>,
    description: Option<String>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl AgentRow {
    fn into_domain(self) -> AppResult<Agent> {
        Ok(Agent {
            id: AgentId::from_uuid(self.id),
            name: self.name,
            wallet_address: self.wallet_address,
            description: self.description,
            status: AgentStatus::from_str(&self.status).map_err(|error| {
                AppError::Internal(format!("failed to decode agent status: {error}"))
            })?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: uuid::Uuid,
    name: String,
    instructions: String,
    agent_id: uuid::Uuid,
    status: String,
    progress: i32,
    answer: Option<String>,
    due_date: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    vault_record_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TaskRow {
    fn into_domain(self) -> AppResult<Task> {
        Ok(Task {
            id: TaskId::from_uuid(self.id),
            name: self.name,
            instructions: self.instructions,
            agent_id: AgentId::from_uuid(self.agent_id),
            status: TaskStatus::from_str(&self.status).map_err(|error| {
                AppError::Internal(format!("failed to decode task status: {error}"))
            })?,
            progress: self.progress,
            answer: self.answer,
            due_date: self.due_date,
            completed_at: self.completed_at,
            vault_record_id: self.vault_record_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const AGENT_COLUMNS: &str =
    "id, name, wallet_address, description, status, created_at, updated_at";
const TASK_COLUMNS: &str = "id, name, instructions, agent_id, status, progress, answer, \
     due_date, completed_at, vault_record_id, created_at, updated_at";

#[async_trait]
impl AgentTaskRepository for PostgresAgentTaskRepository {
    async fn insert_agent(
        &self,
        name: &str,
        wallet_address: &str,
        description: Option<&str>,
    ) -> AppResult<Agent> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            INSERT INTO agents (name, wallet_address, description)
            VALUES ($1, $2, $3)
            RETURNING {AGENT_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(wallet_address)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(ref database_error) = error {
                if database_error.code().as_deref() == Some("23505") {
                    return AppError::Conflict(
                        "an agent with this wallet address already exists".to_owned(),
                    );
                }
            }
            AppError::Internal(format!("failed to insert agent: {error}"))
        })?;

        row.into_domain()
    }

    async fn find_agent(&self, agent_id: AgentId) -> AppResult<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            SELECT {AGENT_COLUMNS}
            FROM agents
            WHERE id = $1
            "#,
        ))
        .bind(agent_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find agent: {error}")))?;

        row.map(AgentRow::into_domain).transpose()
    }

    async fn find_agent_by_wallet(&self, address: &str) -> AppResult<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            SELECT {AGENT_COLUMNS}
            FROM agents
            WHERE wallet_address = $1
            "#,
        ))
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find agent by wallet: {error}")))?;

        row.map(AgentRow::into_domain).transpose()
    }

    async fn list_agents(&self) -> AppResult<Vec<Agent>> {
        let rows = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            SELECT {AGENT_COLUMNS}
            FROM agents
            ORDER BY created_at DESC
            "#,
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list agents: {error}")))?;

        rows.into_iter().map(AgentRow::into_domain).collect()
    }

    async fn update_agent(&self, agent_id: AgentId, changes: AgentChanges) -> AppResult<Agent> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            UPDATE agents
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = now()
            WHERE id = $1
            RETURNING {AGENT_COLUMNS}
            "#,
        ))
        .bind(agent_id.as_uuid())
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.status.map(|status| status.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update agent: {error}")))?
        .ok_or_else(|| AppError::NotFound("agent not found".to_owned()))?;

        row.into_domain()
    }

    async fn delete_agent(&self, agent_id: AgentId) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM agents
            WHERE id = $1
            "#,
        )
        .bind(agent_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete agent: {error}")))?;

        Ok(())
    }

    async fn count_open_tasks(&self, agent_id: AgentId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT count(*)
            FROM tasks
            WHERE agent_id = $1 AND status IN ('assigned', 'in_progress')
            "#,
        )
        .bind(agent_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count open tasks: {error}")))
    }

    async fn insert_task(&self, task: NewTask) -> AppResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (name, instructions, agent_id, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(&task.name)
        .bind(&task.instructions)
        .bind(task.agent_id.as_uuid())
        .bind(task.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert task: {error}")))?;

        row.into_domain()
    }

    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1
            "#,
        ))
        .bind(task_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find task: {error}")))?;

        row.map(TaskRow::into_domain).transpose()
    }

    async fn list_tasks(&self, filter: TaskFilter) -> AppResult<Vec<TaskWithAgent>> {
        #[derive(Debug, FromRow)]
        struct TaskJoinRow {
            #[sqlx(flatten)]
            task: TaskRow,
            agent_name: String,
            agent_wallet_address: Option<String>,
            agent_description: Option<String>,
            agent_status: String,
            agent_created_at: chrono::DateTime<chrono::Utc>,
            agent_updated_at: chrono::DateTime<chrono::Utc>,
        }

        let rows = sqlx::query_as::<_, TaskJoinRow>(
            r#"
            SELECT tasks.id, tasks.name, tasks.instructions, tasks.agent_id, tasks.status,
                   tasks.progress, tasks.answer, tasks.due_date, tasks.completed_at,
                   tasks.vault_record_id, tasks.created_at, tasks.updated_at,
                   agents.name AS agent_name,
                   agents.wallet_address AS agent_wallet_address,
                   agents.description AS agent_description,
                   agents.status AS agent_status,
                   agents.created_at AS agent_created_at,
                   agents.updated_at AS agent_updated_at
            FROM tasks
            INNER JOIN agents ON agents.id = tasks.agent_id
            WHERE ($1::text IS NULL OR tasks.status = $1)
              AND ($2::uuid IS NULL OR tasks.agent_id = $2)
            ORDER BY tasks.created_at DESC
            "#,
        )
        .bind(filter.status.map(|status| status.as_str()))
        .bind(filter.agent_id.map(|agent_id| agent_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tasks: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let agent_id = AgentId::from_uuid(row.task.agent_id);
                Ok(TaskWithAgent {
                    agent: Agent {
                        id: agent_id,
                        name: row.agent_name,
                        wallet_address: row.agent_wallet_address,
                        description: row.agent_description,
                        status: AgentStatus::from_str(&row.agent_status).map_err(|error| {
                            AppError::Internal(format!(
                                "failed to decode agent status: {error}"
                            ))
                        })?,
                        created_at: row.agent_created_at,
                        updated_at: row.agent_updated_at,
                    },
                    task: row.task.into_domain()?,
                })
            })
            .collect()
    }

    async fn set_task_progress(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        progress: i32,
    ) -> AppResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET status = $2, progress = $3, updated_at = now()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id.as_uuid())
        .bind(status.as_str())
        .bind(progress)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update task: {error}")))?
        .ok_or_else(|| AppError::NotFound("task not found".to_owned()))?;

        row.into_domain()
    }

    async fn complete_task(
        &self,
        task_id: TaskId,
        answer: &str,
        progress: i32,
        vault_record_id: &str,
    ) -> AppResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
            SET status = 'completed', answer = $2, progress = $3,
                vault_record_id = $4, completed_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id.as_uuid())
        .bind(answer)
        .bind(progress)
        .bind(vault_record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to complete task: {error}")))?
        .ok_or_else(|| AppError::NotFound("task not found".to_owned()))?;

        row.into_domain()
    }
}

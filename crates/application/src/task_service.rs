//! Agent and task ports and application service.
//!
//! Wallet provisioning and submission storage are passthroughs to opaque
//! providers; the relational rows here only describe those calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use severatee_core::{AppError, AppResult, NonEmptyString};
use severatee_domain::{
    Agent, AgentId, AgentStatus, Task, TaskId, TaskStatus, validate_progress,
    validate_wallet_address,
};

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Wallet returned by the custody provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedWallet {
    /// Provider-side wallet id.
    pub id: String,
    /// On-chain address.
    pub address: String,
    /// Chain the wallet was created on.
    pub chain_type: String,
}

/// Port for the hosted wallet custody provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Provisions a new wallet and returns its address.
    async fn create_wallet(&self) -> AppResult<ProvisionedWallet>;
}

/// Submission payload stored in the encrypted vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSubmission {
    /// The completed task.
    pub task_id: TaskId,
    /// The agent that produced the answer.
    pub agent_id: AgentId,
    /// The agent's wallet address, when provisioned.
    pub agent_wallet_address: Option<String>,
    /// Task display name, kept as vault metadata.
    pub task_name: String,
    /// Agent display name, kept as vault metadata.
    pub agent_name: String,
    /// The submitted answer.
    pub answer: String,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

/// Port for the encrypted record vault holding task submissions.
#[async_trait]
pub trait SubmissionVault: Send + Sync {
    /// Stores a submission and returns the vault record id.
    async fn store_submission(&self, submission: &TaskSubmission) -> AppResult<String>;
}

/// Insert payload for an agent row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgentInput {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Field changes applied by an agent update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentChanges {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New operational state.
    pub status: Option<AgentStatus>,
}

/// Input payload for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskInput {
    /// Display name.
    pub name: String,
    /// Instructions handed to the agent.
    pub instructions: String,
    /// Assigned agent.
    pub agent_id: AgentId,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
}

/// Insert payload handed to the repository after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Display name.
    pub name: String,
    /// Instructions handed to the agent.
    pub instructions: String,
    /// Assigned agent.
    pub agent_id: AgentId,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
}

/// Listing filter for tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to one lifecycle state.
    pub status: Option<TaskStatus>,
    /// Restrict to one agent.
    pub agent_id: Option<AgentId>,
}

/// A task joined with its agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithAgent {
    /// The task row.
    pub task: Task,
    /// The assigned agent.
    pub agent: Agent,
}

/// Repository port for agent and task persistence.
#[async_trait]
pub trait AgentTaskRepository: Send + Sync {
    /// Inserts an agent row.
    async fn insert_agent(
        &self,
        name: &str,
        wallet_address: &str,
        description: Option<&str>,
    ) -> AppResult<Agent>;

    /// Finds an agent by id.
    async fn find_agent(&self, agent_id: AgentId) -> AppResult<Option<Agent>>;

    /// Finds an agent by wallet address.
    async fn find_agent_by_wallet(&self, address: &str) -> AppResult<Option<Agent>>;

    /// Lists agents, newest first.
    async fn list_agents(&self) -> AppResult<Vec<Agent>>;

    /// Applies changes to an agent; unset fields keep their value.
    async fn update_agent(&self, agent_id: AgentId, changes: AgentChanges) -> AppResult<Agent>;

    /// Deletes an agent row.
    async fn delete_agent(&self, agent_id: AgentId) -> AppResult<()>;

    /// Counts tasks still assigned or in progress for an agent.
    async fn count_open_tasks(&self, agent_id: AgentId) -> AppResult<i64>;

    /// Inserts a task row with status `assigned` and progress 0.
    async fn insert_task(&self, task: NewTask) -> AppResult<Task>;

    /// Finds a task by id.
    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<Task>>;

    /// Lists tasks joined with their agents, newest first.
    async fn list_tasks(&self, filter: TaskFilter) -> AppResult<Vec<TaskWithAgent>>;

    /// Sets task status and progress.
    async fn set_task_progress(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        progress: i32,
    ) -> AppResult<Task>;

    /// Marks a task completed with its answer and vault record id.
    async fn complete_task(
        &self,
        task_id: TaskId,
        answer: &str,
        progress: i32,
        vault_record_id: &str,
    ) -> AppResult<Task>;
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for delegated agent work.
#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn AgentTaskRepository>,
    wallet_provider: Arc<dyn WalletProvider>,
    vault: Arc<dyn SubmissionVault>,
}

impl TaskService {
    /// Creates a new task service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AgentTaskRepository>,
        wallet_provider: Arc<dyn WalletProvider>,
        vault: Arc<dyn SubmissionVault>,
    ) -> Self {
        Self {
            repository,
            wallet_provider,
            vault,
        }
    }

    /// Creates an agent, provisioning its wallet first.
    pub async fn create_agent(&self, input: NewAgentInput) -> AppResult<Agent> {
        let name = NonEmptyString::new(input.name)?;

        let wallet = self.wallet_provider.create_wallet().await?;
        validate_wallet_address(&wallet.address)?;

        if self
            .repository
            .find_agent_by_wallet(&wallet.address)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "an agent with this wallet address already exists".to_owned(),
            ));
        }

        self.repository
            .insert_agent(name.as_str(), &wallet.address, input.description.as_deref())
            .await
    }

    /// Lists agents, newest first.
    pub async fn agents(&self) -> AppResult<Vec<Agent>> {
        self.repository.list_agents().await
    }

    /// Returns an agent by id.
    pub async fn agent(&self, agent_id: AgentId) -> AppResult<Agent> {
        self.repository
            .find_agent(agent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("agent not found".to_owned()))
    }

    /// Updates agent display fields or status.
    pub async fn update_agent(
        &self,
        agent_id: AgentId,
        changes: AgentChanges,
    ) -> AppResult<Agent> {
        self.agent(agent_id).await?;
        self.repository.update_agent(agent_id, changes).await
    }

    /// Deletes an agent without open tasks.
    pub async fn delete_agent(&self, agent_id: AgentId) -> AppResult<()> {
        self.agent(agent_id).await?;

        let open_tasks = self.repository.count_open_tasks(agent_id).await?;
        if open_tasks > 0 {
            return Err(AppError::Conflict(format!(
                "agent still has {open_tasks} open task(s)"
            )));
        }

        self.repository.delete_agent(agent_id).await
    }

    /// Creates a task assigned to an existing agent.
    pub async fn create_task(&self, input: NewTaskInput) -> AppResult<Task> {
        let name = NonEmptyString::new(input.name)?;
        let instructions = NonEmptyString::new(input.instructions)?;

        self.agent(input.agent_id).await?;

        self.repository
            .insert_task(NewTask {
                name: name.into(),
                instructions: instructions.into(),
                agent_id: input.agent_id,
                due_date: input.due_date,
            })
            .await
    }

    /// Lists tasks with their agents, newest first.
    pub async fn tasks(&self, filter: TaskFilter) -> AppResult<Vec<TaskWithAgent>> {
        self.repository.list_tasks(filter).await
    }

    /// Updates task status and progress.
    pub async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        progress: i32,
    ) -> AppResult<Task> {
        validate_progress(progress)?;

        if self.repository.find_task(task_id).await?.is_none() {
            return Err(AppError::NotFound("task not found".to_owned()));
        }

        self.repository
            .set_task_progress(task_id, status, progress)
            .await
    }

    /// Submits a task answer.
    ///
    /// The submission is stored in the encrypted vault before any task
    /// mutation, so a vault failure leaves the task untouched.
    pub async fn submit_answer(
        &self,
        task_id: TaskId,
        answer: String,
        progress: i32,
    ) -> AppResult<Task> {
        let answer: String = NonEmptyString::new(answer)?.into();
        validate_progress(progress)?;

        let task = self
            .repository
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("task not found".to_owned()))?;
        let agent = self.agent(task.agent_id).await?;

        let record_id = self
            .vault
            .store_submission(&TaskSubmission {
                task_id: task.id,
                agent_id: agent.id,
                agent_wallet_address: agent.wallet_address.clone(),
                task_name: task.name.clone(),
                agent_name: agent.name.clone(),
                answer: answer.clone(),
                submitted_at: Utc::now(),
            })
            .await?;

        self.repository
            .complete_task(task_id, &answer, progress, &record_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use severatee_core::{AppError, AppResult};
    use severatee_domain::{Agent, AgentId, AgentStatus, Task, TaskId, TaskStatus};
    use tokio::sync::Mutex;

    use super::{
        AgentChanges, AgentTaskRepository, NewAgentInput, NewTask, NewTaskInput,
        ProvisionedWallet, SubmissionVault, TaskFilter, TaskService, TaskSubmission,
        TaskWithAgent, WalletProvider,
    };

    #[derive(Default)]
    struct FakeAgentTaskRepository {
        agents: Mutex<Vec<Agent>>,
        tasks: Mutex<Vec<Task>>,
    }

    #[async_trait]
    impl AgentTaskRepository for FakeAgentTaskRepository {
        async fn insert_agent(
            &self,
            name: &str,
            wallet_address: &str,
            description: Option<&str>,
        ) -> AppResult<Agent> {
            let now = Utc::now();
            let agent = Agent {
                id: AgentId::new(),
                name: name.to_owned(),
                wallet_address: Some(wallet_address.to_owned()),
                description: description.map(str::to_owned),
                status: AgentStatus::Active,
                created_at: now,
                updated_at: now,
            };
            self.agents.lock().await.push(agent.clone());
            Ok(agent)
        }

        async fn find_agent(&self, agent_id: AgentId) -> AppResult<Option<Agent>> {
            Ok(self
                .agents
                .lock()
                .await
                .iter()
                .find(|agent| agent.id == agent_id)
                .cloned())
        }

        async fn find_agent_by_wallet(&self, address: &str) -> AppResult<Option<Agent>> {
            Ok(self
                .agents
                .lock()
                .await
                .iter()
                .find(|agent| agent.wallet_address.as_deref() == Some(address))
                .cloned())
        }

        async fn list_agents(&self) -> AppResult<Vec<Agent>> {
            Ok(self.agents.lock().await.clone())
        }

        async fn update_agent(
            &self,
            agent_id: AgentId,
            changes: AgentChanges,
        ) -> AppResult<Agent> {
            let mut agents = self.agents.lock().await;
            let agent = agents
                .iter_mut()
                .find(|agent| agent.id == agent_id)
                .ok_or_else(|| AppError::NotFound("agent not found".to_owned()))?;
            if let Some(name) = changes.name {
                agent.name = name;
            }
            if let Some(description) = changes.description {
                agent.description = Some(description);
            }
            if let Some(status) = changes.status {
                agent.status = status;
            }
            agent.updated_at = Utc::now();
            Ok(agent.clone())
        }

        async fn delete_agent(&self, agent_id: AgentId) -> AppResult<()> {
            self.agents.lock().await.retain(|agent| agent.id != agent_id);
            Ok(())
        }

        async fn count_open_tasks(&self, agent_id: AgentId) -> AppResult<i64> {
            Ok(self
                .tasks
                .lock()
                .await
                .iter()
                .filter(|task| task.agent_id == agent_id && task.status.is_open())
                .count() as i64)
        }

        async fn insert_task(&self, task: NewTask) -> AppResult<Task> {
            let now = Utc::now();
            let created = Task {
                id: TaskId::new(),
                name: task.name,
                instructions: task.instructions,
                agent_id: task.agent_id,
                status: TaskStatus::Assigned,
                progress: 0,
                answer: None,
                due_date: task.due_date,
                completed_at: None,
                vault_record_id: None,
                created_at: now,
                updated_at: now,
            };
            self.tasks.lock().await.push(created.clone());
            Ok(created)
        }

        async fn find_task(&self, task_id: TaskId) -> AppResult<Option<Task>> {
            Ok(self
                .tasks
                .lock()
                .await
                .iter()
                .find(|task| task.id == task_id)
                .cloned())
        }

        async fn list_tasks(&self, filter: TaskFilter) -> AppResult<Vec<TaskWithAgent>> {
            let agents = self.agents.lock().await.clone();
            Ok(self
                .tasks
                .lock()
                .await
                .iter()
                .filter(|task| {
                    filter.status.is_none_or(|status| task.status == status)
                        && filter.agent_id.is_none_or(|agent_id| task.agent_id == agent_id)
                })
                .filter_map(|task| {
                    agents
                        .iter()
                        .find(|agent| agent.id == task.agent_id)
                        .map(|agent| TaskWithAgent {
                            task: task.clone(),
                            agent: agent.clone(),
                        })
                })
                .collect())
        }

        async fn set_task_progress(
            &self,
            task_id: TaskId,
            status: TaskStatus,
            progress: i32,
        ) -> AppResult<Task> {
            let mut tasks = self.tasks.lock().await;
            let task = tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| AppError::NotFound("task not found".to_owned()))?;
            task.status = status;
            task.progress = progress;
            task.updated_at = Utc::now();
            Ok(task.clone())
        }

        async fn complete_task(
            &self,
            task_id: TaskId,
            answer: &str,
            progress: i32,
            vault_record_id: &str,
        ) -> AppResult<Task> {
            let mut tasks = self.tasks.lock().await;
            let task = tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| AppError::NotFound("task not found".to_owned()))?;
            task.status = TaskStatus::Completed;
            task.answer = Some(answer.to_owned());
            task.progress = progress;
            task.vault_record_id = Some(vault_record_id.to_owned());
            task.completed_at = Some(Utc::now());
            task.updated_at = Utc::now();
            Ok(task.clone())
        }
    }

    struct FakeWalletProvider {
        address: String,
    }

    #[async_trait]
    impl WalletProvider for FakeWalletProvider {
        async fn create_wallet(&self) -> AppResult<ProvisionedWallet> {
            Ok(ProvisionedWallet {
                id: "wallet-1".to_owned(),
                address: self.address.clone(),
                chain_type: "ethereum".to_owned(),
            })
        }
    }

    #[derive(Default)]
    struct FakeVault {
        fail: bool,
        stored: Mutex<Vec<TaskSubmission>>,
    }

    #[async_trait]
    impl SubmissionVault for FakeVault {
        async fn store_submission(&self, submission: &TaskSubmission) -> AppResult<String> {
            if self.fail {
                return Err(AppError::Internal("vault unreachable".to_owned()));
            }
            self.stored.lock().await.push(submission.clone());
            Ok("record-1".to_owned())
        }
    }

    const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn service(vault: Arc<FakeVault>) -> (TaskService, Arc<FakeAgentTaskRepository>) {
        let repository = Arc::new(FakeAgentTaskRepository::default());
        let service = TaskService::new(
            repository.clone(),
            Arc::new(FakeWalletProvider {
                address: ADDRESS.to_owned(),
            }),
            vault,
        );
        (service, repository)
    }

    async fn agent_with_task(service: &TaskService) -> (Agent, Task) {
        let agent = service
            .create_agent(NewAgentInput {
                name: "MDR-1".to_owned(),
                description: None,
            })
            .await
            .unwrap_or_else(|error| panic!("agent creation failed: {error}"));
        let task = service
            .create_task(NewTaskInput {
                name: "Refine Siena".to_owned(),
                instructions: "Sort the numbers".to_owned(),
                agent_id: agent.id,
                due_date: None,
            })
            .await
            .unwrap_or_else(|error| panic!("task creation failed: {error}"));
        (agent, task)
    }

    #[tokio::test]
    async fn duplicate_wallet_address_is_rejected() {
        let (service, _) = service(Arc::new(FakeVault::default()));

        let first = service
            .create_agent(NewAgentInput {
                name: "MDR-1".to_owned(),
                description: None,
            })
            .await;
        assert!(first.is_ok());

        // The fake provider always returns the same address.
        let second = service
            .create_agent(NewAgentInput {
                name: "MDR-2".to_owned(),
                description: None,
            })
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn agent_with_open_tasks_cannot_be_deleted() {
        let (service, _) = service(Arc::new(FakeVault::default()));
        let (agent, _task) = agent_with_task(&service).await;

        let result = service.delete_agent(agent.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn task_for_missing_agent_is_rejected() {
        let (service, _) = service(Arc::new(FakeVault::default()));

        let result = service
            .create_task(NewTaskInput {
                name: "T".to_owned(),
                instructions: "I".to_owned(),
                agent_id: AgentId::new(),
                due_date: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn out_of_range_progress_is_rejected() {
        let (service, _) = service(Arc::new(FakeVault::default()));
        let (_, task) = agent_with_task(&service).await;

        let result = service
            .update_task_status(task.id, TaskStatus::InProgress, 150)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn submission_completes_the_task_with_vault_record() {
        let vault = Arc::new(FakeVault::default());
        let (service, _) = service(vault.clone());
        let (_, task) = agent_with_task(&service).await;

        let completed = service
            .submit_answer(task.id, "42".to_owned(), 100)
            .await;
        assert!(completed.is_ok());
        let completed = completed.unwrap_or_else(|error| panic!("submission failed: {error}"));
        assert_eq!(completed.status, TaskStatus::Completed);
        assert_eq!(completed.vault_record_id, Some("record-1".to_owned()));
        assert_eq!(completed.answer, Some("42".to_owned()));

        let stored = vault.stored.lock().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].agent_wallet_address, Some(ADDRESS.to_owned()));
    }

    #[tokio::test]
    async fn vault_failure_leaves_the_task_untouched() {
        let vault = Arc::new(FakeVault {
            fail: true,
            stored: Mutex::new(Vec::new()),
        });
        let (service, repository) = service(vault);
        let (_, task) = agent_with_task(&service).await;

        let result = service.submit_answer(task.id, "42".to_owned(), 100).await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let tasks = repository.tasks.lock().await;
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
        assert!(tasks[0].vault_record_id.is_none());
    }
}

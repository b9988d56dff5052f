//! Agent and task domain types for delegated work.
//!
//! Agents are external AI workers holding blockchain wallets; tasks are
//! units of work assigned to them. Wallet custody and submission encryption
//! live with external providers, so only addresses and vault record ids are
//! kept here.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use severatee_core::{AppError, AppResult};
use uuid::Uuid;

/// Unique identifier for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Creates a new random agent identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an agent identifier from an existing UUID value.
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

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AgentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID value.
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

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Operational state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Accepting task assignments.
    Active,
    /// Not accepting assignments.
    Inactive,
    /// Temporarily withdrawn for upkeep.
    Maintenance,
}

impl AgentStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
        }
    }
}

impl FromStr for AgentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(AppError::Validation(format!(
                "unknown agent status '{value}'"
            ))),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Handed to an agent, not yet started.
    Assigned,
    /// Being worked on.
    InProgress,
    /// Finished with a stored submission.
    Completed,
    /// Declined or failed review.
    Rejected,
}

impl TaskStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Returns whether the task still counts against its agent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown task status '{value}'"
            ))),
        }
    }
}

/// An external AI worker with a provisioned wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Stable agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Provisioned wallet address, unique when present.
    pub wallet_address: Option<String>,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Operational state.
    pub status: AgentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A unit of work delegated to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task identifier.
    pub id: TaskId,
    /// Display name.
    pub name: String,
    /// Instructions handed to the agent.
    pub instructions: String,
    /// Assigned agent.
    pub agent_id: AgentId,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Completion percentage, 0 to 100.
    pub progress: i32,
    /// Submitted answer, once completed.
    pub answer: Option<String>,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Record id returned by the encrypted submission vault.
    pub vault_record_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validates a task progress value.
pub fn validate_progress(progress: i32) -> AppResult<()> {
    if !(0..=100).contains(&progress) {
        return Err(AppError::Validation(format!(
            "task progress must be between 0 and 100, got {progress}"
        )));
    }

    Ok(())
}

/// Validates a provisioned wallet address: `0x` followed by 40 hex digits.
pub fn validate_wallet_address(address: &str) -> AppResult<()> {
    let hex = address
        .strip_prefix("0x")
        .ok_or_else(|| AppError::Validation("wallet address must start with '0x'".to_owned()))?;

    if hex.len() != 40 || !hex.chars().all(|character| character.is_ascii_hexdigit()) {
        return Err(AppError::Validation(format!(
            "wallet address '{address}' must be 40 hex digits after the '0x' prefix"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{TaskStatus, validate_progress, validate_wallet_address};

    #[test]
    fn progress_bounds_are_inclusive() {
        assert!(validate_progress(0).is_ok());
        assert!(validate_progress(100).is_ok());
        assert!(validate_progress(-1).is_err());
        assert!(validate_progress(101).is_err());
    }

    #[test]
    fn open_statuses_count_against_agent() {
        assert!(TaskStatus::Assigned.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
        assert!(!TaskStatus::Rejected.is_open());
    }

    #[test]
    fn wallet_address_requires_prefix_and_length() {
        assert!(validate_wallet_address("0x52908400098527886E0F7030069857D2E4169EE7").is_ok());
        assert!(validate_wallet_address("52908400098527886E0F7030069857D2E4169EE7").is_err());
        assert!(validate_wallet_address("0x1234").is_err());
        assert!(validate_wallet_address("0xZZ08400098527886E0F7030069857D2E4169EE7A").is_err());
    }
}

//! Moderation tasks and queue counts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConsoleError;

/// Review state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    /// Waiting for review
    Unresolved,
    /// Reviewed and closed
    Resolved,
    /// Put aside for later
    Deferred,
}

impl TaskStatus {
    /// All statuses in code order.
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Unresolved,
        TaskStatus::Resolved,
        TaskStatus::Deferred,
    ];

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            TaskStatus::Unresolved => 0,
            TaskStatus::Resolved => 1,
            TaskStatus::Deferred => 2,
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Unresolved => "Unresolved",
            TaskStatus::Resolved => "Resolved",
            TaskStatus::Deferred => "Deferred",
        }
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = ConsoleError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(ConsoleError::UnknownCode {
                kind: "task status",
                value: code.to_string(),
            })
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> u8 {
        status.code()
    }
}

impl FromStr for TaskStatus {
    type Err = ConsoleError;

    /// Accepts the code or the name (`unresolved`, `resolved`, `deferred`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::try_from(code);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(s))
            .ok_or(ConsoleError::UnknownCode {
                kind: "task status",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Queue a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QueueType {
    /// A reported profile
    ProfileReport,
    /// A reported chat
    ChatReport,
    /// A verification video awaiting review
    Verification,
}

impl QueueType {
    /// All queues in code order.
    pub const ALL: [QueueType; 3] = [
        QueueType::ProfileReport,
        QueueType::ChatReport,
        QueueType::Verification,
    ];

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            QueueType::ProfileReport => 1,
            QueueType::ChatReport => 2,
            QueueType::Verification => 3,
        }
    }

    /// Short name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            QueueType::ProfileReport => "profile_report",
            QueueType::ChatReport => "chat_report",
            QueueType::Verification => "verification",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            QueueType::ProfileReport => "Profile Report",
            QueueType::ChatReport => "Chat Report",
            QueueType::Verification => "User Verification",
        }
    }
}

impl TryFrom<u8> for QueueType {
    type Error = ConsoleError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|queue| queue.code() == code)
            .ok_or(ConsoleError::UnknownCode {
                kind: "queue type",
                value: code.to_string(),
            })
    }
}

impl From<QueueType> for u8 {
    fn from(queue: QueueType) -> u8 {
        queue.code()
    }
}

impl FromStr for QueueType {
    type Err = ConsoleError;

    /// Accepts the code or the short name (`profile_report`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::try_from(code);
        }
        let wanted = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|queue| queue.name().eq_ignore_ascii_case(&wanted))
            .ok_or(ConsoleError::UnknownCode {
                kind: "queue type",
                value: s.to_string(),
            })
    }
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit of moderation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id
    pub id: String,
    /// Creation time
    pub created_at: String,
    /// Last change
    pub updated_at: String,
    /// Reporting user (the subject itself for verification tasks)
    pub src_user_id: String,
    /// User under review
    pub dst_user_id: String,
    /// Queue the task sits in
    pub queue_type: QueueType,
    /// Review state
    pub status: TaskStatus,
    /// Queue-specific details
    #[serde(default)]
    pub metadata: Value,
}

/// Number of tasks in one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCount {
    /// Queue
    pub queue_type: QueueType,
    /// Tasks in the requested status
    pub count: u64,
}

/// Response of the task-counts endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCountsResponse {
    /// One entry per non-empty queue
    #[serde(default)]
    pub task_counts: Vec<TaskCount>,
}

impl TaskCountsResponse {
    /// Count for `queue`, zero when the server omitted it.
    pub fn count_for(&self, queue: QueueType) -> u64 {
        self.task_counts
            .iter()
            .filter(|c| c.queue_type == queue)
            .map(|c| c.count)
            .sum()
    }
}

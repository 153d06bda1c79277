use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started yet.
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Whether a task in this status counts against an operator's availability.
    pub fn is_active(self) -> bool {
        self != TaskStatus::Completed
    }
}

/// A comment left on a task by its creator or one of its assignees.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating or updating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub deadline: DateTime<Utc>,

    /// Defaults to `Medium` on creation, unchanged on update when absent.
    pub priority: Option<TaskPriority>,

    /// Defaults to `Pending` on creation, unchanged on update when absent.
    pub status: Option<TaskStatus>,
}

/// Represents a task entity as returned by the API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Operators the task is assigned to, in assignment order.
    pub assigned_to: Vec<Uuid>,
    /// Supervisor who created the task.
    pub created_by: Uuid,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new unassigned task owned by `created_by`.
    pub fn new(input: TaskInput, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            deadline: input.deadline,
            priority: input.priority.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            assigned_to: Vec::new(),
            created_by,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the editable fields with `input`, keeping priority and status when absent.
    pub fn apply(&mut self, input: TaskInput) {
        self.title = input.title;
        self.description = input.description;
        self.deadline = input.deadline;
        if let Some(priority) = input.priority {
            self.priority = priority;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }
}

/// Body of `PUT /api/task/{id}/assign`. Replaces the full assignee list.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssignRequest {
    pub assigned_to: Vec<Uuid>,
}

/// Body of `PUT /api/task/{id}/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// Body of `POST /api/task/{id}/comments`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 1000), custom = "not_blank")]
    pub text: String,
}

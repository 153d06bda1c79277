//! Persistence for users, tasks and documents.
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is the production backend;
//! [`MemoryStore`] keeps everything in process and backs local runs without a
//! database as well as the integration tests.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Document, NewDocument, NewUser, Task, User, UserRole};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Inserts a user. An email that is already taken is a `BadRequest`.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Persists every mutable field of `user` and bumps `updated_at`.
    async fn save_user(&self, user: &User) -> Result<User, AppError>;

    /// Users holding `role`, ordered by name.
    async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError>;

    async fn create_task(&self, task: &Task) -> Result<Task, AppError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Persists title, description, deadline, priority and status.
    async fn save_task(&self, task: &Task) -> Result<Task, AppError>;

    /// Replaces the assignee list of a task.
    async fn set_assignees(&self, task_id: Uuid, assignees: &[Uuid]) -> Result<Task, AppError>;

    async fn add_comment(&self, task_id: Uuid, user_id: Uuid, text: &str)
        -> Result<Task, AppError>;

    /// Returns `false` when no task had this id.
    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError>;

    /// Tasks created by `user_id`, newest first.
    async fn list_tasks_created_by(&self, user_id: Uuid) -> Result<Vec<Task>, AppError>;

    /// Tasks assigned to `user_id`, newest first.
    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> Result<Vec<Task>, AppError>;

    /// Number of active (not `Completed`) tasks per operator in `operator_ids`.
    ///
    /// Operators without active tasks are absent from the map.
    async fn active_task_counts(&self, operator_ids: &[Uuid])
        -> Result<HashMap<Uuid, i64>, AppError>;

    async fn create_document(&self, document: NewDocument) -> Result<Document, AppError>;

    /// Documents newest first, restricted to `filter` when given.
    async fn list_documents(&self, filter: Option<&str>) -> Result<Vec<Document>, AppError>;

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError>;
}

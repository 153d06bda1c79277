use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{Comment, Document, NewDocument, NewUser, Task, User, UserRole};

/// In-process store. Tasks and documents are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<Vec<Task>>,
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_task<F>(&self, task_id: Uuid, mutate: F) -> Result<Task, AppError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
        mutate(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    fn newest_first<P>(&self, predicate: P) -> Vec<Task>
    where
        P: Fn(&Task) -> bool,
    {
        self.tasks
            .read()
            .iter()
            .rev()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write();
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AppError::BadRequest("Record already exists".into()));
        }
        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            category: None,
            profile_picture: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|other| other.id != user.id && other.email == user.email)
        {
            return Err(AppError::BadRequest("Record already exists".into()));
        }
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        *stored = User {
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_task(&self, task: &Task) -> Result<Task, AppError> {
        self.tasks.write().push(task.clone());
        Ok(task.clone())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.read().iter().find(|task| task.id == id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<Task, AppError> {
        self.with_task(task.id, |stored| {
            stored.title = task.title.clone();
            stored.description = task.description.clone();
            stored.deadline = task.deadline;
            stored.priority = task.priority;
            stored.status = task.status;
        })
    }

    async fn set_assignees(&self, task_id: Uuid, assignees: &[Uuid]) -> Result<Task, AppError> {
        self.with_task(task_id, |stored| stored.assigned_to = assignees.to_vec())
    }

    async fn add_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Task, AppError> {
        let now = Utc::now();
        self.with_task(task_id, |stored| {
            stored.comments.push(Comment {
                id: Uuid::new_v4(),
                text: text.to_string(),
                user_id,
                created_at: now,
                updated_at: now,
            })
        })
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        Ok(tasks.len() != before)
    }

    async fn list_tasks_created_by(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self.newest_first(|task| task.created_by == user_id))
    }

    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        Ok(self.newest_first(|task| task.is_assigned_to(user_id)))
    }

    async fn active_task_counts(
        &self,
        operator_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        let mut counts = HashMap::new();
        for task in self.tasks.read().iter().filter(|task| task.status.is_active()) {
            for assignee in task.assigned_to.iter().filter(|id| operator_ids.contains(id)) {
                *counts.entry(*assignee).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document, AppError> {
        let record = Document {
            id: Uuid::new_v4(),
            title: document.title,
            file_name: document.file_name,
            original_name: document.original_name,
            filter: document.filter,
            uploaded_by: document.uploaded_by,
            uploaded_at: Utc::now(),
        };
        self.documents.write().push(record.clone());
        Ok(record)
    }

    async fn list_documents(&self, filter: Option<&str>) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents
            .read()
            .iter()
            .rev()
            .filter(|doc| filter.map_or(true, |wanted| doc.filter == wanted))
            .cloned()
            .collect())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.documents.read().iter().find(|doc| doc.id == id).cloned())
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        Ok(documents.len() != before)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{
    Comment, Document, NewDocument, NewUser, Task, TaskPriority, TaskStatus, User, UserRole,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, category, profile_picture, \
     reset_password_expires, created_at, updated_at";

const TASK_COLUMNS: &str =
    "id, title, description, deadline, priority, status, created_by, created_at, updated_at";

const DOCUMENT_COLUMNS: &str =
    "id, title, file_name, original_name, filter, uploaded_by, uploaded_at";

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    deadline: DateTime<Utc>,
    priority: TaskPriority,
    status: TaskStatus,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CommentRow {
    task_id: Uuid,
    id: Uuid,
    text: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))
    }

    /// Attaches assignees and comments to bare task rows, preserving row order.
    async fn hydrate(&self, rows: Vec<TaskRow>) -> Result<Vec<Task>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let assignees = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT task_id, user_id FROM task_assignees WHERE task_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT task_id, id, text, user_id, created_at, updated_at \
             FROM task_comments WHERE task_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut assigned: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (task_id, user_id) in assignees {
            assigned.entry(task_id).or_default().push(user_id);
        }
        let mut commented: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in comments {
            commented.entry(row.task_id).or_default().push(Comment {
                id: row.id,
                text: row.text,
                user_id: row.user_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Task {
                assigned_to: assigned.remove(&row.id).unwrap_or_default(),
                comments: commented.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description,
                deadline: row.deadline,
                priority: row.priority,
                status: row.status,
                created_by: row.created_by,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn load_task(&self, id: Uuid) -> Result<Task, AppError> {
        self.find_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    async fn list_tasks_where(&self, condition: &str, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE {} ORDER BY created_at DESC",
            TASK_COLUMNS, condition
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET name = $1, email = $2, password_hash = $3, role = $4, category = $5, \
             profile_picture = $6, reset_password_expires = $7, updated_at = NOW() \
             WHERE id = $8 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.category)
            .bind(&user.profile_picture)
            .bind(user.reset_password_expires)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY name",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_task(&self, task: &Task) -> Result<Task, AppError> {
        sqlx::query(
            "INSERT INTO tasks (id, title, description, deadline, priority, status, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.deadline)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if !task.assigned_to.is_empty() {
            self.set_assignees(task.id, &task.assigned_to).await?;
        }
        self.load_task(task.id).await
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn save_task(&self, task: &Task) -> Result<Task, AppError> {
        let result = sqlx::query(
            "UPDATE tasks SET title = $1, description = $2, deadline = $3, priority = $4, status = $5, \
             updated_at = NOW() WHERE id = $6",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.deadline)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }
        self.load_task(task.id).await
    }

    async fn set_assignees(&self, task_id: Uuid, assignees: &[Uuid]) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE tasks SET updated_at = NOW() WHERE id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }

        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        for (position, user_id) in assignees.iter().enumerate() {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id, position) VALUES ($1, $2, $3)",
            )
            .bind(task_id)
            .bind(user_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.load_task(task_id).await
    }

    async fn add_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Task, AppError> {
        sqlx::query("INSERT INTO task_comments (id, task_id, user_id, text) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(task_id)
            .bind(user_id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        self.load_task(task_id).await
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks_created_by(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        self.list_tasks_where("created_by = $1", user_id).await
    }

    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        self.list_tasks_where(
            "id IN (SELECT task_id FROM task_assignees WHERE user_id = $1)",
            user_id,
        )
        .await
    }

    async fn active_task_counts(
        &self,
        operator_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        if operator_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT ta.user_id, COUNT(*) FROM task_assignees ta \
             JOIN tasks t ON t.id = ta.task_id \
             WHERE t.status <> 'completed' AND ta.user_id = ANY($1) \
             GROUP BY ta.user_id",
        )
        .bind(operator_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document, AppError> {
        let sql = format!(
            "INSERT INTO documents (id, title, file_name, original_name, filter, uploaded_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(Uuid::new_v4())
            .bind(document.title)
            .bind(document.file_name)
            .bind(document.original_name)
            .bind(document.filter)
            .bind(document.uploaded_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_documents(&self, filter: Option<&str>) -> Result<Vec<Document>, AppError> {
        let sql = format!(
            "SELECT {} FROM documents WHERE ($1::TEXT IS NULL OR filter = $1) \
             ORDER BY uploaded_at DESC",
            DOCUMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(filter)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

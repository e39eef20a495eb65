use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::RepoError;
use crate::tasks::repo_types::{Task, TaskRow};

/// Task store. Every lookup and mutation is keyed by owner as well as id, so a
/// task owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Owner's tasks, newest `created_at` first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>, RepoError>;
    async fn find_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<Option<Task>, RepoError>;
    async fn insert(&self, task: Task) -> Result<Task, RepoError>;
    /// Overwrites title, description, status and `updated_at`. `None` when the
    /// task no longer exists for that owner.
    async fn update(&self, task: Task) -> Result<Option<Task>, RepoError>;
    /// `false` when nothing was deleted.
    async fn delete_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<bool, RepoError>;
}

#[derive(Clone)]
pub struct PgTaskRepo {
    db: PgPool,
}

impl PgTaskRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, RepoError> {
    Ok(rows.into_iter().map(Task::try_from).collect::<anyhow::Result<_>>()?)
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>, RepoError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list tasks by user")?;
        into_tasks(rows)
    }

    async fn find_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<Option<Task>, RepoError> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find owned task")?;
        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn insert(&self, task: Task) -> Result<Task, RepoError> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, user_id, title, description, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.db)
        .await
        .context("insert task")?;
        Ok(Task::try_from(row)?)
    }

    async fn update(&self, task: Task) -> Result<Option<Task>, RepoError> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
               SET title = $3, description = $4, status = $5, updated_at = $6
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .fetch_optional(&self.db)
        .await
        .context("update task")?;
        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn delete_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete task")?;
        Ok(res.rows_affected() > 0)
    }
}

/// Process-local task store. Tasks are kept in insertion order so equal
/// timestamps still list newest first.
#[derive(Default)]
pub struct MemoryTaskRepo {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepo for MemoryTaskRepo {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Task>, RepoError> {
        let tasks = self.tasks.read().await;
        let mut owned: Vec<Task> = tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<Option<Task>, RepoError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .cloned())
    }

    async fn insert(&self, task: Task) -> Result<Task, RepoError> {
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Option<Task>, RepoError> {
        let mut tasks = self.tasks.write().await;
        let Some(stored) = tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.user_id == task.user_id)
        else {
            return Ok(None);
        };
        stored.title = task.title;
        stored.description = task.description;
        stored.status = task.status;
        stored.updated_at = task.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn delete_owned(&self, user_id: Uuid, task_id: Uuid) -> Result<bool, RepoError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !(t.id == task_id && t.user_id == user_id));
        Ok(tasks.len() < before)
    }
}

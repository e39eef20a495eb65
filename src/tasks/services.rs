use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    tasks::{
        dto::{CreateTaskRequest, UpdateTaskRequest},
        repo::TaskRepo,
        repo_types::{Task, TaskStatus},
    },
};

fn parse_status(raw: &str) -> AppResult<TaskStatus> {
    raw.trim().parse().map_err(|_| {
        warn!(status = %raw, "unknown task status");
        AppError::validation("Invalid status")
    })
}

/// Path ids that are not UUIDs cannot name a task, so they are reported as
/// missing rather than malformed.
pub fn parse_task_id(raw: &str) -> AppResult<Uuid> {
    raw.parse().map_err(|_| AppError::NotFound("Task"))
}

pub async fn list(repo: &dyn TaskRepo, owner: Uuid) -> AppResult<Vec<Task>> {
    Ok(repo.list_by_user(owner).await?)
}

pub async fn create(repo: &dyn TaskRepo, owner: Uuid, req: CreateTaskRequest) -> AppResult<Task> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    let status = match req.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => TaskStatus::default(),
    };

    let now = OffsetDateTime::now_utc();
    let task = repo
        .insert(Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: req.description.as_deref().map(str::trim).unwrap_or_default().to_string(),
            status,
            user_id: owner,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(user_id = %owner, task_id = %task.id, "task created");
    Ok(task)
}

/// Partial update. Ownership is checked before the body is validated, and
/// `updated_at` moves even when nothing else changes.
pub async fn update(
    repo: &dyn TaskRepo,
    owner: Uuid,
    task_id: Uuid,
    req: UpdateTaskRequest,
) -> AppResult<Task> {
    let mut task = repo
        .find_owned(owner, task_id)
        .await?
        .ok_or(AppError::NotFound("Task"))?;

    if let Some(title) = req.title.as_deref() {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title cannot be empty"));
        }
        task.title = title.to_string();
    }
    if let Some(description) = req.description.as_deref() {
        task.description = description.trim().to_string();
    }
    if let Some(status) = req.status.as_deref() {
        task.status = parse_status(status)?;
    }
    task.updated_at = OffsetDateTime::now_utc();

    let task = repo.update(task).await?.ok_or(AppError::NotFound("Task"))?;
    info!(user_id = %owner, task_id = %task.id, "task updated");
    Ok(task)
}

pub async fn delete(repo: &dyn TaskRepo, owner: Uuid, task_id: Uuid) -> AppResult<()> {
    if !repo.delete_owned(owner, task_id).await? {
        return Err(AppError::NotFound("Task"));
    }
    info!(user_id = %owner, task_id = %task_id, "task deleted");
    Ok(())
}

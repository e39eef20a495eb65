use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{AppJson, AppResult, Message, OptionalJson},
    state::AppState,
};

use super::dto::{CreateTaskRequest, UpdateTaskRequest};
use super::repo_types::Task;
use super::services;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
}

#[instrument(skip(state, caller))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = services::list(state.tasks.as_ref(), caller.id).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state, caller, body))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(body): AppJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = services::create(state.tasks.as_ref(), caller.id, body).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, caller, body))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<UpdateTaskRequest>,
) -> AppResult<Json<Task>> {
    let task_id = services::parse_task_id(&id)?;
    let task = services::update(state.tasks.as_ref(), caller.id, task_id, body).await?;
    Ok(Json(task))
}

#[instrument(skip(state, caller))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    let task_id = services::parse_task_id(&id)?;
    services::delete(state.tasks.as_ref(), caller.id, task_id).await?;
    Ok(Json(Message::new("Task deleted successfully")))
}

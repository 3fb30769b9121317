use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::RecordKind;
use crate::db::models::{Tag, Task};
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::{record_service, tag_service, task_service};
use crate::web::models::{AuthenticatedUser, ListQuery};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    content: String,
    deadline: NaiveDate,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    content: String,
    deadline: NaiveDate,
    done: bool,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct TaskWithTags {
    #[serde(flatten)]
    pub task: Task,
    pub tags: Vec<Tag>,
}

async fn with_tags(app_state: &AppState, task: Task) -> Result<TaskWithTags, AppError> {
    let mut conn = app_state.pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, RecordKind::Task, task.id).await?;
    Ok(TaskWithTags { task, tags })
}

async fn list_tasks_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Task>>, AppError> {
    let per_page = per_page_or(query.per_page, task_service::PER_PAGE);
    let page = record_service::list_records::<Task>(
        &app_state.pool,
        user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    Ok(Json(page))
}

async fn get_task_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskWithTags>, AppError> {
    let (task, tags) =
        record_service::fetch_record_with_tags::<Task>(&app_state.pool, user.id, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;
    Ok(Json(TaskWithTags { task, tags }))
}

async fn create_task_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskWithTags>), AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidInput("Content must not be empty.".to_string()));
    }
    let task = task_service::create_task(
        &app_state.pool,
        user.id,
        &payload.content,
        payload.deadline,
        &payload.tags,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(with_tags(&app_state, task).await?)))
}

async fn update_task_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskWithTags>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidInput("Content must not be empty.".to_string()));
    }
    let task = task_service::update_task(
        &app_state.pool,
        user.id,
        task_id,
        &payload.content,
        payload.deadline,
        payload.done,
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;
    Ok(Json(with_tags(&app_state, task).await?))
}

async fn delete_task_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted =
        record_service::delete_record(&app_state.pool, RecordKind::Task, user.id, task_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Task {task_id} not found")))
    }
}

pub fn create_tasks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/{task_id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
}

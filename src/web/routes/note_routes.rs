use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::RecordKind;
use crate::db::models::{Note, Tag};
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::{note_service, record_service, tag_service};
use crate::web::models::{AuthenticatedUser, ListQuery};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct SaveNoteRequest {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct NoteWithTags {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<Tag>,
}

async fn with_tags(app_state: &AppState, note: Note) -> Result<NoteWithTags, AppError> {
    let mut conn = app_state.pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, RecordKind::Note, note.id).await?;
    Ok(NoteWithTags { note, tags })
}

async fn list_notes_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Note>>, AppError> {
    let per_page = per_page_or(query.per_page, note_service::PER_PAGE);
    let page = record_service::list_records::<Note>(
        &app_state.pool,
        user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    Ok(Json(page))
}

async fn get_note_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
) -> Result<Json<NoteWithTags>, AppError> {
    let (note, tags) =
        record_service::fetch_record_with_tags::<Note>(&app_state.pool, user.id, note_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {note_id} not found")))?;
    Ok(Json(NoteWithTags { note, tags }))
}

async fn create_note_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SaveNoteRequest>,
) -> Result<(StatusCode, Json<NoteWithTags>), AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidInput("Content must not be empty.".to_string()));
    }
    let note =
        note_service::create_note(&app_state.pool, user.id, &payload.content, &payload.tags)
            .await?;
    Ok((StatusCode::CREATED, Json(with_tags(&app_state, note).await?)))
}

async fn update_note_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
    Json(payload): Json<SaveNoteRequest>,
) -> Result<Json<NoteWithTags>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidInput("Content must not be empty.".to_string()));
    }
    let note = note_service::update_note(
        &app_state.pool,
        user.id,
        note_id,
        &payload.content,
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Note {note_id} not found")))?;
    Ok(Json(with_tags(&app_state, note).await?))
}

async fn delete_note_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted =
        record_service::delete_record(&app_state.pool, RecordKind::Note, user.id, note_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Note {note_id} not found")))
    }
}

pub fn create_notes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notes_handler).post(create_note_handler))
        .route(
            "/{note_id}",
            get(get_note_handler)
                .put(update_note_handler)
                .delete(delete_note_handler),
        )
}

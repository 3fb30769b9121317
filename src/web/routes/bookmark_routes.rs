use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::RecordKind;
use crate::db::models::{Bookmark, Tag};
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::{bookmark_service, record_service, tag_service};
use crate::web::models::{AuthenticatedUser, ListQuery};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct SaveBookmarkRequest {
    label: String,
    url: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct BookmarkWithTags {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub tags: Vec<Tag>,
}

fn validate(payload: &SaveBookmarkRequest) -> Result<(), AppError> {
    if payload.label.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Label and URL must not be empty.".to_string(),
        ));
    }
    Ok(())
}

async fn with_tags(
    app_state: &AppState,
    bookmark: Bookmark,
) -> Result<BookmarkWithTags, AppError> {
    let mut conn = app_state.pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, RecordKind::Bookmark, bookmark.id).await?;
    Ok(BookmarkWithTags { bookmark, tags })
}

async fn list_bookmarks_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Bookmark>>, AppError> {
    let per_page = per_page_or(query.per_page, bookmark_service::PER_PAGE);
    let page = record_service::list_records::<Bookmark>(
        &app_state.pool,
        user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    Ok(Json(page))
}

async fn get_bookmark_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(bookmark_id): Path<i64>,
) -> Result<Json<BookmarkWithTags>, AppError> {
    let (bookmark, tags) = record_service::fetch_record_with_tags::<Bookmark>(
        &app_state.pool,
        user.id,
        bookmark_id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Bookmark {bookmark_id} not found")))?;
    Ok(Json(BookmarkWithTags { bookmark, tags }))
}

async fn create_bookmark_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SaveBookmarkRequest>,
) -> Result<(StatusCode, Json<BookmarkWithTags>), AppError> {
    validate(&payload)?;
    let bookmark = bookmark_service::create_bookmark(
        &app_state.pool,
        user.id,
        payload.label.trim(),
        payload.url.trim(),
        &payload.tags,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(with_tags(&app_state, bookmark).await?)))
}

async fn update_bookmark_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(bookmark_id): Path<i64>,
    Json(payload): Json<SaveBookmarkRequest>,
) -> Result<Json<BookmarkWithTags>, AppError> {
    validate(&payload)?;
    let bookmark = bookmark_service::update_bookmark(
        &app_state.pool,
        user.id,
        bookmark_id,
        payload.label.trim(),
        payload.url.trim(),
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Bookmark {bookmark_id} not found")))?;
    Ok(Json(with_tags(&app_state, bookmark).await?))
}

async fn delete_bookmark_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(bookmark_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = record_service::delete_record(
        &app_state.pool,
        RecordKind::Bookmark,
        user.id,
        bookmark_id,
    )
    .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Bookmark {bookmark_id} not found")))
    }
}

pub fn create_bookmarks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookmarks_handler).post(create_bookmark_handler))
        .route(
            "/{bookmark_id}",
            get(get_bookmark_handler)
                .put(update_bookmark_handler)
                .delete(delete_bookmark_handler),
        )
}

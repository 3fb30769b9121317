use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::RecordKind;
use crate::db::models::{Event, Tag};
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::{event_service, record_service, tag_service};
use crate::web::models::{AuthenticatedUser, ListQuery};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct SaveEventRequest {
    title: String,
    date: NaiveDate,
    time: NaiveTime,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct EventWithTags {
    #[serde(flatten)]
    pub event: Event,
    pub tags: Vec<Tag>,
}

fn validate(payload: &SaveEventRequest) -> Result<(), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty.".to_string()));
    }
    Ok(())
}

async fn with_tags(app_state: &AppState, event: Event) -> Result<EventWithTags, AppError> {
    let mut conn = app_state.pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, RecordKind::Event, event.id).await?;
    Ok(EventWithTags { event, tags })
}

async fn list_events_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Event>>, AppError> {
    let per_page = per_page_or(query.per_page, event_service::PER_PAGE);
    let page = record_service::list_records::<Event>(
        &app_state.pool,
        user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    Ok(Json(page))
}

async fn get_event_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventWithTags>, AppError> {
    let (event, tags) =
        record_service::fetch_record_with_tags::<Event>(&app_state.pool, user.id, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
    Ok(Json(EventWithTags { event, tags }))
}

async fn create_event_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SaveEventRequest>,
) -> Result<(StatusCode, Json<EventWithTags>), AppError> {
    validate(&payload)?;
    let event = event_service::create_event(
        &app_state.pool,
        user.id,
        payload.title.trim(),
        payload.date,
        payload.time,
        &payload.tags,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(with_tags(&app_state, event).await?)))
}

async fn update_event_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    Json(payload): Json<SaveEventRequest>,
) -> Result<Json<EventWithTags>, AppError> {
    validate(&payload)?;
    let event = event_service::update_event(
        &app_state.pool,
        user.id,
        event_id,
        payload.title.trim(),
        payload.date,
        payload.time,
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
    Ok(Json(with_tags(&app_state, event).await?))
}

async fn delete_event_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted =
        record_service::delete_record(&app_state.pool, RecordKind::Event, user.id, event_id)
            .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Event {event_id} not found")))
    }
}

pub fn create_events_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_events_handler).post(create_event_handler))
        .route(
            "/{event_id}",
            get(get_event_handler)
                .put(update_event_handler)
                .delete(delete_event_handler),
        )
}

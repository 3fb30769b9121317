use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::RecordKind;
use crate::db::models::{Contact, Tag};
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::{contact_service, record_service, tag_service};
use crate::web::models::{AuthenticatedUser, ListQuery};
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct SaveContactRequest {
    name: String,
    surname: String,
    phone_number: Option<String>,
    email: Option<String>,
    web_page: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct ContactWithTags {
    #[serde(flatten)]
    pub contact: Contact,
    pub tags: Vec<Tag>,
}

fn validate(payload: &SaveContactRequest) -> Result<(), AppError> {
    if payload.name.trim().is_empty() || payload.surname.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Name and surname must not be empty.".to_string(),
        ));
    }
    Ok(())
}

async fn with_tags(app_state: &AppState, contact: Contact) -> Result<ContactWithTags, AppError> {
    let mut conn = app_state.pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, RecordKind::Contact, contact.id).await?;
    Ok(ContactWithTags { contact, tags })
}

async fn list_contacts_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Contact>>, AppError> {
    let per_page = per_page_or(query.per_page, contact_service::PER_PAGE);
    let page = record_service::list_records::<Contact>(
        &app_state.pool,
        user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    Ok(Json(page))
}

async fn get_contact_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
) -> Result<Json<ContactWithTags>, AppError> {
    let (contact, tags) = record_service::fetch_record_with_tags::<Contact>(
        &app_state.pool,
        user.id,
        contact_id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;
    Ok(Json(ContactWithTags { contact, tags }))
}

async fn create_contact_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SaveContactRequest>,
) -> Result<(StatusCode, Json<ContactWithTags>), AppError> {
    validate(&payload)?;
    let contact = contact_service::create_contact(
        &app_state.pool,
        user.id,
        payload.name.trim(),
        payload.surname.trim(),
        payload.phone_number.as_deref(),
        payload.email.as_deref(),
        payload.web_page.as_deref(),
        &payload.tags,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(with_tags(&app_state, contact).await?)))
}

async fn update_contact_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
    Json(payload): Json<SaveContactRequest>,
) -> Result<Json<ContactWithTags>, AppError> {
    validate(&payload)?;
    let contact = contact_service::update_contact(
        &app_state.pool,
        user.id,
        contact_id,
        payload.name.trim(),
        payload.surname.trim(),
        payload.phone_number.as_deref(),
        payload.email.as_deref(),
        payload.web_page.as_deref(),
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;
    Ok(Json(with_tags(&app_state, contact).await?))
}

async fn delete_contact_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(contact_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = record_service::delete_record(
        &app_state.pool,
        RecordKind::Contact,
        user.id,
        contact_id,
    )
    .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Contact {contact_id} not found")))
    }
}

pub fn create_contacts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_contacts_handler).post(create_contact_handler))
        .route(
            "/{contact_id}",
            get(get_contact_handler)
                .put(update_contact_handler)
                .delete(delete_contact_handler),
        )
}

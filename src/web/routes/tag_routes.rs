use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::models::Tag;
use crate::db::services::tag_service::{self, TagUsage, TagWithCount};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

#[derive(Serialize)]
pub struct TagDetail {
    #[serde(flatten)]
    pub tag: Tag,
    pub records: Vec<TagUsage>,
}

async fn list_tags_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagWithCount>>, AppError> {
    let tags = tag_service::list_tags_with_count(&app_state.pool).await?;
    Ok(Json(tags))
}

/// A tag plus the caller's records carrying it. Tags are shared vocabulary,
/// so the tag itself is global while the usage list is scoped to the caller.
async fn get_tag_handler(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i64>,
) -> Result<Json<TagDetail>, AppError> {
    let tag = tag_service::get_tag(&app_state.pool, tag_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {tag_id} not found")))?;
    let records = tag_service::records_for_tag(&app_state.pool, user.id, tag_id).await?;
    Ok(Json(TagDetail { tag, records }))
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler))
        .route("/{tag_id}", get(get_tag_handler))
}

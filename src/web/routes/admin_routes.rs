use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use bcrypt::{hash, DEFAULT_COST};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::enums::UserRole;
use crate::db::models::User;
use crate::db::paginator::{per_page_or, Page};
use crate::db::services::user_service;
use crate::web::models::ListQuery;
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    role: UserRole,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    password: String,
}

async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<User>>, AppError> {
    let per_page = per_page_or(query.per_page, user_service::PER_PAGE);
    let page =
        user_service::list_users(&app_state.pool, query.page.unwrap_or(1), per_page).await?;
    Ok(Json(page))
}

async fn change_role_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let changed = user_service::set_user_role(&app_state.pool, user_id, payload.role).await?;
    if !changed {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    Ok(Json(serde_json::json!({ "message": "Role updated successfully" })))
}

async fn change_password_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password needs at least 8 characters.".to_string(),
        ));
    }
    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHash(format!("Password hashing failed: {e}")))?;
    let changed =
        user_service::set_user_password(&app_state.pool, user_id, &password_hash).await?;
    if !changed {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    Ok(Json(serde_json::json!({ "message": "Password updated successfully" })))
}

async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = user_service::delete_user(&app_state.pool, user_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("User {user_id} not found")))
    }
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users_handler))
        .route("/users/{user_id}/role", put(change_role_handler))
        .route("/users/{user_id}/password", put(change_password_handler))
        .route("/users/{user_id}", delete(delete_user_handler))
}

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::DbPool;
use crate::server::config::AppConfig;
use crate::services::auth_service;
use crate::web::middleware::auth;
use crate::web::models::{LoginRequest, RegisterRequest};
use crate::web::routes::*;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<models::UserResponse>, AppError> {
    let user = auth_service::register_user(&app_state.pool, payload).await?;
    Ok(Json(user))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.pool, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    let mut response = Json(login_response).into_response();
    response.headers_mut().insert(
        axum::http::header::SET_COOKIE,
        auth_cookie
            .to_string()
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid cookie header: {e}")))?,
    );

    Ok(response)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = match app_state
        .config
        .frontend_url
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any),
    };

    let auth_layer = axum_middleware::from_fn_with_state(app_state.clone(), auth::auth);

    Router::new()
        .route("/health", get(health_check_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route(
            "/api/auth/me",
            get(auth_service::me).route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/bookmarks",
            bookmark_routes::create_bookmarks_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/contacts",
            contact_routes::create_contacts_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/events",
            event_routes::create_events_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/notes",
            note_routes::create_notes_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/tasks",
            task_routes::create_tasks_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/tags",
            tag_routes::create_tags_router().route_layer(auth_layer.clone()),
        )
        .nest(
            "/api/admin",
            admin_routes::create_admin_router()
                // Admin checks run after auth has attached the user.
                .route_layer(axum_middleware::from_fn(auth::require_admin))
                .route_layer(auth_layer.clone()),
        )
        .layer(cors)
        .with_state(app_state)
}

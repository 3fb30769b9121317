use axum::Extension;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::SqlitePool;

use crate::db::enums::UserRole;
use crate::db::models::User;
use crate::db::services::user_service;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedUser, Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};

pub async fn register_user(
    pool: &SqlitePool,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    if req.username.trim().is_empty() || req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Username must not be empty and the password needs at least 8 characters.".to_string(),
        ));
    }

    let existing = user_service::get_user_by_username(pool, &req.username).await?;
    if existing.is_some() {
        return Err(AppError::UserAlreadyExists(
            "Username is already taken.".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHash(format!("Password hashing failed: {e}")))?;

    // The first account to register administers the instance.
    let role = if user_service::count_users(pool).await? == 0 {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let user = user_service::create_user(pool, req.username.trim(), &password_hash, role).await?;
    Ok(UserResponse {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub async fn login_user(
    pool: &SqlitePool,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password must not be empty.".to_string(),
        ));
    }

    let user = user_service::get_user_by_username(pool, &req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(user: &User, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    // Tokens are valid for 24 hours.
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        role: user.role,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreation(format!("Token creation failed: {e}")))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
    })
}

pub async fn me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<axum::Json<UserResponse>, AppError> {
    Ok(axum::Json(UserResponse {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn register(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn first_registration_becomes_admin() {
        let pool = test_pool().await;

        let first = register_user(&pool, register("root", "supersecret")).await.unwrap();
        assert_eq!(first.role, UserRole::Admin);

        let second = register_user(&pool, register("guest", "supersecret")).await.unwrap();
        assert_eq!(second.role, UserRole::User);
    }

    #[tokio::test]
    async fn weak_passwords_and_taken_names_are_rejected() {
        let pool = test_pool().await;

        let err = register_user(&pool, register("short", "abc")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        register_user(&pool, register("taken", "supersecret")).await.unwrap();
        let err = register_user(&pool, register("taken", "supersecret")).await.unwrap_err();
        assert!(matches!(err, AppError::UserAlreadyExists(_)));
    }

    #[tokio::test]
    async fn login_verifies_the_stored_hash() {
        let pool = test_pool().await;
        register_user(&pool, register("ada", "correct horse")).await.unwrap();

        let ok = login_user(
            &pool,
            LoginRequest {
                username: "ada".to_string(),
                password: "correct horse".to_string(),
            },
            "test-secret",
        )
        .await
        .unwrap();
        assert_eq!(ok.username, "ada");

        let err = login_user(
            &pool,
            LoginRequest {
                username: "ada".to_string(),
                password: "wrong".to_string(),
            },
            "test-secret",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn jwt_round_trips_id_and_role() {
        let pool = test_pool().await;
        register_user(&pool, register("root", "supersecret")).await.unwrap();
        let user = user_service::get_user_by_username(&pool, "root").await.unwrap().unwrap();

        let login = create_jwt_for_user(&user, "test-secret").unwrap();
        let decoded = decode::<Claims>(
            &login.token,
            &DecodingKey::from_secret("test-secret".as_ref()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.user_id, user.id);
        assert_eq!(decoded.claims.role, UserRole::Admin);
        assert_eq!(decoded.claims.sub, "root");
    }
}

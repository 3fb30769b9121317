use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::enums::{RecordKind, UserRole};
use crate::db::models::User;
use crate::db::paginator::{slice_bounds, Page};
use crate::web::error::AppError;

/// Listing page size for the admin user list.
pub const PER_PAGE: u32 = 20;

const COLUMNS: &str = "id, username, password_hash, role, created_at, updated_at";

pub async fn get_user_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, AppError> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User, AppError> {
    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn list_users(
    pool: &SqlitePool,
    page: u32,
    per_page: u32,
) -> Result<Page<User>, AppError> {
    let total_items = count_users(pool).await?;
    let (current_page, total_pages, offset) = slice_bounds(total_items, page, per_page);

    let items = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY id ASC LIMIT ? OFFSET ?"
    ))
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(Page {
        items,
        current_page,
        total_pages,
        per_page,
        total_items,
    })
}

pub async fn set_user_role(
    pool: &SqlitePool,
    user_id: i64,
    role: UserRole,
) -> Result<bool, AppError> {
    let now = Utc::now();
    let rows_affected = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

pub async fn set_user_password(
    pool: &SqlitePool,
    user_id: i64,
    password_hash: &str,
) -> Result<bool, AppError> {
    let now = Utc::now();
    let rows_affected =
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(user_id)
            .execute(pool)
            .await?
            .rows_affected();
    Ok(rows_affected > 0)
}

/// Removes a user together with their records and tag links. Tags stay,
/// shared vocabulary is never garbage-collected here.
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    for kind in RecordKind::ALL {
        let links_sql = format!(
            "DELETE FROM record_tags WHERE kind = ? AND record_id IN
             (SELECT id FROM {} WHERE user_id = ?)",
            kind.table()
        );
        sqlx::query(&links_sql)
            .bind(kind)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let records_sql = format!("DELETE FROM {} WHERE user_id = ?", kind.table());
        sqlx::query(&records_sql)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if rows_affected == 0 {
        return Ok(false);
    }

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::services::{note_service, tag_service};
    use crate::db::test_support::test_pool;

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let pool = test_pool().await;
        create_user(&pool, "sam", "hash", UserRole::User).await.unwrap();
        let err = create_user(&pool, "sam", "hash2", UserRole::User).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn role_changes_stick() {
        let pool = test_pool().await;
        let user = create_user(&pool, "pat", "hash", UserRole::User).await.unwrap();

        assert!(set_user_role(&pool, user.id, UserRole::Admin).await.unwrap());
        let reloaded = get_user_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, UserRole::Admin);

        assert!(!set_user_role(&pool, 9999, UserRole::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_user_takes_their_records_and_links() {
        let pool = test_pool().await;
        let user = create_user(&pool, "leaver", "hash", UserRole::User).await.unwrap();
        let note = note_service::create_note(&pool, user.id, "bye", &["farewell".to_string()])
            .await
            .unwrap();

        assert!(delete_user(&pool, user.id).await.unwrap());
        assert!(get_user_by_id(&pool, user.id).await.unwrap().is_none());

        let mut conn = pool.acquire().await.unwrap();
        let links = tag_service::resolve_tags(&mut conn, RecordKind::Note, note.id)
            .await
            .unwrap();
        assert!(links.is_empty());
        // The tag itself survives as shared vocabulary.
        assert!(tag_service::find_tag_by_name(&mut conn, "farewell").await.unwrap().is_some());
    }
}

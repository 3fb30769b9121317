use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::enums::RecordKind;
use crate::db::models::Bookmark;
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// Listing page size for bookmarks.
pub const PER_PAGE: u32 = 10;

const RETURNING: &str = "RETURNING id, user_id, label, url, created_at, updated_at";

/// Inserts a bookmark and links its tags in one transaction.
pub async fn create_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    label: &str,
    url: &str,
    tags: &[String],
) -> Result<Bookmark, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let bookmark: Bookmark = sqlx::query_as(&format!(
        "INSERT INTO bookmarks (user_id, label, url, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?) {RETURNING}"
    ))
    .bind(user_id)
    .bind(label)
    .bind(url)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tag_service::attach_tags(&mut tx, RecordKind::Bookmark, bookmark.id, tags).await?;
    tx.commit().await?;
    Ok(bookmark)
}

/// Updates a bookmark's fields and replaces its link set wholesale.
/// Returns None when the id does not belong to the user.
pub async fn update_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    bookmark_id: i64,
    label: &str,
    url: &str,
    tags: &[String],
) -> Result<Option<Bookmark>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let updated: Option<Bookmark> = sqlx::query_as(&format!(
        "UPDATE bookmarks SET label = ?, url = ?, updated_at = ?
         WHERE id = ? AND user_id = ? {RETURNING}"
    ))
    .bind(label)
    .bind(url)
    .bind(now)
    .bind(bookmark_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(bookmark) = updated else {
        return Ok(None);
    };
    tag_service::detach_tags(&mut tx, RecordKind::Bookmark, bookmark.id).await?;
    tag_service::attach_tags(&mut tx, RecordKind::Bookmark, bookmark.id, tags).await?;
    tx.commit().await?;
    Ok(Some(bookmark))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn editing_replaces_the_tag_set() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "editor").await;

        let bookmark = create_bookmark(&pool, user_id, "docs", "https://docs.rs", &["a".to_string()])
            .await
            .unwrap();

        let updated = update_bookmark(
            &pool,
            user_id,
            bookmark.id,
            "docs",
            "https://docs.rs",
            &["b".to_string()],
        )
        .await
        .unwrap()
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let tags = tag_service::resolve_tags(&mut conn, RecordKind::Bookmark, updated.id)
            .await
            .unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[tokio::test]
    async fn updating_someone_elses_bookmark_is_a_miss() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let stranger = seed_user(&pool, "stranger").await;

        let bookmark = create_bookmark(&pool, owner, "mine", "https://a", &[]).await.unwrap();
        let result = update_bookmark(&pool, stranger, bookmark.id, "stolen", "https://b", &[])
            .await
            .unwrap();
        assert!(result.is_none());
    }
}

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::enums::RecordKind;
use crate::db::models::Note;
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// Listing page size for notes.
pub const PER_PAGE: u32 = 10;

const RETURNING: &str = "RETURNING id, user_id, content, created_at, updated_at";

pub async fn create_note(
    pool: &SqlitePool,
    user_id: i64,
    content: &str,
    tags: &[String],
) -> Result<Note, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let note: Note = sqlx::query_as(&format!(
        "INSERT INTO notes (user_id, content, created_at, updated_at)
         VALUES (?, ?, ?, ?) {RETURNING}"
    ))
    .bind(user_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tag_service::attach_tags(&mut tx, RecordKind::Note, note.id, tags).await?;
    tx.commit().await?;
    Ok(note)
}

pub async fn update_note(
    pool: &SqlitePool,
    user_id: i64,
    note_id: i64,
    content: &str,
    tags: &[String],
) -> Result<Option<Note>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let updated: Option<Note> = sqlx::query_as(&format!(
        "UPDATE notes SET content = ?, updated_at = ?
         WHERE id = ? AND user_id = ? {RETURNING}"
    ))
    .bind(content)
    .bind(now)
    .bind(note_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(note) = updated else {
        return Ok(None);
    };
    tag_service::detach_tags(&mut tx, RecordKind::Note, note.id).await?;
    tag_service::attach_tags(&mut tx, RecordKind::Note, note.id, tags).await?;
    tx.commit().await?;
    Ok(Some(note))
}

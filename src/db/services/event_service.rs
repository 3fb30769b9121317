use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;

use crate::db::enums::RecordKind;
use crate::db::models::Event;
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// Listing page size for events.
pub const PER_PAGE: u32 = 20;

const RETURNING: &str = "RETURNING id, user_id, title, date, time, created_at, updated_at";

pub async fn create_event(
    pool: &SqlitePool,
    user_id: i64,
    title: &str,
    date: NaiveDate,
    time: NaiveTime,
    tags: &[String],
) -> Result<Event, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let event: Event = sqlx::query_as(&format!(
        "INSERT INTO events (user_id, title, date, time, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?) {RETURNING}"
    ))
    .bind(user_id)
    .bind(title)
    .bind(date)
    .bind(time)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tag_service::attach_tags(&mut tx, RecordKind::Event, event.id, tags).await?;
    tx.commit().await?;
    Ok(event)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    title: &str,
    date: NaiveDate,
    time: NaiveTime,
    tags: &[String],
) -> Result<Option<Event>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let updated: Option<Event> = sqlx::query_as(&format!(
        "UPDATE events SET title = ?, date = ?, time = ?, updated_at = ?
         WHERE id = ? AND user_id = ? {RETURNING}"
    ))
    .bind(title)
    .bind(date)
    .bind(time)
    .bind(now)
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(event) = updated else {
        return Ok(None);
    };
    tag_service::detach_tags(&mut tx, RecordKind::Event, event.id).await?;
    tag_service::attach_tags(&mut tx, RecordKind::Event, event.id, tags).await?;
    tx.commit().await?;
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn date_and_time_columns_roundtrip() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "planner").await;

        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let event = create_event(&pool, user_id, "standup", date, time, &[]).await.unwrap();
        assert_eq!(event.date, date);
        assert_eq!(event.time, time);

        let moved = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let updated = update_event(&pool, user_id, event.id, "standup", date, moved, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.time, moved);
    }
}

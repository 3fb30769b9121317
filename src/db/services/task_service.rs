use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::db::enums::RecordKind;
use crate::db::models::Task;
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// Listing page size for tasks.
pub const PER_PAGE: u32 = 10;

const RETURNING: &str = "RETURNING id, user_id, content, deadline, done, created_at, updated_at";

pub async fn create_task(
    pool: &SqlitePool,
    user_id: i64,
    content: &str,
    deadline: NaiveDate,
    tags: &[String],
) -> Result<Task, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let task: Task = sqlx::query_as(&format!(
        "INSERT INTO tasks (user_id, content, deadline, done, created_at, updated_at)
         VALUES (?, ?, ?, 0, ?, ?) {RETURNING}"
    ))
    .bind(user_id)
    .bind(content)
    .bind(deadline)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tag_service::attach_tags(&mut tx, RecordKind::Task, task.id, tags).await?;
    tx.commit().await?;
    Ok(task)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_task(
    pool: &SqlitePool,
    user_id: i64,
    task_id: i64,
    content: &str,
    deadline: NaiveDate,
    done: bool,
    tags: &[String],
) -> Result<Option<Task>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let updated: Option<Task> = sqlx::query_as(&format!(
        "UPDATE tasks SET content = ?, deadline = ?, done = ?, updated_at = ?
         WHERE id = ? AND user_id = ? {RETURNING}"
    ))
    .bind(content)
    .bind(deadline)
    .bind(done)
    .bind(now)
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(task) = updated else {
        return Ok(None);
    };
    tag_service::detach_tags(&mut tx, RecordKind::Task, task.id).await?;
    tag_service::attach_tags(&mut tx, RecordKind::Task, task.id, tags).await?;
    tx.commit().await?;
    Ok(Some(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn new_tasks_start_open_and_can_be_completed() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "doer").await;
        let deadline = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let task = create_task(&pool, user_id, "write report", deadline, &[]).await.unwrap();
        assert!(!task.done);

        let finished = update_task(&pool, user_id, task.id, "write report", deadline, true, &[])
            .await
            .unwrap()
            .unwrap();
        assert!(finished.done);
        assert_eq!(finished.deadline, deadline);
    }
}

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::db::enums::RecordKind;
use crate::db::models::{Bookmark, Contact, Event, Note, Tag, Task};
use crate::db::paginator::{slice_bounds, Page};
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// A user-owned row that can carry tags. Implementations supply their kind
/// and select list; the generic operations below cover the read side and
/// deletion for all of them, so the per-kind services only write.
pub trait TaggableRecord: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const KIND: RecordKind;
    const COLUMNS: &'static str;

    fn id(&self) -> i64;
}

impl TaggableRecord for Bookmark {
    const KIND: RecordKind = RecordKind::Bookmark;
    const COLUMNS: &'static str = "id, user_id, label, url, created_at, updated_at";

    fn id(&self) -> i64 {
        self.id
    }
}

impl TaggableRecord for Contact {
    const KIND: RecordKind = RecordKind::Contact;
    const COLUMNS: &'static str =
        "id, user_id, name, surname, phone_number, email, web_page, created_at, updated_at";

    fn id(&self) -> i64 {
        self.id
    }
}

impl TaggableRecord for Event {
    const KIND: RecordKind = RecordKind::Event;
    const COLUMNS: &'static str = "id, user_id, title, date, time, created_at, updated_at";

    fn id(&self) -> i64 {
        self.id
    }
}

impl TaggableRecord for Note {
    const KIND: RecordKind = RecordKind::Note;
    const COLUMNS: &'static str = "id, user_id, content, created_at, updated_at";

    fn id(&self) -> i64 {
        self.id
    }
}

impl TaggableRecord for Task {
    const KIND: RecordKind = RecordKind::Task;
    const COLUMNS: &'static str =
        "id, user_id, content, deadline, done, created_at, updated_at";

    fn id(&self) -> i64 {
        self.id
    }
}

pub async fn fetch_record<T: TaggableRecord>(
    pool: &SqlitePool,
    user_id: i64,
    record_id: i64,
) -> Result<Option<T>, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ? AND user_id = ?",
        T::COLUMNS,
        T::KIND.table()
    );
    let record = sqlx::query_as::<_, T>(&sql)
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

pub async fn fetch_record_with_tags<T: TaggableRecord>(
    pool: &SqlitePool,
    user_id: i64,
    record_id: i64,
) -> Result<Option<(T, Vec<Tag>)>, AppError> {
    let Some(record) = fetch_record::<T>(pool, user_id, record_id).await? else {
        return Ok(None);
    };
    let mut conn = pool.acquire().await?;
    let tags = tag_service::resolve_tags(&mut conn, T::KIND, record.id()).await?;
    Ok(Some((record, tags)))
}

/// Paginated listing ordered by insertion id, so pages stay stable while
/// rows are appended concurrently.
pub async fn list_records<T: TaggableRecord>(
    pool: &SqlitePool,
    user_id: i64,
    page: u32,
    per_page: u32,
) -> Result<Page<T>, AppError> {
    let count_sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", T::KIND.table());
    let total_items: i64 = sqlx::query_scalar(&count_sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let (current_page, total_pages, offset) = slice_bounds(total_items, page, per_page);

    let items_sql = format!(
        "SELECT {} FROM {} WHERE user_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
        T::COLUMNS,
        T::KIND.table()
    );
    let items = sqlx::query_as::<_, T>(&items_sql)
        .bind(user_id)
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

/// Deletes a record and its tag links in one transaction. Tags referenced
/// by other records are untouched. Returns false when the id does not
/// belong to the user.
pub async fn delete_record(
    pool: &SqlitePool,
    kind: RecordKind,
    user_id: i64,
    record_id: i64,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!("DELETE FROM {} WHERE id = ? AND user_id = ?", kind.table());
    let rows_affected = sqlx::query(&sql)
        .bind(record_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if rows_affected == 0 {
        return Ok(false);
    }

    tag_service::detach_tags(&mut tx, kind, record_id).await?;
    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::services::{bookmark_service, note_service};
    use crate::db::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn insert_then_fetch_returns_the_inserted_fields() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "ada").await;

        let created = bookmark_service::create_bookmark(
            &pool,
            user_id,
            "Rust book",
            "https://doc.rust-lang.org/book/",
            &["rust".to_string()],
        )
        .await
        .unwrap();

        let fetched: Bookmark = fetch_record(&pool, user_id, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.label, "Rust book");
        assert_eq!(fetched.url, "https://doc.rust-lang.org/book/");
    }

    #[tokio::test]
    async fn records_are_invisible_to_other_users() {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner").await;
        let stranger = seed_user(&pool, "stranger").await;

        let note = note_service::create_note(&pool, owner, "mine", &[]).await.unwrap();

        assert!(fetch_record::<Note>(&pool, stranger, note.id).await.unwrap().is_none());
        assert!(!delete_record(&pool, RecordKind::Note, stranger, note.id).await.unwrap());
        assert!(fetch_record::<Note>(&pool, owner, note.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn listing_slices_and_clamps() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "lister").await;

        for i in 1..=25 {
            note_service::create_note(&pool, user_id, &format!("note {i}"), &[])
                .await
                .unwrap();
        }

        let page = list_records::<Note>(&pool, user_id, 3, 10).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 25);
        assert_eq!(page.items.len(), 5);
        let contents: Vec<&str> = page.items.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["note 21", "note 22", "note 23", "note 24", "note 25"]);

        // Past-the-end pages clamp to the last page rather than failing.
        let clamped = list_records::<Note>(&pool, user_id, 10, 10).await.unwrap();
        assert_eq!(clamped.current_page, 3);
        assert_eq!(clamped.items.len(), 5);

        let empty = list_records::<Note>(&pool, seed_user(&pool, "nobody").await, 1, 10)
            .await
            .unwrap();
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_links_but_not_shared_tags() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "collector").await;
        let shared = vec!["keep".to_string()];

        let first = bookmark_service::create_bookmark(&pool, user_id, "one", "https://a", &shared)
            .await
            .unwrap();
        let second = bookmark_service::create_bookmark(&pool, user_id, "two", "https://b", &shared)
            .await
            .unwrap();

        assert!(delete_record(&pool, RecordKind::Bookmark, user_id, first.id).await.unwrap());
        assert!(fetch_record::<Bookmark>(&pool, user_id, first.id).await.unwrap().is_none());

        let mut conn = pool.acquire().await.unwrap();
        let gone = tag_service::resolve_tags(&mut conn, RecordKind::Bookmark, first.id)
            .await
            .unwrap();
        assert!(gone.is_empty());

        let kept = tag_service::resolve_tags(&mut conn, RecordKind::Bookmark, second.id)
            .await
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "keep");
        assert!(tag_service::find_tag_by_name(&mut conn, "keep").await.unwrap().is_some());
    }
}

use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::db::enums::RecordKind;
use crate::db::models::Tag;
use crate::web::error::AppError;

/// A tag and the number of records, of any kind, that reference it.
#[derive(FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub created_at: chrono::DateTime<Utc>,
    pub record_count: i64,
}

/// One record referencing a tag.
#[derive(FromRow, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagUsage {
    pub kind: RecordKind,
    pub record_id: i64,
}

pub async fn find_tag_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(tag)
}

/// Inserts a new tag. A name that already exists comes back as `Conflict`.
pub async fn create_tag(conn: &mut SqliteConnection, name: &str) -> Result<Tag, AppError> {
    let now = Utc::now();
    let tag = sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (name, created_at) VALUES (?, ?) RETURNING id, name, created_at",
    )
    .bind(name)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(tag)
}

/// Looks a tag up by name, creating it on first use. A concurrent insert of
/// the same name loses the unique-constraint race and re-fetches the winner,
/// so both callers end up with the same row.
pub async fn find_or_create_tag(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Tag, AppError> {
    if let Some(tag) = find_tag_by_name(&mut *conn, name).await? {
        return Ok(tag);
    }
    match create_tag(&mut *conn, name).await {
        Ok(tag) => Ok(tag),
        Err(AppError::Conflict(_)) => find_tag_by_name(&mut *conn, name)
            .await?
            .ok_or_else(|| AppError::Internal(format!("tag '{name}' vanished after insert race"))),
        Err(e) => Err(e),
    }
}

pub async fn find_tags_by_ids(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<Vec<Tag>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT id, name, created_at FROM tags WHERE id IN ({placeholders}) ORDER BY name ASC"
    );
    let mut query = sqlx::query_as::<_, Tag>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(conn).await?)
}

pub async fn get_tag(pool: &SqlitePool, tag_id: i64) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name, created_at FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_optional(pool)
        .await?;
    Ok(tag)
}

/// All tags with their usage counts.
pub async fn list_tags_with_count(pool: &SqlitePool) -> Result<Vec<TagWithCount>, AppError> {
    let tags = sqlx::query_as::<_, TagWithCount>(
        "SELECT t.id, t.name, t.created_at, COUNT(rt.tag_id) AS record_count
         FROM tags t
         LEFT JOIN record_tags rt ON t.id = rt.tag_id
         GROUP BY t.id, t.name, t.created_at
         ORDER BY t.name ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// The caller's records referencing a tag, across every kind.
pub async fn records_for_tag(
    pool: &SqlitePool,
    user_id: i64,
    tag_id: i64,
) -> Result<Vec<TagUsage>, AppError> {
    let selects = RecordKind::ALL
        .iter()
        .map(|kind| {
            format!(
                "SELECT rt.kind AS kind, rt.record_id AS record_id
                 FROM record_tags rt
                 JOIN {table} r ON r.id = rt.record_id
                 WHERE rt.kind = '{kind}' AND rt.tag_id = ? AND r.user_id = ?",
                table = kind.table(),
                kind = kind.as_str(),
            )
        })
        .collect::<Vec<_>>();
    let sql = format!("{} ORDER BY kind, record_id", selects.join(" UNION ALL "));

    let mut query = sqlx::query_as::<_, TagUsage>(&sql);
    for _ in RecordKind::ALL {
        query = query.bind(tag_id).bind(user_id);
    }
    Ok(query.fetch_all(pool).await?)
}

/// Normalization applied to submitted tag names: trimmed, lowercased, empty
/// entries dropped, duplicates collapsed to the first occurrence.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized
}

/// Links a record to every named tag, creating missing tags on the way.
/// Runs on the caller's transaction so a failed entity write takes the
/// links down with it.
pub async fn attach_tags(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    record_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    for name in normalize_tag_names(names) {
        let tag = find_or_create_tag(&mut *conn, &name).await?;
        sqlx::query(
            "INSERT INTO record_tags (kind, record_id, tag_id) VALUES (?, ?, ?)
             ON CONFLICT (kind, record_id, tag_id) DO NOTHING",
        )
        .bind(kind)
        .bind(record_id)
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Removes every link a record holds. Tags themselves stay.
pub async fn detach_tags(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    record_id: i64,
) -> Result<u64, AppError> {
    let rows_affected = sqlx::query("DELETE FROM record_tags WHERE kind = ? AND record_id = ?")
        .bind(kind)
        .bind(record_id)
        .execute(conn)
        .await?
        .rows_affected();
    Ok(rows_affected)
}

/// Expands a record's links back into full tag rows, ordered by name.
pub async fn resolve_tags(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    record_id: i64,
) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name, t.created_at
         FROM tags t
         INNER JOIN record_tags rt ON t.id = rt.tag_id
         WHERE rt.kind = ? AND rt.record_id = ?
         ORDER BY t.name ASC",
    )
    .bind(kind)
    .bind(record_id)
    .fetch_all(conn)
    .await?;
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[test]
    fn normalization_trims_lowercases_and_dedups() {
        let input = vec![
            "  Rust ".to_string(),
            "rust".to_string(),
            "".to_string(),
            "   ".to_string(),
            "Web".to_string(),
        ];
        assert_eq!(normalize_tag_names(&input), vec!["rust", "web"]);
    }

    #[tokio::test]
    async fn find_or_create_reuses_the_existing_row() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = find_or_create_tag(&mut conn, "reading").await.unwrap();
        let second = find_or_create_tag(&mut conn, "reading").await.unwrap();
        assert_eq!(first.id, second.id);

        let all = find_tags_by_ids(&mut conn, &[first.id]).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "reading");
    }

    #[tokio::test]
    async fn create_of_a_taken_name_is_a_conflict() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        create_tag(&mut conn, "unique").await.unwrap();
        let err = create_tag(&mut conn, "unique").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The losing side of the race still resolves to the one row.
        let winner = find_or_create_tag(&mut conn, "unique").await.unwrap();
        let by_name = find_tag_by_name(&mut conn, "unique").await.unwrap().unwrap();
        assert_eq!(winner.id, by_name.id);
    }

    #[tokio::test]
    async fn attach_is_set_semantics_over_the_input() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();

        let names = vec!["x".to_string(), "x".to_string(), "y".to_string()];
        attach_tags(&mut tx, RecordKind::Note, 1, &names).await.unwrap();
        let resolved = resolve_tags(&mut tx, RecordKind::Note, 1).await.unwrap();
        let resolved: Vec<&str> = resolved.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(resolved, vec!["x", "y"]);

        // Same set as attaching the deduplicated list directly.
        attach_tags(&mut tx, RecordKind::Note, 2, &["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        let other = resolve_tags(&mut tx, RecordKind::Note, 2).await.unwrap();
        let other: Vec<&str> = other.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(resolved, other);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn reattach_replaces_the_link_set() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();

        attach_tags(&mut tx, RecordKind::Bookmark, 7, &["a".to_string()]).await.unwrap();
        detach_tags(&mut tx, RecordKind::Bookmark, 7).await.unwrap();
        attach_tags(&mut tx, RecordKind::Bookmark, 7, &["b".to_string()]).await.unwrap();

        let resolved = resolve_tags(&mut tx, RecordKind::Bookmark, 7).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "b");

        // Tag "a" is orphaned, not deleted.
        assert!(find_tag_by_name(&mut tx, "a").await.unwrap().is_some());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn links_are_scoped_by_kind() {
        let pool = test_pool().await;
        let mut tx = pool.begin().await.unwrap();

        attach_tags(&mut tx, RecordKind::Note, 5, &["shared".to_string()]).await.unwrap();
        attach_tags(&mut tx, RecordKind::Task, 5, &["shared".to_string()]).await.unwrap();

        detach_tags(&mut tx, RecordKind::Note, 5).await.unwrap();
        let note_tags = resolve_tags(&mut tx, RecordKind::Note, 5).await.unwrap();
        let task_tags = resolve_tags(&mut tx, RecordKind::Task, 5).await.unwrap();
        assert!(note_tags.is_empty());
        assert_eq!(task_tags.len(), 1);
        tx.commit().await.unwrap();
    }
}

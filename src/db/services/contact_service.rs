use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::enums::RecordKind;
use crate::db::models::Contact;
use crate::db::services::tag_service;
use crate::web::error::AppError;

/// Listing page size for contacts.
pub const PER_PAGE: u32 = 20;

const RETURNING: &str =
    "RETURNING id, user_id, name, surname, phone_number, email, web_page, created_at, updated_at";

#[allow(clippy::too_many_arguments)]
pub async fn create_contact(
    pool: &SqlitePool,
    user_id: i64,
    name: &str,
    surname: &str,
    phone_number: Option<&str>,
    email: Option<&str>,
    web_page: Option<&str>,
    tags: &[String],
) -> Result<Contact, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let contact: Contact = sqlx::query_as(&format!(
        "INSERT INTO contacts (user_id, name, surname, phone_number, email, web_page, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) {RETURNING}"
    ))
    .bind(user_id)
    .bind(name)
    .bind(surname)
    .bind(phone_number)
    .bind(email)
    .bind(web_page)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tag_service::attach_tags(&mut tx, RecordKind::Contact, contact.id, tags).await?;
    tx.commit().await?;
    Ok(contact)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_contact(
    pool: &SqlitePool,
    user_id: i64,
    contact_id: i64,
    name: &str,
    surname: &str,
    phone_number: Option<&str>,
    email: Option<&str>,
    web_page: Option<&str>,
    tags: &[String],
) -> Result<Option<Contact>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let updated: Option<Contact> = sqlx::query_as(&format!(
        "UPDATE contacts SET name = ?, surname = ?, phone_number = ?, email = ?, web_page = ?, updated_at = ?
         WHERE id = ? AND user_id = ? {RETURNING}"
    ))
    .bind(name)
    .bind(surname)
    .bind(phone_number)
    .bind(email)
    .bind(web_page)
    .bind(now)
    .bind(contact_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(contact) = updated else {
        return Ok(None);
    };
    tag_service::detach_tags(&mut tx, RecordKind::Contact, contact.id).await?;
    tag_service::attach_tags(&mut tx, RecordKind::Contact, contact.id, tags).await?;
    tx.commit().await?;
    Ok(Some(contact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn optional_fields_roundtrip_as_null() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "rolodex").await;

        let contact = create_contact(&pool, user_id, "Grace", "Hopper", None, None, None, &[])
            .await
            .unwrap();
        assert!(contact.phone_number.is_none());
        assert!(contact.email.is_none());

        let updated = update_contact(
            &pool,
            user_id,
            contact.id,
            "Grace",
            "Hopper",
            Some("555-0100"),
            Some("grace@example.com"),
            None,
            &[],
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(updated.email.as_deref(), Some("grace@example.com"));
        assert!(updated.web_page.is_none());
    }
}

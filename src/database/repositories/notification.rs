use chrono::Utc;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{CreateNotificationInput, Notification, NotificationFilter},
    utils::sql,
};

const NOTIFICATION_COLUMNS: &str = r#"
    id,
    company_id,
    user_id,
    kind,
    title,
    message,
    entity_type,
    entity_id,
    is_read,
    read_at,
    created_at
"#;

pub async fn create_notification(
    tx: &mut Transaction<'_, Postgres>,
    input: &CreateNotificationInput,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&sql(&format!(
        r#"
        INSERT INTO
            notifications (
                company_id,
                user_id,
                kind,
                title,
                message,
                entity_type,
                entity_id
            )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        NOTIFICATION_COLUMNS
    )))
    .bind(input.company_id)
    .bind(input.user_id)
    .bind(input.kind)
    .bind(&input.title)
    .bind(&input.message)
    .bind(&input.entity_type)
    .bind(input.entity_id)
    .fetch_one(&mut **tx)
    .await
}

/// Notifications addressed to the user plus company-wide ones, newest first
pub async fn list_for_user(
    company_id: Uuid,
    user_id: Uuid,
    filter: &NotificationFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM notifications WHERE company_id = ",
        NOTIFICATION_COLUMNS
    ));
    query
        .push_bind(company_id)
        .push(" AND (user_id IS NULL OR user_id = ")
        .push_bind(user_id)
        .push(")");

    if filter.unread_only.unwrap_or(false) {
        query.push(" AND NOT is_read");
    }

    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<Notification>()
        .fetch_all(get_pool())
        .await
}

pub async fn unread_count(company_id: Uuid, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&sql(r#"
        SELECT
            COUNT(*)
        FROM
            notifications
        WHERE
            company_id = ?
            AND (user_id IS NULL OR user_id = ?)
            AND NOT is_read
    "#))
    .bind(company_id)
    .bind(user_id)
    .fetch_one(get_pool())
    .await
}

/// Mark one visible notification read. Returns `None` when the user cannot see it.
pub async fn mark_read(
    company_id: Uuid,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&sql(&format!(
        r#"
        UPDATE notifications
        SET
            is_read = TRUE,
            read_at = COALESCE(read_at, ?)
        WHERE
            id = ?
            AND company_id = ?
            AND (user_id IS NULL OR user_id = ?)
        RETURNING {}
        "#,
        NOTIFICATION_COLUMNS
    )))
    .bind(Utc::now())
    .bind(notification_id)
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(get_pool())
    .await
}

pub async fn mark_all_read(company_id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        UPDATE notifications
        SET
            is_read = TRUE,
            read_at = ?
        WHERE
            company_id = ?
            AND (user_id IS NULL OR user_id = ?)
            AND NOT is_read
    "#))
    .bind(Utc::now())
    .bind(company_id)
    .bind(user_id)
    .execute(get_pool())
    .await?;

    Ok(result.rows_affected())
}

use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{ActivityEntry, ActivityFilter, NewActivity},
    utils::sql,
};

const ACTIVITY_COLUMNS: &str = r#"
    id,
    company_id,
    user_id,
    activity_type,
    entity_type,
    entity_id,
    action,
    description,
    metadata,
    ip_address,
    user_agent,
    created_at
"#;

/// Log a new activity inside the caller's transaction
pub async fn log_activity(
    tx: &mut Transaction<'_, Postgres>,
    input: NewActivity,
) -> Result<ActivityEntry, sqlx::Error> {
    sqlx::query_as::<_, ActivityEntry>(&sql(&format!(
        r#"
        INSERT INTO
            activity_logs (
                company_id,
                user_id,
                activity_type,
                entity_type,
                entity_id,
                action,
                description,
                metadata,
                ip_address,
                user_agent
            )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        ACTIVITY_COLUMNS
    )))
    .bind(input.company_id)
    .bind(input.user_id)
    .bind(input.activity_type)
    .bind(input.entity_type)
    .bind(input.entity_id)
    .bind(input.action)
    .bind(input.description)
    .bind(input.metadata)
    .bind(input.ip_address)
    .bind(input.user_agent)
    .fetch_one(&mut **tx)
    .await
}

/// Newest first
pub async fn list_activity(
    company_id: Uuid,
    filter: &ActivityFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ActivityEntry>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM activity_logs WHERE company_id = ",
        ACTIVITY_COLUMNS
    ));
    query.push_bind(company_id);

    if let Some(activity_type) = filter.activity_type.as_deref() {
        query.push(" AND activity_type = ").push_bind(activity_type.to_string());
    }
    if let Some(entity_type) = filter.entity_type.as_deref() {
        query.push(" AND entity_type = ").push_bind(entity_type.to_string());
    }
    if let Some(entity_id) = filter.entity_id {
        query.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = filter.action.as_deref() {
        query.push(" AND action = ").push_bind(action.to_string());
    }

    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<ActivityEntry>()
        .fetch_all(get_pool())
        .await
}

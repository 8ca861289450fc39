use chrono::Utc;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{ApprovalFilter, ApprovalRequest, ApprovalStatus, NewApprovalRequest},
    utils::sql,
};

const APPROVAL_COLUMNS: &str = r#"
    id,
    company_id,
    requested_by,
    entity_type,
    entity_id,
    action,
    old_data,
    new_data,
    reason,
    status,
    reviewed_by,
    review_notes,
    reviewed_at,
    created_at,
    updated_at
"#;

pub async fn create_request(
    tx: &mut Transaction<'_, Postgres>,
    request: &NewApprovalRequest,
) -> Result<ApprovalRequest, sqlx::Error> {
    sqlx::query_as::<_, ApprovalRequest>(&sql(&format!(
        r#"
        INSERT INTO
            approval_requests (
                company_id,
                requested_by,
                entity_type,
                entity_id,
                action,
                old_data,
                new_data,
                reason
            )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        APPROVAL_COLUMNS
    )))
    .bind(request.company_id)
    .bind(request.requested_by)
    .bind(request.entity_type)
    .bind(request.entity_id)
    .bind(request.action)
    .bind(&request.old_data)
    .bind(&request.new_data)
    .bind(&request.reason)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(
    company_id: Uuid,
    request_id: Uuid,
) -> Result<Option<ApprovalRequest>, sqlx::Error> {
    sqlx::query_as::<_, ApprovalRequest>(&sql(&format!(
        "SELECT {} FROM approval_requests WHERE company_id = ? AND id = ?",
        APPROVAL_COLUMNS
    )))
    .bind(company_id)
    .bind(request_id)
    .fetch_optional(get_pool())
    .await
}

/// Lock the request row for a review decision
pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    request_id: Uuid,
) -> Result<Option<ApprovalRequest>, sqlx::Error> {
    sqlx::query_as::<_, ApprovalRequest>(&sql(&format!(
        "SELECT {} FROM approval_requests WHERE company_id = ? AND id = ? FOR UPDATE",
        APPROVAL_COLUMNS
    )))
    .bind(company_id)
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await
}

/// List requests of a company. `requested_by` narrows to one requester.
pub async fn list_requests(
    company_id: Uuid,
    requested_by: Option<Uuid>,
    filter: &ApprovalFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ApprovalRequest>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM approval_requests WHERE company_id = ",
        APPROVAL_COLUMNS
    ));
    query.push_bind(company_id);

    if let Some(user_id) = requested_by {
        query.push(" AND requested_by = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(entity_type) = filter.entity_type {
        query.push(" AND entity_type = ").push_bind(entity_type);
    }

    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<ApprovalRequest>()
        .fetch_all(get_pool())
        .await
}

/// Move a pending request to a final status. Returns `None` if it was no longer pending.
pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    status: ApprovalStatus,
    reviewed_by: Option<Uuid>,
    review_notes: Option<&str>,
) -> Result<Option<ApprovalRequest>, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, ApprovalRequest>(&sql(&format!(
        r#"
        UPDATE approval_requests
        SET
            status = ?,
            reviewed_by = ?,
            review_notes = ?,
            reviewed_at = ?,
            updated_at = ?
        WHERE
            id = ?
            AND status = 'pending'
        RETURNING {}
        "#,
        APPROVAL_COLUMNS
    )))
    .bind(status)
    .bind(reviewed_by)
    .bind(review_notes)
    .bind(reviewed_by.map(|_| now))
    .bind(now)
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await
}

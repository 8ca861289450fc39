use chrono::{NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{horizon, CompanyDocument, CompanyDocumentInput, DocumentFilter, ExpiryCandidate, ExpiryFlags},
    utils::sql,
};

const DOCUMENT_COLUMNS: &str = r#"
    id,
    company_id,
    document_type,
    title,
    document_number,
    issue_date,
    expiry_date,
    file_url,
    notes,
    notified_180_days,
    notified_90_days,
    notified_30_days,
    notified_7_days,
    notified_expired,
    created_at,
    updated_at
"#;

pub async fn create_document(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    input: &CompanyDocumentInput,
) -> Result<CompanyDocument, sqlx::Error> {
    sqlx::query_as::<_, CompanyDocument>(&sql(&format!(
        r#"
        INSERT INTO
            company_documents (
                company_id,
                document_type,
                title,
                document_number,
                issue_date,
                expiry_date,
                file_url,
                notes
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        DOCUMENT_COLUMNS
    )))
    .bind(company_id)
    .bind(input.document_type.trim())
    .bind(input.title.trim())
    .bind(&input.document_number)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.file_url)
    .bind(&input.notes)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(
    company_id: Uuid,
    document_id: Uuid,
) -> Result<Option<CompanyDocument>, sqlx::Error> {
    sqlx::query_as::<_, CompanyDocument>(&sql(&format!(
        "SELECT {} FROM company_documents WHERE company_id = ? AND id = ?",
        DOCUMENT_COLUMNS
    )))
    .bind(company_id)
    .bind(document_id)
    .fetch_optional(get_pool())
    .await
}

pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<Option<CompanyDocument>, sqlx::Error> {
    sqlx::query_as::<_, CompanyDocument>(&sql(&format!(
        "SELECT {} FROM company_documents WHERE company_id = ? AND id = ? FOR UPDATE",
        DOCUMENT_COLUMNS
    )))
    .bind(company_id)
    .bind(document_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_documents(
    company_id: Uuid,
    filter: &DocumentFilter,
    today: NaiveDate,
    limit: i64,
    offset: i64,
) -> Result<Vec<CompanyDocument>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM company_documents WHERE company_id = ",
        DOCUMENT_COLUMNS
    ));
    query.push_bind(company_id);

    if let Some(document_type) = filter.document_type.as_deref() {
        query.push(" AND document_type = ").push_bind(document_type.to_string());
    }

    if let Some(days) = filter.expiring_within_days {
        query
            .push(" AND expiry_date >= ")
            .push_bind(today)
            .push(" AND expiry_date <= ")
            .push_bind(horizon(today, days));
    }

    match filter.expired {
        Some(true) => {
            query.push(" AND expiry_date < ").push_bind(today);
        }
        Some(false) => {
            query
                .push(" AND (expiry_date IS NULL OR expiry_date >= ")
                .push_bind(today)
                .push(")");
        }
        None => {}
    }

    query
        .push(" ORDER BY expiry_date ASC NULLS LAST, title ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<CompanyDocument>()
        .fetch_all(get_pool())
        .await
}

/// Update a document. A changed expiry date clears every notification flag.
pub async fn update_document(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    document_id: Uuid,
    input: &CompanyDocumentInput,
) -> Result<Option<CompanyDocument>, sqlx::Error> {
    sqlx::query_as::<_, CompanyDocument>(&format!(
        r#"
        UPDATE company_documents
        SET
            document_type = $1,
            title = $2,
            document_number = $3,
            issue_date = $4,
            notified_180_days = CASE WHEN expiry_date IS DISTINCT FROM $5 THEN FALSE ELSE notified_180_days END,
            notified_90_days = CASE WHEN expiry_date IS DISTINCT FROM $5 THEN FALSE ELSE notified_90_days END,
            notified_30_days = CASE WHEN expiry_date IS DISTINCT FROM $5 THEN FALSE ELSE notified_30_days END,
            notified_7_days = CASE WHEN expiry_date IS DISTINCT FROM $5 THEN FALSE ELSE notified_7_days END,
            notified_expired = CASE WHEN expiry_date IS DISTINCT FROM $5 THEN FALSE ELSE notified_expired END,
            expiry_date = $5,
            file_url = $6,
            notes = $7,
            updated_at = $8
        WHERE
            company_id = $9
            AND id = $10
        RETURNING {}
        "#,
        DOCUMENT_COLUMNS
    ))
    .bind(input.document_type.trim())
    .bind(input.title.trim())
    .bind(&input.document_number)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.file_url)
    .bind(&input.notes)
    .bind(Utc::now())
    .bind(company_id)
    .bind(document_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete_document(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM company_documents
        WHERE
            company_id = ?
            AND id = ?
    "#))
    .bind(company_id)
    .bind(document_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Documents expiring on or before `horizon` with at least one stage still unsent.
pub async fn expiry_candidates(
    horizon: NaiveDate,
    company_id: Option<Uuid>,
) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
    sqlx::query_as::<_, ExpiryCandidate>(&sql(r#"
        SELECT
            id,
            company_id,
            title AS label,
            expiry_date,
            notified_180_days,
            notified_90_days,
            notified_30_days,
            notified_7_days,
            notified_expired
        FROM
            company_documents
        WHERE
            expiry_date IS NOT NULL
            AND expiry_date <= ?
            AND NOT notified_expired
            AND (?::uuid IS NULL OR company_id = ?)
        ORDER BY
            expiry_date ASC
    "#))
    .bind(horizon)
    .bind(company_id)
    .bind(company_id)
    .fetch_all(get_pool())
    .await
}

/// Documents of one company expiring on or before `horizon`, past expiries included.
pub async fn expiring_before(
    company_id: Uuid,
    horizon: NaiveDate,
) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
    sqlx::query_as::<_, ExpiryCandidate>(&sql(r#"
        SELECT
            id,
            company_id,
            title AS label,
            expiry_date,
            notified_180_days,
            notified_90_days,
            notified_30_days,
            notified_7_days,
            notified_expired
        FROM
            company_documents
        WHERE
            company_id = ?
            AND expiry_date IS NOT NULL
            AND expiry_date <= ?
        ORDER BY
            expiry_date ASC
    "#))
    .bind(company_id)
    .bind(horizon)
    .fetch_all(get_pool())
    .await
}

pub async fn update_flags(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    expiry_date: NaiveDate,
    flags: &ExpiryFlags,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        UPDATE company_documents
        SET
            notified_180_days = ?,
            notified_90_days = ?,
            notified_30_days = ?,
            notified_7_days = ?,
            notified_expired = ?
        WHERE
            id = ?
            AND expiry_date = ?
    "#))
    .bind(flags.notified_180_days)
    .bind(flags.notified_90_days)
    .bind(flags.notified_30_days)
    .bind(flags.notified_7_days)
    .bind(flags.notified_expired)
    .bind(document_id)
    .bind(expiry_date)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

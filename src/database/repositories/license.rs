use chrono::{NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{horizon, ExpiryCandidate, ExpiryFlags, License, LicenseFilter, LicenseInput},
    utils::sql,
};

const LICENSE_COLUMNS: &str = r#"
    id,
    worker_id,
    company_id,
    license_type,
    license_number,
    issuing_authority,
    issue_date,
    expiry_date,
    notes,
    notified_180_days,
    notified_90_days,
    notified_30_days,
    notified_7_days,
    notified_expired,
    created_at,
    updated_at
"#;

pub async fn create_license(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    input: &LicenseInput,
) -> Result<License, sqlx::Error> {
    sqlx::query_as::<_, License>(&sql(&format!(
        r#"
        INSERT INTO
            licenses (
                worker_id,
                company_id,
                license_type,
                license_number,
                issuing_authority,
                issue_date,
                expiry_date,
                notes
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        LICENSE_COLUMNS
    )))
    .bind(input.worker_id)
    .bind(company_id)
    .bind(input.license_type.trim())
    .bind(input.license_number.trim())
    .bind(&input.issuing_authority)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.notes)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(company_id: Uuid, license_id: Uuid) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as::<_, License>(&sql(&format!(
        "SELECT {} FROM licenses WHERE company_id = ? AND id = ?",
        LICENSE_COLUMNS
    )))
    .bind(company_id)
    .bind(license_id)
    .fetch_optional(get_pool())
    .await
}

pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    license_id: Uuid,
) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as::<_, License>(&sql(&format!(
        "SELECT {} FROM licenses WHERE company_id = ? AND id = ? FOR UPDATE",
        LICENSE_COLUMNS
    )))
    .bind(company_id)
    .bind(license_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_licenses(
    company_id: Uuid,
    filter: &LicenseFilter,
    today: NaiveDate,
    limit: i64,
    offset: i64,
) -> Result<Vec<License>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM licenses WHERE company_id = ",
        LICENSE_COLUMNS
    ));
    query.push_bind(company_id);

    if let Some(worker_id) = filter.worker_id {
        query.push(" AND worker_id = ").push_bind(worker_id);
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
            query.push(" AND expiry_date >= ").push_bind(today);
        }
        None => {}
    }

    query
        .push(" ORDER BY expiry_date ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<License>()
        .fetch_all(get_pool())
        .await
}

/// Update a license. A changed expiry date clears every notification flag.
pub async fn update_license(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    license_id: Uuid,
    input: &LicenseInput,
) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as::<_, License>(&format!(
        r#"
        UPDATE licenses
        SET
            worker_id = $1,
            license_type = $2,
            license_number = $3,
            issuing_authority = $4,
            issue_date = $5,
            notified_180_days = CASE WHEN expiry_date <> $6 THEN FALSE ELSE notified_180_days END,
            notified_90_days = CASE WHEN expiry_date <> $6 THEN FALSE ELSE notified_90_days END,
            notified_30_days = CASE WHEN expiry_date <> $6 THEN FALSE ELSE notified_30_days END,
            notified_7_days = CASE WHEN expiry_date <> $6 THEN FALSE ELSE notified_7_days END,
            notified_expired = CASE WHEN expiry_date <> $6 THEN FALSE ELSE notified_expired END,
            expiry_date = $6,
            notes = $7,
            updated_at = $8
        WHERE
            company_id = $9
            AND id = $10
        RETURNING {}
        "#,
        LICENSE_COLUMNS
    ))
    .bind(input.worker_id)
    .bind(input.license_type.trim())
    .bind(input.license_number.trim())
    .bind(&input.issuing_authority)
    .bind(input.issue_date)
    .bind(input.expiry_date)
    .bind(&input.notes)
    .bind(Utc::now())
    .bind(company_id)
    .bind(license_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete_license(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    license_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM licenses
        WHERE
            company_id = ?
            AND id = ?
    "#))
    .bind(company_id)
    .bind(license_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Licenses expiring on or before `horizon` with at least one stage still unsent.
/// `company_id` narrows the set to one tenant.
pub async fn expiry_candidates(
    horizon: NaiveDate,
    company_id: Option<Uuid>,
) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
    sqlx::query_as::<_, ExpiryCandidate>(&sql(r#"
        SELECT
            l.id,
            l.company_id,
            w.first_name || ' ' || w.last_name || ': ' || l.license_type || ' #' || l.license_number AS label,
            l.expiry_date,
            l.notified_180_days,
            l.notified_90_days,
            l.notified_30_days,
            l.notified_7_days,
            l.notified_expired
        FROM
            licenses l
            INNER JOIN workers w ON w.id = l.worker_id
        WHERE
            l.expiry_date <= ?
            AND NOT l.notified_expired
            AND (?::uuid IS NULL OR l.company_id = ?)
        ORDER BY
            l.expiry_date ASC
    "#))
    .bind(horizon)
    .bind(company_id)
    .bind(company_id)
    .fetch_all(get_pool())
    .await
}

/// Returns false when the expiry date changed after the candidate was loaded.
pub async fn update_flags(
    tx: &mut Transaction<'_, Postgres>,
    license_id: Uuid,
    expiry_date: NaiveDate,
    flags: &ExpiryFlags,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        UPDATE licenses
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
    .bind(license_id)
    .bind(expiry_date)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Licenses of one company expiring on or before `horizon`, past expiries included.
pub async fn expiring_before(
    company_id: Uuid,
    horizon: NaiveDate,
) -> Result<Vec<ExpiryCandidate>, sqlx::Error> {
    sqlx::query_as::<_, ExpiryCandidate>(&sql(r#"
        SELECT
            l.id,
            l.company_id,
            w.first_name || ' ' || w.last_name || ': ' || l.license_type || ' #' || l.license_number AS label,
            l.expiry_date,
            l.notified_180_days,
            l.notified_90_days,
            l.notified_30_days,
            l.notified_7_days,
            l.notified_expired
        FROM
            licenses l
            INNER JOIN workers w ON w.id = l.worker_id
        WHERE
            l.company_id = ?
            AND l.expiry_date <= ?
        ORDER BY
            l.expiry_date ASC
    "#))
    .bind(company_id)
    .bind(horizon)
    .fetch_all(get_pool())
    .await
}

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{Worker, WorkerFilter, WorkerInput},
    utils::{like_pattern, sql},
};

const WORKER_COLUMNS: &str = r#"
    id,
    company_id,
    first_name,
    last_name,
    email,
    phone,
    national_id,
    position,
    status,
    hire_date,
    created_at,
    updated_at
"#;

pub async fn create_worker(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    input: &WorkerInput,
) -> Result<Worker, sqlx::Error> {
    sqlx::query_as::<_, Worker>(&sql(&format!(
        r#"
        INSERT INTO
            workers (
                company_id,
                first_name,
                last_name,
                email,
                phone,
                national_id,
                position,
                status,
                hire_date
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        WORKER_COLUMNS
    )))
    .bind(company_id)
    .bind(input.first_name.trim())
    .bind(input.last_name.trim())
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.national_id)
    .bind(&input.position)
    .bind(input.status.unwrap_or_default())
    .bind(input.hire_date)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(company_id: Uuid, worker_id: Uuid) -> Result<Option<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(&sql(&format!(
        "SELECT {} FROM workers WHERE company_id = ? AND id = ?",
        WORKER_COLUMNS
    )))
    .bind(company_id)
    .bind(worker_id)
    .fetch_optional(get_pool())
    .await
}

/// Row-locking read used when a reviewed change is applied.
pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    worker_id: Uuid,
) -> Result<Option<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(&sql(&format!(
        "SELECT {} FROM workers WHERE company_id = ? AND id = ? FOR UPDATE",
        WORKER_COLUMNS
    )))
    .bind(company_id)
    .bind(worker_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_workers(
    company_id: Uuid,
    filter: &WorkerFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Worker>, sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM workers WHERE company_id = ",
        WORKER_COLUMNS
    ));
    query.push_bind(company_id);

    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        query
            .push(" AND (first_name || ' ' || last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR national_id ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    query
        .push(" ORDER BY last_name ASC, first_name ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query
        .build_query_as::<Worker>()
        .fetch_all(get_pool())
        .await
}

pub async fn update_worker(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    worker_id: Uuid,
    input: &WorkerInput,
) -> Result<Option<Worker>, sqlx::Error> {
    sqlx::query_as::<_, Worker>(&sql(&format!(
        r#"
        UPDATE workers
        SET
            first_name = ?,
            last_name = ?,
            email = ?,
            phone = ?,
            national_id = ?,
            position = ?,
            status = COALESCE(?, status),
            hire_date = ?,
            updated_at = ?
        WHERE
            company_id = ?
            AND id = ?
        RETURNING {}
        "#,
        WORKER_COLUMNS
    )))
    .bind(input.first_name.trim())
    .bind(input.last_name.trim())
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.national_id)
    .bind(&input.position)
    .bind(input.status)
    .bind(input.hire_date)
    .bind(Utc::now())
    .bind(company_id)
    .bind(worker_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete_worker(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    worker_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM workers
        WHERE
            company_id = ?
            AND id = ?
    "#))
    .bind(company_id)
    .bind(worker_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{Permission, UserPermission},
    utils::sql,
};

pub async fn list_all() -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>(&sql(r#"
        SELECT
            id,
            key,
            description,
            category
        FROM
            permissions
        ORDER BY
            category,
            key
    "#))
    .fetch_all(get_pool())
    .await
}

/// Permission keys granted to a user within one company
pub async fn find_keys_for_user(
    user_id: Uuid,
    company_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(&sql(r#"
        SELECT
            p.key
        FROM
            user_permissions up
            INNER JOIN permissions p ON p.id = up.permission_id
        WHERE
            up.user_id = ?
            AND up.company_id = ?
        ORDER BY
            p.key
    "#))
    .bind(user_id)
    .bind(company_id)
    .fetch_all(get_pool())
    .await
}

pub async fn list_for_user(
    user_id: Uuid,
    company_id: Uuid,
) -> Result<Vec<UserPermission>, sqlx::Error> {
    sqlx::query_as::<_, UserPermission>(&sql(r#"
        SELECT
            up.user_id,
            up.company_id,
            p.key,
            up.granted_by,
            up.granted_at
        FROM
            user_permissions up
            INNER JOIN permissions p ON p.id = up.permission_id
        WHERE
            up.user_id = ?
            AND up.company_id = ?
        ORDER BY
            p.key
    "#))
    .bind(user_id)
    .bind(company_id)
    .fetch_all(get_pool())
    .await
}

/// Grant a key. Returns false when the grant already existed.
pub async fn grant(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    company_id: Uuid,
    key: &str,
    granted_by: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        INSERT INTO
            user_permissions (user_id, company_id, permission_id, granted_by)
        SELECT
            ?,
            ?,
            id,
            ?
        FROM
            permissions
        WHERE
            key = ?
        ON CONFLICT (user_id, company_id, permission_id) DO NOTHING
    "#))
    .bind(user_id)
    .bind(company_id)
    .bind(granted_by)
    .bind(key)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn revoke(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    company_id: Uuid,
    key: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM user_permissions up
        USING permissions p
        WHERE
            p.id = up.permission_id
            AND up.user_id = ?
            AND up.company_id = ?
            AND p.key = ?
    "#))
    .bind(user_id)
    .bind(company_id)
    .bind(key)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Drop every grant a user holds in a company, used when the membership ends
pub async fn revoke_all(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    company_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM user_permissions
        WHERE
            user_id = ?
            AND company_id = ?
    "#))
    .bind(user_id)
    .bind(company_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

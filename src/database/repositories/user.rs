use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{get_pool, models::User, utils::sql};

pub async fn create_user(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    password_hash: &str,
    name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&sql(r#"
        INSERT INTO
            users (email, password_hash, name)
        VALUES
            (?, ?, ?)
        RETURNING
            id,
            email,
            password_hash,
            name,
            is_active,
            created_at,
            updated_at
    "#))
    .bind(email.trim().to_lowercase())
    .bind(password_hash)
    .bind(name.trim())
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_email(email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&sql(r#"
        SELECT
            id,
            email,
            password_hash,
            name,
            is_active,
            created_at,
            updated_at
        FROM
            users
        WHERE
            email = ?
    "#))
    .bind(email.trim().to_lowercase())
    .fetch_optional(get_pool())
    .await
}

pub async fn find_by_id(id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&sql(r#"
        SELECT
            id,
            email,
            password_hash,
            name,
            is_active,
            created_at,
            updated_at
        FROM
            users
        WHERE
            id = ?
    "#))
    .bind(id)
    .fetch_optional(get_pool())
    .await
}

pub async fn email_exists(email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(&sql(r#"
        SELECT
            COUNT(*)
        FROM
            users
        WHERE
            email = ?
    "#))
    .bind(email.trim().to_lowercase())
    .fetch_one(get_pool())
    .await?;

    Ok(count > 0)
}

pub async fn update_password(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(&sql(r#"
        UPDATE users
        SET
            password_hash = ?,
            updated_at = ?
        WHERE
            id = ?
    "#))
    .bind(password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{Company, CompanyInfo, CompanyInput, CompanyMember, CompanyMemberInfo, CompanyRole},
    utils::sql,
};

pub async fn create_company(
    tx: &mut Transaction<'_, Postgres>,
    input: &CompanyInput,
) -> Result<Company, sqlx::Error> {
    sqlx::query_as::<_, Company>(&sql(r#"
        INSERT INTO
            companies (name, registration_number, address, phone, email)
        VALUES
            (?, ?, ?, ?, ?)
        RETURNING
            id,
            name,
            registration_number,
            address,
            phone,
            email,
            created_at,
            updated_at
    "#))
    .bind(input.name.trim())
    .bind(&input.registration_number)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&input.email)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(company_id: Uuid) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&sql(r#"
        SELECT
            id,
            name,
            registration_number,
            address,
            phone,
            email,
            created_at,
            updated_at
        FROM
            companies
        WHERE
            id = ?
    "#))
    .bind(company_id)
    .fetch_optional(get_pool())
    .await
}

pub async fn update_company(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    input: &CompanyInput,
) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&sql(r#"
        UPDATE companies
        SET
            name = ?,
            registration_number = ?,
            address = ?,
            phone = ?,
            email = ?,
            updated_at = ?
        WHERE
            id = ?
        RETURNING
            id,
            name,
            registration_number,
            address,
            phone,
            email,
            created_at,
            updated_at
    "#))
    .bind(input.name.trim())
    .bind(&input.registration_number)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(Utc::now())
    .bind(company_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn get_companies_for_user(user_id: Uuid) -> Result<Vec<CompanyInfo>, sqlx::Error> {
    sqlx::query_as::<_, CompanyInfo>(&sql(r#"
        SELECT
            c.id,
            c.name,
            c.registration_number,
            cm.role,
            cm.is_primary
        FROM
            companies c
            INNER JOIN company_members cm ON cm.company_id = c.id
        WHERE
            cm.user_id = ?
        ORDER BY
            cm.is_primary DESC,
            c.name ASC
    "#))
    .bind(user_id)
    .fetch_all(get_pool())
    .await
}

pub async fn find_company_info(
    user_id: Uuid,
    company_id: Uuid,
) -> Result<Option<CompanyInfo>, sqlx::Error> {
    sqlx::query_as::<_, CompanyInfo>(&sql(r#"
        SELECT
            c.id,
            c.name,
            c.registration_number,
            cm.role,
            cm.is_primary
        FROM
            companies c
            INNER JOIN company_members cm ON cm.company_id = c.id
        WHERE
            cm.user_id = ?
            AND c.id = ?
    "#))
    .bind(user_id)
    .bind(company_id)
    .fetch_optional(get_pool())
    .await
}

pub async fn add_member(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Uuid,
    role: CompanyRole,
    is_primary: bool,
) -> Result<CompanyMember, sqlx::Error> {
    sqlx::query_as::<_, CompanyMember>(&sql(r#"
        INSERT INTO
            company_members (user_id, company_id, role, is_primary)
        VALUES
            (?, ?, ?, ?)
        RETURNING
            id,
            user_id,
            company_id,
            role,
            is_primary,
            created_at,
            updated_at
    "#))
    .bind(user_id)
    .bind(company_id)
    .bind(role)
    .bind(is_primary)
    .fetch_one(&mut **tx)
    .await
}

pub async fn get_members(company_id: Uuid) -> Result<Vec<CompanyMemberInfo>, sqlx::Error> {
    sqlx::query_as::<_, CompanyMemberInfo>(&sql(r#"
        SELECT
            u.id AS user_id,
            u.email,
            u.name,
            cm.role,
            cm.is_primary,
            cm.created_at AS joined_at
        FROM
            company_members cm
            INNER JOIN users u ON u.id = cm.user_id
        WHERE
            cm.company_id = ?
        ORDER BY
            u.name ASC
    "#))
    .bind(company_id)
    .fetch_all(get_pool())
    .await
}

pub async fn update_member_role(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Uuid,
    role: CompanyRole,
) -> Result<Option<CompanyMember>, sqlx::Error> {
    sqlx::query_as::<_, CompanyMember>(&sql(r#"
        UPDATE company_members
        SET
            role = ?,
            updated_at = ?
        WHERE
            company_id = ?
            AND user_id = ?
        RETURNING
            id,
            user_id,
            company_id,
            role,
            is_primary,
            created_at,
            updated_at
    "#))
    .bind(role)
    .bind(Utc::now())
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn remove_member(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&sql(r#"
        DELETE FROM company_members
        WHERE
            company_id = ?
            AND user_id = ?
    "#))
    .bind(company_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_admins(company_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&sql(r#"
        SELECT
            COUNT(*)
        FROM
            company_members
        WHERE
            company_id = ?
            AND role = 'admin'
    "#))
    .bind(company_id)
    .fetch_one(get_pool())
    .await
}

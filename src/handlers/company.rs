use actix_web::{
    HttpResponse,
    web::{Json, Path},
};
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, AddMemberInput, CompanyInfo, CompanyInput, CompanyRole, PermissionKey,
            UpdateMemberRoleInput,
        },
        repositories::{
            company as company_repo, permission as permission_repo, user as user_repo,
        },
        transaction::DatabaseTransaction,
    },
    error::AppError,
    handlers::shared::ApiResponse,
    middleware::request_info::RequestInfo,
    services::{activity_logger, permissions, user_context::UserContext},
};

/// Company-scoped writes act on the company selected in the token
fn ensure_current_company(ctx: &UserContext, company_id: Uuid) -> Result<(), AppError> {
    if ctx.strict_company_id()? != company_id {
        return Err(AppError::Forbidden(
            "Switch to this company before changing it".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_member(ctx: &UserContext, company_id: Uuid) -> Result<CompanyInfo, AppError> {
    company_repo::find_company_info(ctx.user_id(), company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))
}

pub async fn get_user_companies(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let companies = company_repo::get_companies_for_user(ctx.user_id()).await?;
    Ok(ApiResponse::ok(companies))
}

pub async fn create_company(
    input: Json<CompanyInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    input.validate().map_err(AppError::ValidationError)?;

    let user_id = ctx.user_id();
    let is_first = company_repo::get_companies_for_user(user_id).await?.is_empty();
    let input = input.into_inner();

    let company = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let company = company_repo::create_company(tx, &input).await?;
            company_repo::add_member(tx, company.id, user_id, CompanyRole::Admin, is_first).await?;

            let metadata = activity_logger::metadata(vec![
                ("company_name", company.name.clone()),
                ("creator_user_id", user_id.to_string()),
            ]);
            activity_logger::log_company_activity(
                tx,
                company.id,
                Some(user_id),
                company.id,
                Action::CREATED,
                format!("Company '{}' created", company.name),
                Some(metadata),
                &req_info,
            )
            .await?;

            Ok(company)
        })
    })
    .await?;

    log::info!("Company {} created by {}", company.id, user_id);

    Ok(ApiResponse::created(CompanyInfo {
        id: company.id,
        name: company.name,
        registration_number: company.registration_number,
        role: CompanyRole::Admin,
        is_primary: is_first,
    }))
}

pub async fn get_company(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = path.into_inner();
    ensure_member(&ctx, company_id).await?;

    let company = company_repo::find_by_id(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    Ok(ApiResponse::ok(company))
}

pub async fn update_company(
    path: Path<Uuid>,
    input: Json<CompanyInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let company_id = path.into_inner();
    ensure_current_company(&ctx, company_id)?;
    ctx.requires_permission(PermissionKey::COMPANIES_UPDATE)?;
    input.validate().map_err(AppError::ValidationError)?;

    let user_id = ctx.user_id();
    let input = input.into_inner();

    let company = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let company = company_repo::update_company(tx, company_id, &input)
                .await?
                .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

            activity_logger::log_company_activity(
                tx,
                company_id,
                Some(user_id),
                company_id,
                Action::UPDATED,
                format!("Company '{}' updated", company.name),
                None,
                &req_info,
            )
            .await?;

            Ok(company)
        })
    })
    .await?;

    Ok(ApiResponse::ok(company))
}

pub async fn get_members(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = path.into_inner();
    ensure_member(&ctx, company_id).await?;

    let members = company_repo::get_members(company_id).await?;
    Ok(ApiResponse::ok(members))
}

pub async fn add_member(
    path: Path<Uuid>,
    input: Json<AddMemberInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let company_id = path.into_inner();
    ensure_current_company(&ctx, company_id)?;
    ctx.requires_admin()?;

    let user = user_repo::find_by_email(&input.email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user registered as {}", input.email)))?;

    if company_repo::find_company_info(user.id, company_id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "{} is already a member of this company",
            user.email
        )));
    }

    let is_first = company_repo::get_companies_for_user(user.id).await?.is_empty();
    let role = input.role.unwrap_or_default();
    let actor_id = ctx.user_id();

    let member = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let member = company_repo::add_member(tx, company_id, user.id, role, is_first).await?;

            let metadata = activity_logger::metadata(vec![
                ("member_user_id", user.id.to_string()),
                ("member_email", user.email.clone()),
                ("role", role.to_string()),
            ]);
            activity_logger::log_company_activity(
                tx,
                company_id,
                Some(actor_id),
                company_id,
                Action::MEMBER_ADDED,
                format!("{} added as {}", user.email, role),
                Some(metadata),
                &req_info,
            )
            .await?;

            Ok(member)
        })
    })
    .await?;

    Ok(ApiResponse::created(member))
}

/// The last admin can neither be demoted nor removed
async fn ensure_not_last_admin(company_id: Uuid, target_user_id: Uuid) -> Result<(), AppError> {
    let target = company_repo::find_company_info(target_user_id, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if target.role == CompanyRole::Admin && company_repo::count_admins(company_id).await? <= 1 {
        return Err(AppError::BadRequest(
            "A company must keep at least one admin".to_string(),
        ));
    }
    Ok(())
}

pub async fn update_member_role(
    path: Path<(Uuid, Uuid)>,
    input: Json<UpdateMemberRoleInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let (company_id, member_id) = path.into_inner();
    ensure_current_company(&ctx, company_id)?;
    ctx.requires_admin()?;

    let role = input.role;
    if role != CompanyRole::Admin {
        ensure_not_last_admin(company_id, member_id).await?;
    }

    let actor_id = ctx.user_id();

    let member = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let member = company_repo::update_member_role(tx, company_id, member_id, role)
                .await?
                .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

            activity_logger::log_company_activity(
                tx,
                company_id,
                Some(actor_id),
                company_id,
                Action::ROLE_CHANGED,
                format!("Member {} is now {}", member_id, role),
                Some(activity_logger::metadata(vec![
                    ("member_user_id", member_id.to_string()),
                    ("role", role.to_string()),
                ])),
                &req_info,
            )
            .await?;

            Ok(member)
        })
    })
    .await?;

    permissions::invalidate(member_id, company_id).await;

    Ok(ApiResponse::ok(member))
}

pub async fn remove_member(
    path: Path<(Uuid, Uuid)>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let (company_id, member_id) = path.into_inner();
    ensure_current_company(&ctx, company_id)?;
    ctx.requires_admin()?;
    ensure_not_last_admin(company_id, member_id).await?;

    let actor_id = ctx.user_id();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            if !company_repo::remove_member(tx, company_id, member_id).await? {
                return Err(AppError::NotFound("Member not found".to_string()));
            }
            permission_repo::revoke_all(tx, member_id, company_id).await?;

            activity_logger::log_company_activity(
                tx,
                company_id,
                Some(actor_id),
                company_id,
                Action::MEMBER_REMOVED,
                format!("Member {} removed", member_id),
                Some(activity_logger::metadata(vec![(
                    "member_user_id",
                    member_id.to_string(),
                )])),
                &req_info,
            )
            .await?;

            Ok(())
        })
    })
    .await?;

    permissions::invalidate(member_id, company_id).await;

    Ok(ApiResponse::message("Member removed"))
}

use actix_web::{
    HttpResponse,
    web::{Json, Path, Query},
};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, ApprovalEntity, ChangeReason, ExpiryStage, License, LicenseFilter,
            LicenseInput, PermissionKey, today, validate_window,
        },
        repositories::{license as license_repo, worker as worker_repo},
        transaction::DatabaseTransaction,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination, change_response},
    middleware::request_info::RequestInfo,
    services::{
        activity_logger,
        approval::{self, ChangeProposal},
        user_context::UserContext,
    },
};

/// A license with its position in the expiry schedule
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseView {
    #[serde(flatten)]
    pub license: License,
    pub days_left: i64,
    pub stage: Option<ExpiryStage>,
}

impl LicenseView {
    pub fn new(license: License, today: NaiveDate) -> Self {
        Self {
            days_left: license.days_left(today),
            stage: license.stage(today),
            license,
        }
    }
}

pub async fn list_licenses(
    query: Query<LicenseFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::LICENSES_VIEW)?;
    validate_window(query.expiring_within_days).map_err(AppError::BadRequest)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let today = today();
    let licenses = license_repo::list_licenses(company_id, &query, today, page.limit(), page.offset())
        .await?
        .into_iter()
        .map(|license| LicenseView::new(license, today))
        .collect::<Vec<_>>();

    Ok(ApiResponse::ok(licenses))
}

pub async fn get_license(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::LICENSES_VIEW)?;

    let license = license_repo::find_by_id(company_id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("License not found".to_string()))?;

    Ok(ApiResponse::ok(LicenseView::new(license, today())))
}

pub async fn create_license(
    input: Json<LicenseInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::LICENSES_CREATE)?;
    input.validate().map_err(AppError::ValidationError)?;

    let worker = worker_repo::find_by_id(company_id, input.worker_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Worker does not belong to this company".to_string()))?;

    let user_id = ctx.user_id();
    let input = input.into_inner();

    let license = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let license = license_repo::create_license(tx, company_id, &input).await?;

            let metadata = activity_logger::metadata(vec![
                ("worker_id", worker.id.to_string()),
                ("worker_name", worker.full_name()),
                ("expiry_date", license.expiry_date.to_string()),
            ]);
            activity_logger::log_license_activity(
                tx,
                company_id,
                Some(user_id),
                license.id,
                Action::CREATED,
                format!("License '{}' added for {}", license.label(), worker.full_name()),
                Some(metadata),
                Some(&req_info),
            )
            .await?;

            Ok(license)
        })
    })
    .await?;

    Ok(ApiResponse::created(LicenseView::new(license, today())))
}

pub async fn update_license(
    path: Path<Uuid>,
    input: Json<LicenseInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::update(ApprovalEntity::License, path.into_inner(), &input.into_inner())?;
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "License updated"))
}

pub async fn delete_license(
    path: Path<Uuid>,
    query: Query<ChangeReason>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::delete(
        ApprovalEntity::License,
        path.into_inner(),
        query.into_inner().reason,
    );
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "License deleted"))
}

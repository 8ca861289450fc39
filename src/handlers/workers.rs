use actix_web::{
    HttpResponse,
    web::{Json, Path, Query},
};
use uuid::Uuid;

use crate::{
    database::{
        models::{
            Action, ApprovalEntity, ChangeReason, LicenseFilter, PermissionKey, WorkerFilter,
            WorkerInput, today,
        },
        repositories::{license as license_repo, worker as worker_repo},
        transaction::DatabaseTransaction,
    },
    error::AppError,
    handlers::{
        licenses::LicenseView,
        shared::{ApiResponse, Pagination, change_response},
    },
    middleware::request_info::RequestInfo,
    services::{
        activity_logger,
        approval::{self, ChangeProposal},
        user_context::UserContext,
    },
};

pub async fn list_workers(
    query: Query<WorkerFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::WORKERS_VIEW)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let workers = worker_repo::list_workers(company_id, &query, page.limit(), page.offset()).await?;

    Ok(ApiResponse::ok(workers))
}

pub async fn get_worker(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::WORKERS_VIEW)?;

    let worker = worker_repo::find_by_id(company_id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

    Ok(ApiResponse::ok(worker))
}

pub async fn create_worker(
    input: Json<WorkerInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::WORKERS_CREATE)?;
    input.validate().map_err(AppError::ValidationError)?;

    let user_id = ctx.user_id();
    let input = input.into_inner();

    let worker = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let worker = worker_repo::create_worker(tx, company_id, &input).await?;

            activity_logger::log_worker_activity(
                tx,
                company_id,
                Some(user_id),
                worker.id,
                Action::CREATED,
                format!("Worker '{}' created", worker.full_name()),
                None,
                Some(&req_info),
            )
            .await?;

            Ok(worker)
        })
    })
    .await?;

    Ok(ApiResponse::created(worker))
}

pub async fn update_worker(
    path: Path<Uuid>,
    input: Json<WorkerInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::update(ApprovalEntity::Worker, path.into_inner(), &input.into_inner())?;
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "Worker updated"))
}

pub async fn delete_worker(
    path: Path<Uuid>,
    query: Query<ChangeReason>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::delete(
        ApprovalEntity::Worker,
        path.into_inner(),
        query.into_inner().reason,
    );
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "Worker deleted"))
}

pub async fn get_worker_licenses(
    path: Path<Uuid>,
    query: Query<Pagination>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::LICENSES_VIEW)?;

    let worker_id = path.into_inner();
    worker_repo::find_by_id(company_id, worker_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

    let filter = LicenseFilter {
        worker_id: Some(worker_id),
        ..Default::default()
    };
    let today = today();
    let licenses = license_repo::list_licenses(company_id, &filter, today, query.limit(), query.offset())
        .await?
        .into_iter()
        .map(|license| LicenseView::new(license, today))
        .collect::<Vec<_>>();

    Ok(ApiResponse::ok(licenses))
}

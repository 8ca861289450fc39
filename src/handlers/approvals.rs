use actix_web::{
    HttpResponse,
    web::{Json, Path, Query},
};
use uuid::Uuid;

use crate::{
    database::models::{ApprovalFilter, ReviewInput},
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    middleware::request_info::RequestInfo,
    services::{approval, user_context::UserContext},
};

pub async fn list_approvals(
    query: Query<ApprovalFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let requests = approval::list(&ctx, &query, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get_approval(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let request = approval::get(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::ok(request))
}

pub async fn approve_request(
    path: Path<Uuid>,
    input: Option<Json<ReviewInput>>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let notes = input.and_then(|body| body.into_inner().notes);
    let request = approval::approve(&ctx, path.into_inner(), notes, &req_info).await?;

    log::info!("Approval request {} approved by {}", request.id, ctx.user_id());

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(request),
        "Change approved and applied",
    )))
}

pub async fn reject_request(
    path: Path<Uuid>,
    input: Option<Json<ReviewInput>>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let notes = input.and_then(|body| body.into_inner().notes);
    let request = approval::reject(&ctx, path.into_inner(), notes, &req_info).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(request),
        "Change rejected",
    )))
}

pub async fn cancel_request(
    path: Path<Uuid>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let request = approval::cancel(&ctx, path.into_inner(), &req_info).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(request),
        "Request cancelled",
    )))
}

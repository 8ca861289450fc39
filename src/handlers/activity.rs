use actix_web::{HttpResponse, web::Query};

use crate::{
    database::{
        models::{ActivityFilter, PermissionKey},
        repositories::activity as activity_repo,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    services::user_context::UserContext,
};

pub async fn list_activity(
    query: Query<ActivityFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::ACTIVITY_VIEW)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let entries = activity_repo::list_activity(company_id, &query, page.limit(), page.offset()).await?;

    Ok(ApiResponse::ok(entries))
}

use actix_web::{
    HttpResponse,
    web::{Path, Query},
};
use uuid::Uuid;

use crate::{
    database::{
        models::{NotificationFilter, PermissionKey, UnreadCount},
        repositories::notification as notification_repo,
    },
    error::AppError,
    handlers::shared::{ApiResponse, Pagination},
    services::user_context::UserContext,
};

fn scope(ctx: &UserContext) -> Result<(Uuid, Uuid), AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::NOTIFICATIONS_VIEW)?;
    Ok((company_id, ctx.user_id()))
}

pub async fn list_notifications(
    query: Query<NotificationFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let (company_id, user_id) = scope(&ctx)?;
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    let notifications =
        notification_repo::list_for_user(company_id, user_id, &query, page.limit(), page.offset())
            .await?;

    Ok(ApiResponse::ok(notifications))
}

pub async fn unread_count(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let (company_id, user_id) = scope(&ctx)?;
    let unread = notification_repo::unread_count(company_id, user_id).await?;
    Ok(ApiResponse::ok(UnreadCount { unread }))
}

pub async fn mark_read(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let (company_id, user_id) = scope(&ctx)?;

    let notification = notification_repo::mark_read(company_id, user_id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    Ok(ApiResponse::ok(notification))
}

pub async fn mark_all_read(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let (company_id, user_id) = scope(&ctx)?;
    let updated = notification_repo::mark_all_read(company_id, user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(serde_json::json!({ "updated": updated })),
        "All notifications marked as read",
    )))
}

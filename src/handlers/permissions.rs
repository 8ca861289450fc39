use actix_web::{
    HttpResponse,
    web::{Json, Path},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    database::{
        models::{Action, GrantPermissionsInput, PermissionKey},
        repositories::{company as company_repo, permission as permission_repo},
        transaction::DatabaseTransaction,
    },
    error::AppError,
    handlers::shared::ApiResponse,
    middleware::request_info::RequestInfo,
    services::{activity_logger, permissions, user_context::UserContext},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPermissions {
    pub company_id: Uuid,
    pub is_admin: bool,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResult {
    pub granted: Vec<String>,
    pub already_held: Vec<String>,
}

/// Checks shared by every grant-management endpoint
async fn ensure_manageable(ctx: &UserContext, target_user_id: Uuid) -> Result<Uuid, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::PERMISSIONS_MANAGE)?;

    if target_user_id == ctx.user_id() {
        return Err(AppError::Forbidden(
            "You cannot change your own permissions".to_string(),
        ));
    }

    company_repo::find_company_info(target_user_id, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User is not a member of this company".to_string()))?;

    Ok(company_id)
}

fn validate_keys(keys: &[String]) -> Result<(), AppError> {
    if keys.is_empty() {
        return Err(AppError::ValidationError(
            "At least one permission key is required".to_string(),
        ));
    }
    if let Some(unknown) = keys.iter().find(|key| !PermissionKey::is_known(key)) {
        return Err(AppError::ValidationError(format!(
            "Unknown permission key '{}'",
            unknown
        )));
    }
    Ok(())
}

pub async fn list_permissions(ctx: UserContext) -> Result<HttpResponse, AppError> {
    ctx.requires_company()?;
    let catalogue = permission_repo::list_all().await?;
    Ok(ApiResponse::ok(catalogue))
}

pub async fn my_permissions(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;

    Ok(ApiResponse::ok(MyPermissions {
        company_id,
        is_admin: ctx.is_admin(),
        permissions: ctx.effective_permissions(),
    }))
}

pub async fn get_user_permissions(
    path: Path<Uuid>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::PERMISSIONS_MANAGE)?;

    let user_id = path.into_inner();
    company_repo::find_company_info(user_id, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User is not a member of this company".to_string()))?;

    let grants = permission_repo::list_for_user(user_id, company_id).await?;
    Ok(ApiResponse::ok(grants))
}

pub async fn grant_permissions(
    path: Path<Uuid>,
    input: Json<GrantPermissionsInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let target_user_id = path.into_inner();
    validate_keys(&input.keys)?;
    let company_id = ensure_manageable(&ctx, target_user_id).await?;

    let actor_id = ctx.user_id();
    let mut keys = input.into_inner().keys;
    keys.sort();
    keys.dedup();

    let result = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let mut result = GrantResult {
                granted: Vec::new(),
                already_held: Vec::new(),
            };

            for key in keys {
                if permission_repo::grant(tx, target_user_id, company_id, &key, actor_id).await? {
                    result.granted.push(key);
                } else {
                    result.already_held.push(key);
                }
            }

            if !result.granted.is_empty() {
                let metadata =
                    activity_logger::metadata(vec![("keys", result.granted.join(","))]);
                activity_logger::log_permission_activity(
                    tx,
                    company_id,
                    Some(actor_id),
                    target_user_id,
                    Action::GRANTED,
                    format!("Granted {}", result.granted.join(", ")),
                    Some(metadata),
                    &req_info,
                )
                .await?;
            }

            Ok(result)
        })
    })
    .await?;

    permissions::invalidate(target_user_id, company_id).await;

    Ok(ApiResponse::ok(result))
}

pub async fn revoke_permission(
    path: Path<(Uuid, String)>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let (target_user_id, key) = path.into_inner();
    validate_keys(std::slice::from_ref(&key))?;
    let company_id = ensure_manageable(&ctx, target_user_id).await?;

    let actor_id = ctx.user_id();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            if !permission_repo::revoke(tx, target_user_id, company_id, &key).await? {
                return Err(AppError::NotFound(format!(
                    "Permission '{}' is not granted",
                    key
                )));
            }

            activity_logger::log_permission_activity(
                tx,
                company_id,
                Some(actor_id),
                target_user_id,
                Action::REVOKED,
                format!("Revoked {}", key),
                Some(activity_logger::metadata(vec![("key", key.clone())])),
                &req_info,
            )
            .await?;

            Ok(())
        })
    })
    .await?;

    permissions::invalidate(target_user_id, company_id).await;

    Ok(ApiResponse::message("Permission revoked"))
}

use actix_web::{HttpResponse, web::Json};
use serde::Serialize;

use crate::database::{
    models::{
        ChangePasswordInput, CompanyInfo, CreateUserInput, LoginInput, SwitchCompanyInput,
        UserInfo,
    },
    repositories::company as company_repo,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::middleware::request_info::RequestInfo;
use crate::services::{auth, user_context::UserContext};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserInfo,
    pub company: Option<CompanyInfo>,
    pub companies: Vec<CompanyInfo>,
    pub permissions: Vec<String>,
}

pub async fn register(input: Json<CreateUserInput>) -> Result<HttpResponse, AppError> {
    let response = auth::register(input.into_inner()).await?;
    Ok(ApiResponse::created(response))
}

pub async fn login(
    input: Json<LoginInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let response = auth::login(input.into_inner(), &req_info).await.map_err(|e| {
        log::warn!("Login failed from {}: {}", req_info.ip_address, e);
        e
    })?;
    Ok(ApiResponse::ok(response))
}

pub async fn me(ctx: UserContext) -> Result<HttpResponse, AppError> {
    let user_id = ctx.user_id();
    let companies = company_repo::get_companies_for_user(user_id).await?;

    Ok(ApiResponse::ok(MeResponse {
        permissions: ctx.effective_permissions(),
        user: UserInfo::from(ctx.user),
        company: ctx.company,
        companies,
    }))
}

pub async fn switch_company(
    ctx: UserContext,
    input: Json<SwitchCompanyInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let response = auth::switch_company(&ctx.user, input.company_id, &req_info).await?;
    Ok(ApiResponse::ok(response))
}

pub async fn change_password(
    ctx: UserContext,
    input: Json<ChangePasswordInput>,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    auth::change_password(&ctx.user, ctx.company_id(), input.into_inner(), &req_info).await?;
    Ok(ApiResponse::message("Password changed successfully"))
}

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
            Action, ApprovalEntity, ChangeReason, CompanyDocument, CompanyDocumentInput,
            DocumentFilter, ExpiryStage, PermissionKey, today, validate_window,
        },
        repositories::document as document_repo,
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: CompanyDocument,
    pub days_left: Option<i64>,
    pub stage: Option<ExpiryStage>,
}

impl DocumentView {
    fn new(document: CompanyDocument, today: NaiveDate) -> Self {
        Self {
            days_left: document.days_left(today),
            stage: document.stage(today),
            document,
        }
    }
}

pub async fn list_documents(
    query: Query<DocumentFilter>,
    ctx: UserContext,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::DOCUMENTS_VIEW)?;
    validate_window(query.expiring_within_days).map_err(AppError::BadRequest)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let today = today();
    let documents =
        document_repo::list_documents(company_id, &query, today, page.limit(), page.offset())
            .await?
            .into_iter()
            .map(|document| DocumentView::new(document, today))
            .collect::<Vec<_>>();

    Ok(ApiResponse::ok(documents))
}

pub async fn get_document(path: Path<Uuid>, ctx: UserContext) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::DOCUMENTS_VIEW)?;

    let document = document_repo::find_by_id(company_id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    Ok(ApiResponse::ok(DocumentView::new(document, today())))
}

pub async fn create_document(
    input: Json<CompanyDocumentInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::DOCUMENTS_CREATE)?;
    input.validate().map_err(AppError::ValidationError)?;

    let user_id = ctx.user_id();
    let input = input.into_inner();

    let document = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let document = document_repo::create_document(tx, company_id, &input).await?;

            let mut pairs = vec![("document_type", document.document_type.clone())];
            if let Some(expiry_date) = document.expiry_date {
                pairs.push(("expiry_date", expiry_date.to_string()));
            }
            activity_logger::log_document_activity(
                tx,
                company_id,
                Some(user_id),
                document.id,
                Action::CREATED,
                format!("Document '{}' added", document.title),
                Some(activity_logger::metadata(pairs)),
                Some(&req_info),
            )
            .await?;

            Ok(document)
        })
    })
    .await?;

    Ok(ApiResponse::created(DocumentView::new(document, today())))
}

pub async fn update_document(
    path: Path<Uuid>,
    input: Json<CompanyDocumentInput>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::update(
        ApprovalEntity::CompanyDocument,
        path.into_inner(),
        &input.into_inner(),
    )?;
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "Document updated"))
}

pub async fn delete_document(
    path: Path<Uuid>,
    query: Query<ChangeReason>,
    ctx: UserContext,
    req_info: RequestInfo,
) -> Result<HttpResponse, AppError> {
    let proposal = ChangeProposal::delete(
        ApprovalEntity::CompanyDocument,
        path.into_inner(),
        query.into_inner().reason,
    );
    let outcome = approval::submit_or_apply(&ctx, proposal, &req_info).await?;

    Ok(change_response(outcome, "Document deleted"))
}

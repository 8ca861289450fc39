use serde::Serialize;
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{
        Action, ApprovalAction, ApprovalEntity, ApprovalFilter, ApprovalRequest, ApprovalStatus,
        CompanyDocumentInput, CreateNotificationInput, LicenseInput, NewApprovalRequest,
        NotificationKind, PermissionKey, WorkerInput,
    },
    repositories::{
        approval as approval_repo, document as document_repo, license as license_repo,
        notification as notification_repo, worker as worker_repo,
    },
    transaction::DatabaseTransaction,
};
use crate::error::AppError;
use crate::middleware::request_info::RequestInfo;
use crate::services::{activity_logger, user_context::UserContext};

/// Result of a sensitive change: applied right away or queued for review
#[derive(Debug)]
pub enum ChangeOutcome {
    Applied(Value),
    Queued(ApprovalRequest),
}

/// A proposed update or delete on one record
#[derive(Debug, Clone)]
pub struct ChangeProposal {
    pub entity: ApprovalEntity,
    pub action: ApprovalAction,
    pub entity_id: Uuid,
    pub new_data: Option<Value>,
    pub reason: Option<String>,
}

impl ChangeProposal {
    pub fn update<T: Serialize>(
        entity: ApprovalEntity,
        entity_id: Uuid,
        input: &T,
    ) -> Result<Self, AppError> {
        Ok(Self {
            entity,
            action: ApprovalAction::Update,
            entity_id,
            new_data: Some(serde_json::to_value(input)?),
            reason: None,
        })
    }

    pub fn delete(entity: ApprovalEntity, entity_id: Uuid, reason: Option<String>) -> Self {
        Self {
            entity,
            action: ApprovalAction::Delete,
            entity_id,
            new_data: None,
            reason,
        }
    }
}

// Columns the expiry scanner rewrites behind the user's back
const VOLATILE_PREFIX: &str = "notified";

/// JSON image of a row used to detect concurrent edits
pub fn snapshot<T: Serialize>(row: &T) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(row)?;
    if let Value::Object(map) = &mut value {
        map.retain(|key, _| !key.starts_with(VOLATILE_PREFIX));
    }
    Ok(value)
}

/// True when the row still looks the way it did when the request was filed
pub fn is_current(old_data: &Value, current: &Value) -> bool {
    old_data == current
}

fn entity_label(entity: ApprovalEntity) -> &'static str {
    match entity {
        ApprovalEntity::Worker => "Worker",
        ApprovalEntity::License => "License",
        ApprovalEntity::CompanyDocument => "Document",
    }
}

fn not_found(entity: ApprovalEntity) -> AppError {
    AppError::NotFound(format!("{} not found", entity_label(entity)))
}

fn parse_input<T: serde::de::DeserializeOwned>(new_data: Option<&Value>) -> Result<T, AppError> {
    let value = new_data
        .cloned()
        .ok_or_else(|| AppError::BadRequest("Update request carries no data".to_string()))?;
    Ok(serde_json::from_value(value)?)
}

/// Check a proposed update before it is queued or applied
pub async fn validate_proposal(
    company_id: Uuid,
    entity: ApprovalEntity,
    new_data: Option<&Value>,
) -> Result<(), AppError> {
    match entity {
        ApprovalEntity::Worker => {
            let input: WorkerInput = parse_input(new_data)?;
            input.validate().map_err(AppError::ValidationError)
        }
        ApprovalEntity::License => {
            let input: LicenseInput = parse_input(new_data)?;
            input.validate().map_err(AppError::ValidationError)?;
            if worker_repo::find_by_id(company_id, input.worker_id).await?.is_none() {
                return Err(AppError::BadRequest(
                    "Worker does not belong to this company".to_string(),
                ));
            }
            Ok(())
        }
        ApprovalEntity::CompanyDocument => {
            let input: CompanyDocumentInput = parse_input(new_data)?;
            input.validate().map_err(AppError::ValidationError)
        }
    }
}

/// Lock the target row and return its snapshot, `None` when it is gone
async fn lock_snapshot(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    entity: ApprovalEntity,
    entity_id: Uuid,
) -> Result<Option<Value>, AppError> {
    let value = match entity {
        ApprovalEntity::Worker => worker_repo::find_for_update(tx, company_id, entity_id)
            .await?
            .map(|row| snapshot(&row))
            .transpose()?,
        ApprovalEntity::License => license_repo::find_for_update(tx, company_id, entity_id)
            .await?
            .map(|row| snapshot(&row))
            .transpose()?,
        ApprovalEntity::CompanyDocument => {
            document_repo::find_for_update(tx, company_id, entity_id)
                .await?
                .map(|row| snapshot(&row))
                .transpose()?
        }
    };
    Ok(value)
}

/// Apply an update or delete and record it. Returns the updated row, or the removed one.
async fn apply_change(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    actor_id: Uuid,
    proposal: &ChangeProposal,
    req_info: &RequestInfo,
) -> Result<Value, AppError> {
    let entity_id = proposal.entity_id;
    let new_data = proposal.new_data.as_ref();

    match (proposal.entity, proposal.action) {
        (ApprovalEntity::Worker, ApprovalAction::Update) => {
            let input: WorkerInput = parse_input(new_data)?;
            let worker = worker_repo::update_worker(tx, company_id, entity_id, &input)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            activity_logger::log_worker_activity(
                tx,
                company_id,
                Some(actor_id),
                worker.id,
                Action::UPDATED,
                format!("Worker '{}' updated", worker.full_name()),
                None,
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(worker)?)
        }
        (ApprovalEntity::Worker, ApprovalAction::Delete) => {
            let worker = worker_repo::find_for_update(tx, company_id, entity_id)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            worker_repo::delete_worker(tx, company_id, entity_id).await?;
            activity_logger::log_worker_activity(
                tx,
                company_id,
                Some(actor_id),
                worker.id,
                Action::DELETED,
                format!("Worker '{}' deleted", worker.full_name()),
                proposal
                    .reason
                    .clone()
                    .map(|reason| activity_logger::metadata(vec![("reason", reason)])),
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(worker)?)
        }
        (ApprovalEntity::License, ApprovalAction::Update) => {
            let input: LicenseInput = parse_input(new_data)?;
            let license = license_repo::update_license(tx, company_id, entity_id, &input)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            activity_logger::log_license_activity(
                tx,
                company_id,
                Some(actor_id),
                license.id,
                Action::UPDATED,
                format!("License '{}' updated", license.label()),
                None,
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(license)?)
        }
        (ApprovalEntity::License, ApprovalAction::Delete) => {
            let license = license_repo::find_for_update(tx, company_id, entity_id)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            license_repo::delete_license(tx, company_id, entity_id).await?;
            activity_logger::log_license_activity(
                tx,
                company_id,
                Some(actor_id),
                license.id,
                Action::DELETED,
                format!("License '{}' deleted", license.label()),
                proposal
                    .reason
                    .clone()
                    .map(|reason| activity_logger::metadata(vec![("reason", reason)])),
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(license)?)
        }
        (ApprovalEntity::CompanyDocument, ApprovalAction::Update) => {
            let input: CompanyDocumentInput = parse_input(new_data)?;
            let document = document_repo::update_document(tx, company_id, entity_id, &input)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            activity_logger::log_document_activity(
                tx,
                company_id,
                Some(actor_id),
                document.id,
                Action::UPDATED,
                format!("Document '{}' updated", document.title),
                None,
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(document)?)
        }
        (ApprovalEntity::CompanyDocument, ApprovalAction::Delete) => {
            let document = document_repo::find_for_update(tx, company_id, entity_id)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;
            document_repo::delete_document(tx, company_id, entity_id).await?;
            activity_logger::log_document_activity(
                tx,
                company_id,
                Some(actor_id),
                document.id,
                Action::DELETED,
                format!("Document '{}' deleted", document.title),
                proposal
                    .reason
                    .clone()
                    .map(|reason| activity_logger::metadata(vec![("reason", reason)])),
                Some(req_info),
            )
            .await?;
            Ok(serde_json::to_value(document)?)
        }
    }
}

/// Entry point for every sensitive update/delete
pub async fn submit_or_apply(
    ctx: &UserContext,
    proposal: ChangeProposal,
    req_info: &RequestInfo,
) -> Result<ChangeOutcome, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(proposal.entity.permission_for(proposal.action))?;

    if proposal.action == ApprovalAction::Update {
        validate_proposal(company_id, proposal.entity, proposal.new_data.as_ref()).await?;
    }

    let user_id = ctx.user_id();
    let req_info = req_info.clone();

    if ctx.has_permission(PermissionKey::APPROVALS_BYPASS) {
        let applied = DatabaseTransaction::run(|tx| {
            Box::pin(async move {
                apply_change(tx, company_id, user_id, &proposal, &req_info).await
            })
        })
        .await?;
        return Ok(ChangeOutcome::Applied(applied));
    }

    let request = DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let old_data = lock_snapshot(tx, company_id, proposal.entity, proposal.entity_id)
                .await?
                .ok_or_else(|| not_found(proposal.entity))?;

            let request = approval_repo::create_request(
                tx,
                &NewApprovalRequest {
                    company_id,
                    requested_by: user_id,
                    entity_type: proposal.entity,
                    entity_id: proposal.entity_id,
                    action: proposal.action,
                    old_data,
                    new_data: proposal.new_data.clone(),
                    reason: proposal.reason.clone(),
                },
            )
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(
                    "A change to this record is already awaiting approval".to_string(),
                ),
                other => other,
            })?;

            let description = format!(
                "{} of {} {} submitted for approval",
                request.action,
                request.entity_type,
                request.entity_id
            );

            notification_repo::create_notification(
                tx,
                &CreateNotificationInput {
                    company_id,
                    user_id: None,
                    kind: NotificationKind::ApprovalRequested,
                    title: format!("{} change awaiting approval", entity_label(request.entity_type)),
                    message: description.clone(),
                    entity_type: Some(request.entity_type.to_string()),
                    entity_id: Some(request.entity_id),
                },
            )
            .await?;

            activity_logger::log_approval_activity(
                tx,
                company_id,
                Some(user_id),
                request.id,
                Action::REQUESTED,
                description,
                None,
                &req_info,
            )
            .await?;

            Ok(request)
        })
    })
    .await?;

    log::info!(
        "Approval request {} filed by {} for {} {}",
        request.id,
        user_id,
        request.entity_type,
        request.entity_id
    );

    Ok(ChangeOutcome::Queued(request))
}

fn ensure_reviewable(request: &ApprovalRequest, reviewer_id: Uuid) -> Result<(), AppError> {
    if request.status != ApprovalStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Request is already {}",
            request.status
        )));
    }
    if request.requested_by == reviewer_id {
        return Err(AppError::Forbidden(
            "You cannot review your own request".to_string(),
        ));
    }
    Ok(())
}

async fn notify_requester(
    tx: &mut Transaction<'_, Postgres>,
    request: &ApprovalRequest,
    kind: NotificationKind,
    title: String,
) -> Result<(), AppError> {
    notification_repo::create_notification(
        tx,
        &CreateNotificationInput {
            company_id: request.company_id,
            user_id: Some(request.requested_by),
            kind,
            title,
            message: format!(
                "Your {} request for {} {} was {}",
                request.action, request.entity_type, request.entity_id, request.status
            ),
            entity_type: Some(request.entity_type.to_string()),
            entity_id: Some(request.entity_id),
        },
    )
    .await?;
    Ok(())
}

fn still_pending(updated: Option<ApprovalRequest>) -> Result<ApprovalRequest, AppError> {
    updated.ok_or_else(|| AppError::Conflict("Request is no longer pending".to_string()))
}

pub async fn approve(
    ctx: &UserContext,
    request_id: Uuid,
    notes: Option<String>,
    req_info: &RequestInfo,
) -> Result<ApprovalRequest, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::APPROVALS_REVIEW)?;

    let reviewer_id = ctx.user_id();
    let req_info = req_info.clone();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let request = approval_repo::find_for_update(tx, company_id, request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Approval request not found".to_string()))?;
            ensure_reviewable(&request, reviewer_id)?;

            let current = lock_snapshot(tx, company_id, request.entity_type, request.entity_id)
                .await?
                .ok_or_else(|| not_found(request.entity_type))?;

            if !is_current(&request.old_data, &current) {
                return Err(AppError::Conflict(
                    "The record changed after this request was filed".to_string(),
                ));
            }

            let proposal = ChangeProposal {
                entity: request.entity_type,
                action: request.action,
                entity_id: request.entity_id,
                new_data: request.new_data.clone(),
                reason: request.reason.clone(),
            };
            if proposal.action == ApprovalAction::Update {
                validate_proposal(company_id, proposal.entity, proposal.new_data.as_ref()).await?;
            }
            apply_change(tx, company_id, reviewer_id, &proposal, &req_info).await?;

            let approved = still_pending(
                approval_repo::set_status(
                    tx,
                    request.id,
                    ApprovalStatus::Approved,
                    Some(reviewer_id),
                    notes.as_deref(),
                )
                .await?,
            )?;

            activity_logger::log_approval_activity(
                tx,
                company_id,
                Some(reviewer_id),
                approved.id,
                Action::APPROVED,
                format!(
                    "Approved {} of {} {}",
                    approved.action, approved.entity_type, approved.entity_id
                ),
                None,
                &req_info,
            )
            .await?;

            notify_requester(
                tx,
                &approved,
                NotificationKind::ApprovalApproved,
                format!("{} change approved", entity_label(approved.entity_type)),
            )
            .await?;

            Ok(approved)
        })
    })
    .await
}

pub async fn reject(
    ctx: &UserContext,
    request_id: Uuid,
    notes: Option<String>,
    req_info: &RequestInfo,
) -> Result<ApprovalRequest, AppError> {
    let company_id = ctx.strict_company_id()?;
    ctx.requires_permission(PermissionKey::APPROVALS_REVIEW)?;

    let reviewer_id = ctx.user_id();
    let req_info = req_info.clone();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let request = approval_repo::find_for_update(tx, company_id, request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Approval request not found".to_string()))?;
            ensure_reviewable(&request, reviewer_id)?;

            let rejected = still_pending(
                approval_repo::set_status(
                    tx,
                    request.id,
                    ApprovalStatus::Rejected,
                    Some(reviewer_id),
                    notes.as_deref(),
                )
                .await?,
            )?;

            activity_logger::log_approval_activity(
                tx,
                company_id,
                Some(reviewer_id),
                rejected.id,
                Action::REJECTED,
                format!(
                    "Rejected {} of {} {}",
                    rejected.action, rejected.entity_type, rejected.entity_id
                ),
                notes.map(|notes| activity_logger::metadata(vec![("notes", notes)])),
                &req_info,
            )
            .await?;

            notify_requester(
                tx,
                &rejected,
                NotificationKind::ApprovalRejected,
                format!("{} change rejected", entity_label(rejected.entity_type)),
            )
            .await?;

            Ok(rejected)
        })
    })
    .await
}

/// Withdraw a pending request. Only its requester may do so.
pub async fn cancel(
    ctx: &UserContext,
    request_id: Uuid,
    req_info: &RequestInfo,
) -> Result<ApprovalRequest, AppError> {
    let company_id = ctx.strict_company_id()?;
    let user_id = ctx.user_id();
    let req_info = req_info.clone();

    DatabaseTransaction::run(|tx| {
        Box::pin(async move {
            let request = approval_repo::find_for_update(tx, company_id, request_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Approval request not found".to_string()))?;

            if request.requested_by != user_id {
                return Err(AppError::Forbidden(
                    "Only the requester can cancel a request".to_string(),
                ));
            }
            if request.status.is_final() {
                return Err(AppError::Conflict(format!(
                    "Request is already {}",
                    request.status
                )));
            }

            let cancelled = still_pending(
                approval_repo::set_status(tx, request.id, ApprovalStatus::Cancelled, None, None)
                    .await?,
            )?;

            activity_logger::log_approval_activity(
                tx,
                company_id,
                Some(user_id),
                cancelled.id,
                Action::CANCELLED,
                format!(
                    "Cancelled {} of {} {}",
                    cancelled.action, cancelled.entity_type, cancelled.entity_id
                ),
                None,
                &req_info,
            )
            .await?;

            Ok(cancelled)
        })
    })
    .await
}

/// Reviewers see every request in the company, everyone else only their own
pub async fn list(
    ctx: &UserContext,
    filter: &ApprovalFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ApprovalRequest>, AppError> {
    let company_id = ctx.strict_company_id()?;
    let requested_by = if ctx.has_permission(PermissionKey::APPROVALS_REVIEW) {
        None
    } else {
        Some(ctx.user_id())
    };

    Ok(approval_repo::list_requests(company_id, requested_by, filter, limit, offset).await?)
}

pub async fn get(ctx: &UserContext, request_id: Uuid) -> Result<ApprovalRequest, AppError> {
    let company_id = ctx.strict_company_id()?;
    let request = approval_repo::find_by_id(company_id, request_id)
        .await?
        .filter(|r| {
            r.requested_by == ctx.user_id() || ctx.has_permission(PermissionKey::APPROVALS_REVIEW)
        })
        .ok_or_else(|| AppError::NotFound("Approval request not found".to_string()))?;

    Ok(request)
}

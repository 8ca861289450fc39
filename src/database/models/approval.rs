use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::permission::PermissionKey;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ApprovalAction {
        Update => "update",
        Delete => "delete",
    }
}

string_enum! {
    /// Entities whose update/delete goes through review.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ApprovalEntity {
        Worker => "worker",
        License => "license",
        CompanyDocument => "company_document",
    }
}

impl ApprovalEntity {
    /// Permission a requester needs to propose `action` on this entity.
    pub fn permission_for(&self, action: ApprovalAction) -> &'static str {
        match (self, action) {
            (ApprovalEntity::Worker, ApprovalAction::Update) => PermissionKey::WORKERS_UPDATE,
            (ApprovalEntity::Worker, ApprovalAction::Delete) => PermissionKey::WORKERS_DELETE,
            (ApprovalEntity::License, ApprovalAction::Update) => PermissionKey::LICENSES_UPDATE,
            (ApprovalEntity::License, ApprovalAction::Delete) => PermissionKey::LICENSES_DELETE,
            (ApprovalEntity::CompanyDocument, ApprovalAction::Update) => {
                PermissionKey::DOCUMENTS_UPDATE
            }
            (ApprovalEntity::CompanyDocument, ApprovalAction::Delete) => {
                PermissionKey::DOCUMENTS_DELETE
            }
        }
    }
}

impl ApprovalStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub requested_by: Uuid,
    pub entity_type: ApprovalEntity,
    pub entity_id: Uuid,
    pub action: ApprovalAction,
    pub old_data: serde_json::Value,
    pub new_data: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<Uuid>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApprovalRequest {
    pub company_id: Uuid,
    pub requested_by: Uuid,
    pub entity_type: ApprovalEntity,
    pub entity_id: Uuid,
    pub action: ApprovalAction,
    pub old_data: serde_json::Value,
    pub new_data: Option<serde_json::Value>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
    pub entity_type: Option<ApprovalEntity>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Optional reason attached to a sensitive delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReason {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_for_action() {
        assert_eq!(
            ApprovalEntity::Worker.permission_for(ApprovalAction::Delete),
            "workers.delete"
        );
        assert_eq!(
            ApprovalEntity::CompanyDocument.permission_for(ApprovalAction::Update),
            "documents.update"
        );
    }

    #[test]
    fn test_status_finality() {
        assert!(!ApprovalStatus::Pending.is_final());
        assert!(ApprovalStatus::Approved.is_final());
        assert!(ApprovalStatus::Rejected.is_final());
        assert!(ApprovalStatus::Cancelled.is_final());
    }
}

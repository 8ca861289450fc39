use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub company_id: Uuid,
    /// `None` for entries written by the expiry scanner
    pub user_id: Option<Uuid>,
    pub activity_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub activity_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Query string of `GET /activity`. Every field narrows the result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub activity_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// Common activity types for consistency
#[allow(non_snake_case)]
pub mod ActivityType {
    pub const COMPANY_MANAGEMENT: &str = "company_management";
    pub const WORKER_MANAGEMENT: &str = "worker_management";
    pub const LICENSE_MANAGEMENT: &str = "license_management";
    pub const DOCUMENT_MANAGEMENT: &str = "document_management";
    pub const PERMISSION_MANAGEMENT: &str = "permission_management";
    pub const APPROVAL_WORKFLOW: &str = "approval_workflow";
    pub const AUTHENTICATION: &str = "authentication";
    pub const SYSTEM: &str = "system";
}

// Common entity types
#[allow(non_snake_case)]
pub mod EntityType {
    pub const USER: &str = "user";
    pub const COMPANY: &str = "company";
    pub const WORKER: &str = "worker";
    pub const LICENSE: &str = "license";
    pub const COMPANY_DOCUMENT: &str = "company_document";
    pub const APPROVAL_REQUEST: &str = "approval_request";
}

// Common actions
#[allow(non_snake_case)]
pub mod Action {
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";
    pub const LOGIN: &str = "login";
    pub const SWITCH_COMPANY: &str = "switch_company";
    pub const PASSWORD_CHANGED: &str = "password_changed";
    pub const MEMBER_ADDED: &str = "member_added";
    pub const MEMBER_REMOVED: &str = "member_removed";
    pub const ROLE_CHANGED: &str = "role_changed";
    pub const GRANTED: &str = "granted";
    pub const REVOKED: &str = "revoked";
    pub const REQUESTED: &str = "requested";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const CANCELLED: &str = "cancelled";
    pub const EXPIRY_ALERT: &str = "expiry_alert";
}

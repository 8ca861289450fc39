use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub key: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPermission {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub key: String,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionsInput {
    pub keys: Vec<String>,
}

// Permission catalogue; must match the seed migration
#[allow(non_snake_case)]
pub mod PermissionKey {
    pub const COMPANIES_UPDATE: &str = "companies.update";
    pub const WORKERS_VIEW: &str = "workers.view";
    pub const WORKERS_CREATE: &str = "workers.create";
    pub const WORKERS_UPDATE: &str = "workers.update";
    pub const WORKERS_DELETE: &str = "workers.delete";
    pub const LICENSES_VIEW: &str = "licenses.view";
    pub const LICENSES_CREATE: &str = "licenses.create";
    pub const LICENSES_UPDATE: &str = "licenses.update";
    pub const LICENSES_DELETE: &str = "licenses.delete";
    pub const DOCUMENTS_VIEW: &str = "documents.view";
    pub const DOCUMENTS_CREATE: &str = "documents.create";
    pub const DOCUMENTS_UPDATE: &str = "documents.update";
    pub const DOCUMENTS_DELETE: &str = "documents.delete";
    pub const PERMISSIONS_MANAGE: &str = "permissions.manage";
    pub const APPROVALS_REVIEW: &str = "approvals.review";
    pub const APPROVALS_BYPASS: &str = "approvals.bypass";
    pub const ACTIVITY_VIEW: &str = "activity.view";
    pub const NOTIFICATIONS_VIEW: &str = "notifications.view";

    pub const ALL: &[&str] = &[
        COMPANIES_UPDATE,
        WORKERS_VIEW,
        WORKERS_CREATE,
        WORKERS_UPDATE,
        WORKERS_DELETE,
        LICENSES_VIEW,
        LICENSES_CREATE,
        LICENSES_UPDATE,
        LICENSES_DELETE,
        DOCUMENTS_VIEW,
        DOCUMENTS_CREATE,
        DOCUMENTS_UPDATE,
        DOCUMENTS_DELETE,
        PERMISSIONS_MANAGE,
        APPROVALS_REVIEW,
        APPROVALS_BYPASS,
        ACTIVITY_VIEW,
        NOTIFICATIONS_VIEW,
    ];

    pub fn is_known(key: &str) -> bool {
        ALL.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_keys_are_unique_and_dotted() {
        let mut keys = PermissionKey::ALL.to_vec();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), PermissionKey::ALL.len());
        assert!(PermissionKey::ALL.iter().all(|k| k.contains('.')));
    }

    #[test]
    fn test_is_known() {
        assert!(PermissionKey::is_known("workers.delete"));
        assert!(!PermissionKey::is_known("workers.fly"));
    }
}

use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::{
    models::{ActivityType, EntityType, NewActivity},
    repositories::activity as activity_repo,
};
use crate::middleware::request_info::RequestInfo;

/// Generic activity logging. `req_info` is `None` for background jobs.
#[allow(clippy::too_many_arguments)]
pub async fn log_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    activity_type: &str,
    entity_type: &str,
    entity_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: Option<&RequestInfo>,
) -> Result<(), sqlx::Error> {
    let input = NewActivity {
        company_id,
        user_id,
        activity_type: activity_type.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        action: action.to_string(),
        description,
        metadata: metadata.map(|pairs| serde_json::Value::Object(pairs.into_iter().collect())),
        ip_address: req_info.map(|info| info.ip_address.clone()),
        user_agent: req_info.map(|info| info.user_agent.clone()),
    };

    activity_repo::log_activity(tx, input).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn log_company_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    entity_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: &RequestInfo,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::COMPANY_MANAGEMENT,
        EntityType::COMPANY,
        entity_id,
        action,
        description,
        metadata,
        Some(req_info),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn log_worker_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    worker_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: Option<&RequestInfo>,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::WORKER_MANAGEMENT,
        EntityType::WORKER,
        worker_id,
        action,
        description,
        metadata,
        req_info,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn log_license_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    license_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: Option<&RequestInfo>,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::LICENSE_MANAGEMENT,
        EntityType::LICENSE,
        license_id,
        action,
        description,
        metadata,
        req_info,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn log_document_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    document_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: Option<&RequestInfo>,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::DOCUMENT_MANAGEMENT,
        EntityType::COMPANY_DOCUMENT,
        document_id,
        action,
        description,
        metadata,
        req_info,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn log_permission_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    target_user_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: &RequestInfo,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::PERMISSION_MANAGEMENT,
        EntityType::USER,
        target_user_id,
        action,
        description,
        metadata,
        Some(req_info),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn log_approval_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Option<Uuid>,
    request_id: Uuid,
    action: &str,
    description: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
    req_info: &RequestInfo,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        user_id,
        ActivityType::APPROVAL_WORKFLOW,
        EntityType::APPROVAL_REQUEST,
        request_id,
        action,
        description,
        metadata,
        Some(req_info),
    )
    .await
}

/// Authentication events are recorded against the company the session lands in
pub async fn log_auth_activity(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Uuid,
    action: &str,
    description: String,
    req_info: &RequestInfo,
) -> Result<(), sqlx::Error> {
    log_activity(
        tx,
        company_id,
        Some(user_id),
        ActivityType::AUTHENTICATION,
        EntityType::USER,
        user_id,
        action,
        description,
        None,
        Some(req_info),
    )
    .await
}

pub fn metadata(pairs: Vec<(&str, String)>) -> HashMap<String, serde_json::Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builds_string_values() {
        let map = metadata(vec![("worker_id", "abc".to_string()), ("name", "Ana".to_string())]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["worker_id"], serde_json::json!("abc"));
    }
}

use moka::future::Cache;
use std::{collections::HashSet, sync::{Arc, LazyLock}, time::Duration};
use uuid::Uuid;

use crate::database::repositories::permission as permission_repo;

const PERMISSION_TTL_SECS: u64 = 300;

type PermissionSet = Arc<HashSet<String>>;

static PERMISSION_CACHE: LazyLock<Cache<(Uuid, Uuid), PermissionSet>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(PERMISSION_TTL_SECS))
        .build()
});

/// Granted keys for a user in a company, served from cache when fresh
pub async fn keys_for(user_id: Uuid, company_id: Uuid) -> Result<PermissionSet, sqlx::Error> {
    let key = (user_id, company_id);
    if let Some(keys) = PERMISSION_CACHE.get(&key).await {
        return Ok(keys);
    }

    let keys: PermissionSet = Arc::new(
        permission_repo::find_keys_for_user(user_id, company_id)
            .await?
            .into_iter()
            .collect(),
    );
    PERMISSION_CACHE.insert(key, keys.clone()).await;

    Ok(keys)
}

/// Drop the cached grants after they change
pub async fn invalidate(user_id: Uuid, company_id: Uuid) {
    PERMISSION_CACHE.invalidate(&(user_id, company_id)).await;
    log::debug!("Invalidated permissions for user {} in company {}", user_id, company_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_entry_is_returned_and_invalidated() {
        let key = (Uuid::new_v4(), Uuid::new_v4());
        let keys: PermissionSet = Arc::new(["workers.view".to_string()].into_iter().collect());
        PERMISSION_CACHE.insert(key, keys).await;

        let cached = PERMISSION_CACHE.get(&key).await.unwrap();
        assert!(cached.contains("workers.view"));

        invalidate(key.0, key.1).await;
        assert!(PERMISSION_CACHE.get(&key).await.is_none());
    }
}

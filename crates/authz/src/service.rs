use crate::catalog;
use crate::error::Result;
use gymdesk_cache::{permission_cache_key, Cache};
use gymdesk_database::PermissionRepository;
use gymdesk_models::UserRole;
use sqlx::PgPool;

// Role grants change rarely but admin edits must show up fast
const PERMISSION_CACHE_TTL_SECS: usize = 5;

#[derive(Clone)]
pub struct PermissionService {
    repository: PermissionRepository,
    cache: Cache,
}

impl PermissionService {
    pub fn new(pool: PgPool, cache: Cache) -> Self {
        Self {
            repository: PermissionRepository::new(pool),
            cache,
        }
    }

    /// Write the catalog and role grants to the database. Runs on every
    /// startup; upserts make it idempotent.
    pub async fn seed_catalog(&self) -> Result<()> {
        for permission in catalog::all_permissions() {
            self.repository.upsert(&permission).await?;
        }

        for role in [UserRole::Admin, UserRole::Trainer, UserRole::Member] {
            for name in catalog::grants_for(role) {
                self.repository.grant_to_role(role, name).await?;
            }
        }

        tracing::info!("Permission catalog seeded");
        Ok(())
    }

    /// Permission names granted to a role, cached briefly so the request
    /// gate does not hit Postgres every time. Cache trouble falls back to
    /// a direct read.
    pub async fn permissions_for_role(&self, role: UserRole) -> Result<Vec<String>> {
        let cache_key = permission_cache_key(&role.to_string());

        match self.cache.get::<Vec<String>>(&cache_key).await {
            Ok(Some(names)) => return Ok(names),
            Ok(None) => {}
            Err(e) => tracing::warn!("Permission cache read failed: {}", e),
        }

        let names = self.repository.names_for_role(role).await?;

        if let Err(e) = self
            .cache
            .set(&cache_key, &names, Some(PERMISSION_CACHE_TTL_SECS))
            .await
        {
            tracing::warn!("Permission cache write failed: {}", e);
        }

        Ok(names)
    }

    pub async fn role_has_permission(&self, role: UserRole, permission: &str) -> Result<bool> {
        let names = self.permissions_for_role(role).await?;
        Ok(names.iter().any(|n| n == permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymdesk_cache::CacheConfig;
    use gymdesk_database::{Database, DatabaseConfig};

    async fn test_service() -> PermissionService {
        let db = Database::new(DatabaseConfig::from_env())
            .await
            .expect("Failed to connect to database");
        let cache = Cache::new(CacheConfig::from_env())
            .await
            .expect("Failed to connect to Redis");

        PermissionService::new(db.pool().clone(), cache)
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn seeding_twice_is_safe() {
        let svc = test_service().await;
        svc.seed_catalog().await.unwrap();
        svc.seed_catalog().await.unwrap();

        let admin = svc.permissions_for_role(UserRole::Admin).await.unwrap();
        assert_eq!(admin.len(), catalog::all_permissions().len());
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn trainer_grants_match_the_catalog() {
        let svc = test_service().await;
        svc.seed_catalog().await.unwrap();

        assert!(svc
            .role_has_permission(UserRole::Trainer, "members.view")
            .await
            .unwrap());
        assert!(!svc
            .role_has_permission(UserRole::Trainer, "payments.view")
            .await
            .unwrap());
        assert!(!svc
            .role_has_permission(UserRole::Member, "members.view")
            .await
            .unwrap());
    }
}

// ============================================================================
// CACHE KEY SERVICE
// ============================================================================
// Purpose: entry point for callers. Resolves namespaces, composes keys,
// rotates namespace tokens and passes content reads/writes to the store.
// ============================================================================

use crate::composer::KeyComposer;
use crate::config::CacheKeyConfig;
use crate::error::{CacheKeyError, Result, StoreError};
use crate::namespace::{NamespaceRegistry, NamespaceToken};
use crate::store::{KvStore, ReadPreference};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct CacheKeyService {
    config: Arc<CacheKeyConfig>,
    store: Arc<dyn KvStore>,
    registry: NamespaceRegistry,
    composer: KeyComposer,
}

impl CacheKeyService {
    pub fn new(store: Arc<dyn KvStore>, config: CacheKeyConfig) -> Result<Self> {
        config.validate()?;

        let registry = NamespaceRegistry::new(store.clone(), &config);
        let composer = KeyComposer::new(*registry.hasher());

        info!(
            prefix = %config.cache_prefix,
            instance = %config.cache_instance,
            project = %config.project_name,
            ttl = config.cache_time,
            digest = ?config.digest,
            "🎯 Cache key service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            registry,
            composer,
        })
    }

    pub fn config(&self) -> &CacheKeyConfig {
        &self.config
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    fn project_or_default<'a>(&'a self, project: &'a str) -> &'a str {
        if project.is_empty() {
            self.config.project_name.as_str()
        } else {
            project
        }
    }

    /// Cache key for `business` under `project` (configured default when empty).
    ///
    /// `param` is hashed into a trailing segment when non-empty.
    pub async fn get_cache_key(&self, business: &str, param: &str, project: &str) -> Result<String> {
        if business.is_empty() {
            return Err(CacheKeyError::invalid_argument("business name must not be empty"));
        }
        let project = self.project_or_default(project);

        let namespaces = self.registry.resolve(project, business).await?;
        self.composer.build(
            &self.config.cache_prefix,
            Some(&namespaces.project),
            Some(&namespaces.business),
            business,
            param,
        )
    }

    /// Invalidate every key of `project` by rotating its token.
    pub async fn refresh_project_namespace(&self, project: &str) -> Result<NamespaceToken> {
        let project = self.project_or_default(project);
        let token = self.registry.refresh_project(project).await?;
        info!(project = %project, token = %token, "Project namespace refreshed");
        Ok(token)
    }

    /// Invalidate every key of `business` within `project`.
    pub async fn refresh_business_namespace(
        &self,
        business: &str,
        project: &str,
    ) -> Result<NamespaceToken> {
        if business.is_empty() {
            return Err(CacheKeyError::invalid_argument("business name must not be empty"));
        }
        let project = self.project_or_default(project);
        let token = self.registry.refresh_business(business, project).await?;
        info!(project = %project, business = %business, token = %token, "Business namespace refreshed");
        Ok(token)
    }

    pub async fn get_content(&self, key: &str, preference: ReadPreference) -> Result<Option<String>> {
        let keys = [key.to_string()];
        let mut values = self
            .store
            .multi_get(&self.config.cache_instance, preference, &keys)
            .await
            .map_err(|e| {
                error!(key = %key, "Cache content read failed: {}", e);
                e
            })?;

        if values.len() != 1 {
            error!(key = %key, returned = values.len(), "Cache content read misaligned");
            return Err(StoreError::unavailable(format!(
                "expected 1 value for {}, store returned {}",
                key,
                values.len()
            ))
            .into());
        }
        let value = values.pop().flatten();
        debug!(key = %key, hit = value.is_some(), "Cache content lookup");
        Ok(value)
    }

    pub async fn set_content(&self, key: &str, ttl_seconds: u64, content: &str) -> Result<bool> {
        if ttl_seconds == 0 {
            return Err(CacheKeyError::invalid_argument("content TTL must be greater than zero"));
        }
        let stored = self
            .store
            .set_with_expiry(&self.config.cache_instance, key, ttl_seconds, content)
            .await
            .map_err(|e| {
                error!(key = %key, "Cache content write failed: {}", e);
                e
            })?;
        Ok(stored)
    }

    pub async fn delete_content(&self, keys: &[String]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let deleted = self
            .store
            .multi_delete(&self.config.cache_instance, keys)
            .await?;
        Ok(deleted)
    }

    pub async fn get_json<T>(&self, key: &str, preference: ReadPreference) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get_content(key, preference).await? {
            Some(serialized) => Ok(Some(serde_json::from_str(&serialized)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &str, ttl_seconds: u64, value: &T) -> Result<bool>
    where
        T: Serialize,
    {
        let serialized = serde_json::to_string(value)?;
        self.set_content(key, ttl_seconds, &serialized).await
    }
}

// ============================================================================
// REDIS KV STORE
// ============================================================================
// Purpose: named Redis connections (primary + optional replica) behind KvStore
// ============================================================================

use super::{KvStore, ReadPreference};
use crate::config::{RedisInstanceConfig, StoreConfig};
use crate::error::StoreError;
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct InstancePools {
    primary: Pool,
    replica: Option<Pool>,
}

#[derive(Clone)]
pub struct RedisKvStore {
    instances: HashMap<String, InstancePools>,
}

impl RedisKvStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut instances = HashMap::with_capacity(config.instances.len());

        for instance in &config.instances {
            let pools = Self::create_instance_pools(instance, config.pool_size)?;
            info!(
                instance = %instance.name,
                replica = instance.replica_url.is_some(),
                pool_size = config.pool_size,
                "🔌 Redis instance registered"
            );
            instances.insert(instance.name.clone(), pools);
        }

        Ok(Self { instances })
    }

    fn create_instance_pools(
        instance: &RedisInstanceConfig,
        pool_size: usize,
    ) -> Result<InstancePools, StoreError> {
        let primary = Self::create_pool(&instance.primary_url, pool_size)?;
        let replica = match &instance.replica_url {
            Some(url) => Some(Self::create_pool(url, pool_size)?),
            None => None,
        };
        Ok(InstancePools { primary, replica })
    }

    fn create_pool(url: &str, pool_size: usize) -> Result<Pool, StoreError> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(pool_size));
        config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::pool(format!("Failed to create Redis pool: {}", e)))
    }

    fn pool(&self, instance: &str, preference: ReadPreference) -> Result<&Pool, StoreError> {
        let pools = self
            .instances
            .get(instance)
            .ok_or_else(|| StoreError::unknown_instance(instance))?;

        match (preference, &pools.replica) {
            (ReadPreference::Replica, Some(replica)) => Ok(replica),
            _ => Ok(&pools.primary),
        }
    }

    /// Get a Redis connection from the pool
    async fn get_connection(
        &self,
        instance: &str,
        preference: ReadPreference,
    ) -> Result<Connection, StoreError> {
        self.pool(instance, preference)?.get().await.map_err(|e| {
            error!(instance = %instance, "Failed to get Redis connection: {}", e);
            StoreError::from(e)
        })
    }

    /// PING every registered pool, primary and replica.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        for (name, pools) in &self.instances {
            let targets = std::iter::once(&pools.primary).chain(pools.replica.as_ref());
            for pool in targets {
                let mut conn = pool.get().await?;
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                debug!(instance = %name, reply = %pong, "Redis health check");
            }
        }
        Ok(())
    }

    pub fn instance_names(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn multi_get(
        &self,
        instance: &str,
        preference: ReadPreference,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.get_connection(instance, preference).await?;
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let values: Vec<Option<String>> = cmd.query_async(&mut conn).await?;

        Ok(values)
    }

    async fn set_with_expiry(
        &self,
        instance: &str,
        key: &str,
        ttl_seconds: u64,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self
            .get_connection(instance, ReadPreference::Primary)
            .await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;

        debug!(
            instance = %instance,
            key = %key,
            ttl = ttl_seconds,
            "🔑 Redis key set with TTL"
        );

        Ok(true)
    }

    async fn multi_delete(&self, instance: &str, keys: &[String]) -> Result<bool, StoreError> {
        if keys.is_empty() {
            return Ok(false);
        }

        let mut conn = self
            .get_connection(instance, ReadPreference::Primary)
            .await?;
        let deleted: i64 = conn.del(keys.to_vec()).await?;

        if deleted == 0 {
            warn!(instance = %instance, requested = keys.len(), "No Redis keys deleted");
        } else {
            info!(
                instance = %instance,
                requested = keys.len(),
                deleted = deleted,
                "🗑️ Redis keys deleted"
            );
        }

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_config() -> StoreConfig {
        StoreConfig {
            instances: vec![
                RedisInstanceConfig {
                    name: "default".to_string(),
                    primary_url: "redis://127.0.0.1:6379/0".to_string(),
                    replica_url: Some("redis://127.0.0.1:6380/0".to_string()),
                },
                RedisInstanceConfig {
                    name: "sessions".to_string(),
                    primary_url: "redis://127.0.0.1:6379/1".to_string(),
                    replica_url: None,
                },
            ],
            pool_size: 4,
        }
    }

    #[tokio::test]
    async fn test_registers_every_instance() {
        let store = RedisKvStore::new(&store_config()).unwrap();
        let mut names = store.instance_names();
        names.sort_unstable();
        assert_eq!(names, vec!["default", "sessions"]);
    }

    #[tokio::test]
    async fn test_unknown_instance_is_rejected() {
        let store = RedisKvStore::new(&store_config()).unwrap();
        let err = store.pool("missing", ReadPreference::Primary).err().unwrap();
        assert!(matches!(err, StoreError::UnknownInstance { instance } if instance == "missing"));
    }

    #[tokio::test]
    async fn test_replica_read_falls_back_to_primary() {
        let store = RedisKvStore::new(&store_config()).unwrap();

        let primary = store.pool("sessions", ReadPreference::Primary).unwrap() as *const Pool;
        let replica = store.pool("sessions", ReadPreference::Replica).unwrap() as *const Pool;
        assert_eq!(primary, replica);

        let primary = store.pool("default", ReadPreference::Primary).unwrap() as *const Pool;
        let replica = store.pool("default", ReadPreference::Replica).unwrap() as *const Pool;
        assert_ne!(primary, replica);
    }

    #[tokio::test]
    async fn test_empty_batches_skip_the_connection() {
        let store = RedisKvStore::new(&store_config()).unwrap();
        assert!(store
            .multi_get("default", ReadPreference::Replica, &[])
            .await
            .unwrap()
            .is_empty());
        assert!(!store.multi_delete("default", &[]).await.unwrap());
    }
}

//! Configuration for the cache key service and its Redis instances

use crate::error::{CacheKeyError, Result};
use crate::hasher::DigestWidth;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_CACHE_INSTANCE: &str = "default";
pub const DEFAULT_CACHE_TIME_SECONDS: u64 = 86400; // 24 hours
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Per-service settings. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeyConfig {
    /// Root of every namespace key and cache key
    pub cache_prefix: String,
    /// Logical store connection used for namespace tokens and content
    pub cache_instance: String,
    /// Project used when a caller passes an empty project name
    pub project_name: String,
    /// Default namespace token TTL in seconds
    pub cache_time: u64,
    #[serde(default)]
    pub digest: DigestWidth,
}

impl CacheKeyConfig {
    pub fn new(cache_prefix: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            cache_prefix: cache_prefix.into(),
            cache_instance: DEFAULT_CACHE_INSTANCE.to_string(),
            project_name: project_name.into(),
            cache_time: DEFAULT_CACHE_TIME_SECONDS,
            digest: DigestWidth::default(),
        }
    }

    pub fn with_instance(mut self, cache_instance: impl Into<String>) -> Self {
        self.cache_instance = cache_instance.into();
        self
    }

    pub fn with_cache_time(mut self, cache_time: u64) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn with_digest(mut self, digest: DigestWidth) -> Self {
        self.digest = digest;
        self
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = CacheKeyConfig {
            cache_prefix: env::var("CACHE_PREFIX")
                .map_err(|_| CacheKeyError::configuration("CACHE_PREFIX must be set"))?,
            cache_instance: env::var("CACHE_INSTANCE")
                .unwrap_or_else(|_| DEFAULT_CACHE_INSTANCE.to_string()),
            project_name: env::var("CACHE_PROJECT_NAME").unwrap_or_default(),
            cache_time: parse_env("CACHE_TIME_SECONDS", DEFAULT_CACHE_TIME_SECONDS)?,
            digest: match env::var("CACHE_DIGEST") {
                Ok(value) => value.parse().map_err(CacheKeyError::configuration)?,
                Err(_) => DigestWidth::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_prefix.is_empty() {
            return Err(CacheKeyError::configuration("cache_prefix must not be empty"));
        }
        if self.cache_instance.is_empty() {
            return Err(CacheKeyError::configuration("cache_instance must not be empty"));
        }
        // SETEX rejects a zero expiry
        if self.cache_time == 0 {
            return Err(CacheKeyError::configuration("cache_time must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisInstanceConfig {
    pub name: String,
    pub primary_url: String,
    pub replica_url: Option<String>,
}

/// Named Redis connections available to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub instances: Vec<RedisInstanceConfig>,
    pub pool_size: usize,
}

impl StoreConfig {
    /// Reads `CACHE_REDIS_INSTANCES` (comma separated names, default `default`)
    /// and for each name `REDIS_URL_<NAME>` / `REDIS_REPLICA_URL_<NAME>`.
    /// The `default` instance also accepts plain `REDIS_URL` / `REDIS_REPLICA_URL`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let names = env::var("CACHE_REDIS_INSTANCES")
            .unwrap_or_else(|_| DEFAULT_CACHE_INSTANCE.to_string());

        let mut instances = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let suffix = name.to_ascii_uppercase().replace('-', "_");
            let primary_url = env::var(format!("REDIS_URL_{}", suffix))
                .or_else(|e| {
                    if name == DEFAULT_CACHE_INSTANCE {
                        env::var("REDIS_URL")
                    } else {
                        Err(e)
                    }
                })
                .map_err(|_| {
                    CacheKeyError::configuration(format!(
                        "REDIS_URL_{} must be set for instance '{}'",
                        suffix, name
                    ))
                })?;
            let replica_url = env::var(format!("REDIS_REPLICA_URL_{}", suffix))
                .ok()
                .or_else(|| {
                    if name == DEFAULT_CACHE_INSTANCE {
                        env::var("REDIS_REPLICA_URL").ok()
                    } else {
                        None
                    }
                });

            instances.push(RedisInstanceConfig {
                name: name.to_string(),
                primary_url,
                replica_url,
            });
        }

        if instances.is_empty() {
            return Err(CacheKeyError::configuration(
                "CACHE_REDIS_INSTANCES names no instance",
            ));
        }

        Ok(StoreConfig {
            instances,
            pool_size: parse_env("REDIS_POOL_SIZE", DEFAULT_POOL_SIZE)?,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|e| {
            CacheKeyError::configuration(format!("{} has invalid value '{}': {}", key, value, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CacheKeyConfig::new("qz", "qzone");
        assert_eq!(config.cache_instance, DEFAULT_CACHE_INSTANCE);
        assert_eq!(config.cache_time, DEFAULT_CACHE_TIME_SECONDS);
        assert_eq!(config.digest, DigestWidth::Crc32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_prefix_and_zero_ttl() {
        assert!(CacheKeyConfig::new("", "qzone").validate().is_err());
        assert!(CacheKeyConfig::new("qz", "qzone")
            .with_cache_time(0)
            .validate()
            .is_err());
        assert!(CacheKeyConfig::new("qz", "qzone")
            .with_instance("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_without_digest_uses_default() {
        let json = r#"{
            "cache_prefix": "qz",
            "cache_instance": "ns",
            "project_name": "qzone",
            "cache_time": 3600
        }"#;
        let config: CacheKeyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.digest, DigestWidth::Crc32);
        assert_eq!(config.cache_instance, "ns");
    }
}

//! Project and business namespace tokens.
//!
//! Every cache key embeds the current token of its project namespace and of
//! its business namespace. Overwriting a token orphans every key built from
//! the previous one, which is how a whole project or business operation gets
//! invalidated without touching individual keys.
//!
//! Namespace keys in the store:
//!
//! ```text
//! <prefix>:pns:rsid:<hash(project)>              = <epoch><rand>
//! <prefix>:bns:rsid:<hash(project.business)>     = <epoch><rand>
//! ```
//!
//! Token creation is not guarded. Two callers that find the same namespace
//! absent both write a token and the store keeps the last one; each caller
//! still composes a usable key from the token it wrote.

use crate::config::CacheKeyConfig;
use crate::error::{CacheKeyError, Result};
use crate::hasher::Hasher;
use crate::store::{KvStore, ReadPreference};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Project,
    Business,
}

impl NamespaceKind {
    fn segment(self) -> &'static str {
        match self {
            NamespaceKind::Project => "pns",
            NamespaceKind::Business => "bns",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceKind::Project => write!(f, "project"),
            NamespaceKind::Business => write!(f, "business"),
        }
    }
}

// Last token value handed out by this process
static LAST_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Current generation of a namespace: coarse epoch seconds plus four random digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceToken(String);

impl NamespaceToken {
    /// Tokens generated by one process are strictly increasing, so two
    /// generations within the same second never repeat locally. Across
    /// processes only the random suffix separates them.
    pub fn generate() -> Self {
        let suffix: u64 = rand::thread_rng().gen_range(1000..=9999);
        let candidate = Utc::now().timestamp().max(0) as u64 * 10_000 + suffix;
        let previous = LAST_TOKEN
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Self(candidate.max(previous + 1).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for NamespaceToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NamespaceToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NamespaceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Both tokens needed to compose a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNamespaces {
    pub project: NamespaceToken,
    pub business: NamespaceToken,
}

/// Business namespaces are always scoped by project so that the same
/// business name under two projects never shares a token.
pub fn scoped_business(project: &str, business: &str) -> String {
    format!("{}.{}", project, business)
}

#[derive(Clone)]
pub struct NamespaceRegistry {
    store: Arc<dyn KvStore>,
    hasher: Hasher,
    prefix: String,
    instance: String,
    default_ttl: u64,
}

impl NamespaceRegistry {
    pub fn new(store: Arc<dyn KvStore>, config: &CacheKeyConfig) -> Self {
        Self {
            store,
            hasher: Hasher::new(config.digest),
            prefix: config.cache_prefix.clone(),
            instance: config.cache_instance.clone(),
            default_ttl: config.cache_time,
        }
    }

    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Store key holding the token of `resource_id`.
    ///
    /// For the business kind `resource_id` must already be project scoped.
    pub fn namespace_key(&self, kind: NamespaceKind, resource_id: &str) -> String {
        let mut key = format!("{}:{}", self.prefix, kind.segment());
        if !resource_id.is_empty() {
            key.push_str(":rsid:");
            key.push_str(&self.hasher.hash(resource_id));
        }
        key
    }

    /// Read both tokens in one batch, creating whichever is missing.
    pub async fn resolve(&self, project: &str, business: &str) -> Result<ResolvedNamespaces> {
        if project.is_empty() || business.is_empty() {
            return Err(CacheKeyError::invalid_argument(
                "project and business names must not be empty",
            ));
        }

        let business_id = scoped_business(project, business);
        let keys = vec![
            self.namespace_key(NamespaceKind::Project, project),
            self.namespace_key(NamespaceKind::Business, &business_id),
        ];

        let values = self
            .store
            .multi_get(&self.instance, ReadPreference::Replica, &keys)
            .await
            .map_err(|e| {
                error!(project = %project, business = %business, "Namespace read failed: {}", e);
                CacheKeyError::namespace_unavailable(format!("namespace read failed: {}", e))
            })?;

        let [project_value, business_value]: [Option<String>; 2] =
            values.try_into().map_err(|values: Vec<Option<String>>| {
                CacheKeyError::namespace_unavailable(format!(
                    "expected 2 namespace values, store returned {}",
                    values.len()
                ))
            })?;

        let project_token = match project_value.filter(|v| !v.is_empty()) {
            Some(value) => NamespaceToken::from(value),
            None => {
                warn!(project = %project, key = %keys[0], "Project namespace missing, creating");
                self.create(NamespaceKind::Project, project, None).await?
            }
        };
        let business_token = match business_value.filter(|v| !v.is_empty()) {
            Some(value) => NamespaceToken::from(value),
            None => {
                warn!(business = %business_id, key = %keys[1], "Business namespace missing, creating");
                self.create(NamespaceKind::Business, &business_id, None)
                    .await?
            }
        };

        debug!(
            project = %project,
            business = %business,
            project_token = %project_token,
            business_token = %business_token,
            "Namespaces resolved"
        );

        Ok(ResolvedNamespaces {
            project: project_token,
            business: business_token,
        })
    }

    /// Generate and persist a fresh token for `resource_id`, overwriting any current one.
    ///
    /// `ttl` of `None` or zero falls back to the configured default.
    pub async fn create(
        &self,
        kind: NamespaceKind,
        resource_id: &str,
        ttl: Option<u64>,
    ) -> Result<NamespaceToken> {
        let key = self.namespace_key(kind, resource_id);
        let ttl = ttl.filter(|t| *t > 0).unwrap_or(self.default_ttl);
        let token = NamespaceToken::generate();

        let acknowledged = self
            .store
            .set_with_expiry(&self.instance, &key, ttl, token.as_str())
            .await
            .map_err(|e| {
                error!(kind = %kind, key = %key, "Namespace write failed: {}", e);
                CacheKeyError::store_write(&key, e.to_string())
            })?;

        if !acknowledged {
            error!(kind = %kind, key = %key, "Namespace write not acknowledged");
            return Err(CacheKeyError::store_write(&key, "write not acknowledged"));
        }

        info!(
            kind = %kind,
            key = %key,
            token = %token,
            ttl = ttl,
            "🔄 Namespace token created"
        );

        Ok(token)
    }

    pub async fn refresh_project(&self, project: &str) -> Result<NamespaceToken> {
        if project.is_empty() {
            return Err(CacheKeyError::invalid_argument("project name must not be empty"));
        }
        self.create(NamespaceKind::Project, project, None).await
    }

    pub async fn refresh_business(&self, business: &str, project: &str) -> Result<NamespaceToken> {
        if business.is_empty() || project.is_empty() {
            return Err(CacheKeyError::invalid_argument(
                "project and business names must not be empty",
            ));
        }
        self.create(
            NamespaceKind::Business,
            &scoped_business(project, business),
            None,
        )
        .await
    }
}

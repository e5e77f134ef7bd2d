// ============================================================================
// STORE MODULE - Key-value store capability used by the namespace registry
// ============================================================================

pub mod memory_store;
pub mod redis_store;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory_store::MemoryKvStore;
pub use redis_store::RedisKvStore;

/// Which side of a named connection serves a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPreference {
    Primary,
    #[default]
    Replica,
}

/// Batched key-value operations against a named logical connection.
///
/// Writes and deletes always go to the primary. Implementations must be safe to
/// share between tasks; callers hold them as `Arc<dyn KvStore>`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Values are position-aligned with `keys`; a missing key yields `None`.
    async fn multi_get(
        &self,
        instance: &str,
        preference: ReadPreference,
        keys: &[String],
    ) -> Result<Vec<Option<String>>, StoreError>;

    /// Store `value` under `key` for `ttl_seconds`. Returns the store's acknowledgement.
    async fn set_with_expiry(
        &self,
        instance: &str,
        key: &str,
        ttl_seconds: u64,
        value: &str,
    ) -> Result<bool, StoreError>;

    /// Returns `true` when at least one key was removed.
    async fn multi_delete(&self, instance: &str, keys: &[String]) -> Result<bool, StoreError>;
}

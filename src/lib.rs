//! Namespaced cache keys over a key-value store
//!
//! Every cache key embeds two version tokens, one for its project and one for
//! its business operation. Rotating a token invalidates every key built from
//! it in O(1), leaving the orphaned entries to the store's own expiry:
//! - Hashing of namespace identifiers and key parameters
//! - Namespace token registry (lazy creation, refresh)
//! - Cache key composition
//! - Redis and in-memory store backends

pub mod composer;
pub mod config;
pub mod error;
pub mod hasher;
pub mod namespace;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use composer::KeyComposer;
pub use config::{CacheKeyConfig, RedisInstanceConfig, StoreConfig};
pub use error::{CacheKeyError, Result, StoreError};
pub use hasher::{DigestWidth, Hasher};
pub use namespace::{NamespaceKind, NamespaceRegistry, NamespaceToken, ResolvedNamespaces};
pub use service::CacheKeyService;
pub use store::{KvStore, MemoryKvStore, ReadPreference, RedisKvStore};

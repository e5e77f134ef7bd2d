//! Error handling for namespace resolution, key composition and store access

pub type Result<T> = std::result::Result<T, CacheKeyError>;

/// Failures raised by a [`KvStore`](crate::store::KvStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection pool error: {message}")]
    Pool { message: String },

    #[error("Unknown store instance: {instance}")]
    UnknownInstance { instance: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }

    pub fn unknown_instance(instance: impl Into<String>) -> Self {
        Self::UnknownInstance {
            instance: instance.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::pool(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheKeyError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Namespace unavailable: {message}")]
    NamespaceUnavailable { message: String },

    #[error("Store write failed for {key}: {message}")]
    StoreWrite { key: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheKeyError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn namespace_unavailable(message: impl Into<String>) -> Self {
        Self::NamespaceUnavailable {
            message: message.into(),
        }
    }

    pub fn store_write(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CacheKeyError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            CacheKeyError::NamespaceUnavailable { .. } => "NAMESPACE_UNAVAILABLE",
            CacheKeyError::StoreWrite { .. } => "STORE_WRITE_FAILURE",
            CacheKeyError::Store(_) => "STORE_ERROR",
            CacheKeyError::Configuration { .. } => "CONFIG_ERROR",
            CacheKeyError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CacheKeyError::InvalidArgument { .. })
    }
}

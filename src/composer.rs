//! Cache key composition

use crate::error::{CacheKeyError, Result};
use crate::hasher::Hasher;
use crate::namespace::NamespaceToken;
use tracing::debug;

pub const KEY_DELIMITER: char = ':';

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyComposer {
    hasher: Hasher,
}

impl KeyComposer {
    pub fn new(hasher: Hasher) -> Self {
        Self { hasher }
    }

    /// `prefix:project_token:business_token:business_name[:hash(param)]`
    ///
    /// The parameter segment is only appended when `business_param` is non-empty.
    pub fn build(
        &self,
        prefix: &str,
        project_token: Option<&NamespaceToken>,
        business_token: Option<&NamespaceToken>,
        business_name: &str,
        business_param: &str,
    ) -> Result<String> {
        if business_name.is_empty() {
            return Err(CacheKeyError::invalid_argument("business name must not be empty"));
        }
        let (project_token, business_token) = match (project_token, business_token) {
            (Some(project), Some(business)) => (project, business),
            _ => {
                return Err(CacheKeyError::invalid_argument(
                    "both namespace tokens are required",
                ))
            }
        };

        let mut key = String::with_capacity(
            prefix.len() + project_token.as_str().len() + business_token.as_str().len()
                + business_name.len()
                + 32,
        );
        key.push_str(prefix);
        key.push(KEY_DELIMITER);
        key.push_str(project_token.as_str());
        key.push(KEY_DELIMITER);
        key.push_str(business_token.as_str());
        key.push(KEY_DELIMITER);
        key.push_str(business_name);
        if !business_param.is_empty() {
            key.push(KEY_DELIMITER);
            key.push_str(&self.hasher.hash(business_param));
        }

        debug!(key = %key, business = %business_name, "Cache key composed");
        Ok(key)
    }
}

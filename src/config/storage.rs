//! Backend connection configuration

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MEM_DSN_SCHEME;
use crate::constants::SLED_DSN_SCHEME;
use crate::storage::validate_namespace;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend connection string: `mem://` or `sled://<path>`
    #[serde(default = "default_dsn")]
    pub dsn: String,

    /// Logical partition of keys; materialized as table `dwatch_<namespace>`
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// How long a transaction waits for a row lock before giving up (in ms)
    #[serde(default = "default_lock_wait_timeout_ms")]
    pub lock_wait_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            namespace: default_namespace(),
            lock_wait_timeout_ms: default_lock_wait_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.dsn.starts_with(MEM_DSN_SCHEME) && !self.dsn.starts_with(SLED_DSN_SCHEME) {
            return Err(Error::InvalidConfig(format!(
                "storage.dsn `{}` must start with {} or {}",
                self.dsn, MEM_DSN_SCHEME, SLED_DSN_SCHEME
            )));
        }

        if self.dsn.starts_with(SLED_DSN_SCHEME) && self.dsn.len() == SLED_DSN_SCHEME.len() {
            return Err(Error::InvalidConfig("storage.dsn is missing the sled path".into()));
        }

        validate_namespace(&self.namespace)
            .map_err(|e| Error::InvalidConfig(format!("storage.namespace: {e}")))?;

        if self.lock_wait_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_wait_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_wait_timeout_ms)
    }
}

fn default_dsn() -> String {
    MEM_DSN_SCHEME.to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_lock_wait_timeout_ms() -> u64 {
    5000
}

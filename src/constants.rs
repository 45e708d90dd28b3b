// -
// Table namespaces

/// Every namespace is materialized as one table named `<prefix><namespace>`
pub(crate) const TABLE_NAME_PREFIX: &str = "dwatch_";

/// Version assigned to a record on its first committed write
pub(crate) const INITIAL_VERSION: u64 = 0;

/// Sentinel returned by `max_version` for a key without a row
pub(crate) const ABSENT_VERSION: u64 = 0;

/// Value written by a watcher that materializes a key it has never observed
pub(crate) const MATERIALIZED_VALUE: &str = "";

// -
// DSN schemes

pub(crate) const MEM_DSN_SCHEME: &str = "mem://";
pub(crate) const SLED_DSN_SCHEME: &str = "sled://";

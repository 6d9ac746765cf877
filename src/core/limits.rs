//! Security and resource limit constants for DoS prevention.

use std::time::Duration;

/// Maximum allowed configuration file size (5 MiB)
pub const MAX_CONFIG_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Default timeout for Git transport operations (clone, ref listing)
pub const GIT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the lightweight change-detection ref listing
pub const CHANGE_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for health-check clone attempts
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum concurrent load operations per provider
pub const MAX_CONCURRENT_OPERATIONS: i64 = 10;

/// Maximum active watch operations per provider
pub const MAX_ACTIVE_WATCHES: i64 = 5;

/// Default polling interval for watch operations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum polling interval (prevents excessive wait times)
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Minimum polling interval (prevents excessive remote calls)
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum configuration file path length
pub const MAX_PATH_LENGTH: usize = 1024;

/// Maximum configuration URL length
pub const MAX_URL_LENGTH: usize = 2048;

/// Default number of retries after a failed transport attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay between retry attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Cap on the backoff delay between retry attempts
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Days an account stays restorable after a soft delete
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Seconds between retention sweep runs (24 hours)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Delay before the first sweep after process start
pub const DEFAULT_SWEEP_STARTUP_DELAY_SECS: u64 = 30;

/// Bounded worker pool size for independent merge groups / sweep users
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Maximum rows returned per table by the consistency validator
pub const VALIDATOR_SAMPLE_LIMIT: usize = 5;

/// Header carrying the shared admin secret
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Identity provider request timeout in seconds
pub const IDENTITY_REQUEST_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a missing or empty user id
pub const ERR_EMPTY_USER_ID: &str = "User ID must not be empty";

/// Error message for a restore attempted past the cleanup deadline
pub const ERR_DEADLINE_PASSED: &str =
    "Retention deadline has passed - account data is scheduled for permanent cleanup";

/// Error message for a restore attempted after cleanup finished
pub const ERR_ALREADY_CLEANED_UP: &str =
    "Cleanup has already completed - the identity no longer exists";

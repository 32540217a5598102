//! Shared size limits for the sanitizer battery.
//!
//! These are behavioral contracts, not tuning knobs: widening them changes
//! what downstream audit-consuming tools can assume about input shape.

pub const MAX_INPUT_LENGTH: usize = 1000;
pub const MAX_BRANCH_NAME_LENGTH: usize = 255;
pub const MAX_COMMIT_MESSAGE_LENGTH: usize = 10_000;
pub const MAX_REMOTE_URL_LENGTH: usize = 2048;
pub const MAX_REPO_PATH_LENGTH: usize = 4096;

/// Reserved Git ref names that can never be a valid branch.
pub const RESERVED_BRANCH_NAMES: &[&str] = &["HEAD", "FETCH_HEAD", "ORIG_HEAD", "ORIGIN_HEAD"];

/// Worker heartbeat staleness threshold before a worker is unhealthy.
pub const WORKER_HEARTBEAT_TIMEOUT_SECS: i64 = 30;

/// Supervisor loop cadence.
pub const SUPERVISOR_INTERVAL_SECS: u64 = 5;

/// Default audit ring capacity.
pub const DEFAULT_MAX_MEMORY_EVENTS: usize = 1000;

/// Default audit file rotation size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default audit rotation backup count.
pub const DEFAULT_BACKUP_COUNT: u32 = 5;

//! Environment-driven configuration for the execution substrate.
//!
//! Loading `.env` files, CLI flags, and package wiring are out of scope;
//! this is the `Config` type the rest of the core reads its tuning knobs
//! from.

use std::env;

use crate::constants::{
    DEFAULT_BACKUP_COUNT, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_MEMORY_EVENTS,
};

const TASK_QUEUE_MAX_SIZE: usize = 1000;
const TASK_QUEUE_MAX_CONCURRENT: usize = 10;
const TASK_QUEUE_MAX_RETRIES: u32 = 3;

const POOL_MIN_WORKERS: usize = 2;
const POOL_MAX_WORKERS: usize = 10;
const POOL_MAX_TASKS_PER_WORKER: u64 = 100;
const POOL_SCALE_UP_THRESHOLD: f64 = 0.8;
const POOL_SCALE_DOWN_THRESHOLD: f64 = 0.3;
const POOL_SCALE_INTERVAL_SECS: u64 = 30;
const POOL_STALE_TASK_TIMEOUT_SECS: u64 = 600;
const POOL_JOB_CHANNEL_CAPACITY: usize = 1000;

/// Queue/pool/audit/sanitizer tuning knobs, loaded from the process
/// environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub queue_max_size: usize,
    pub queue_max_concurrent: usize,
    pub queue_max_retries: u32,

    pub pool_min_workers: usize,
    pub pool_max_workers: usize,
    pub pool_max_tasks_per_worker: u64,
    pub pool_scale_up_threshold: f64,
    pub pool_scale_down_threshold: f64,
    pub pool_scale_interval_secs: u64,
    pub pool_stale_task_timeout_secs: u64,
    /// Bound on the pool's internal job channel, so `submit_task` can honor
    /// its documented `false`-on-full contract instead of blocking forever.
    pub pool_job_channel_capacity: usize,

    /// Base directory all workspace-relative paths are sanitized against.
    pub workspace_root: String,

    pub audit_log_path: String,
    pub audit_max_file_size_bytes: u64,
    pub audit_backup_count: u32,
    pub audit_max_memory_events: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let queue_max_size = env_parse("QUEUE_MAX_SIZE", TASK_QUEUE_MAX_SIZE)?;
        let queue_max_concurrent = env_parse("QUEUE_MAX_CONCURRENT", TASK_QUEUE_MAX_CONCURRENT)?;
        let queue_max_retries = env_parse("QUEUE_MAX_RETRIES", TASK_QUEUE_MAX_RETRIES)?;

        let pool_min_workers = env_parse("POOL_MIN_WORKERS", POOL_MIN_WORKERS)?;
        let pool_max_workers = env_parse("POOL_MAX_WORKERS", POOL_MAX_WORKERS)?;
        if pool_min_workers > pool_max_workers {
            return Err(anyhow::anyhow!(
                "POOL_MIN_WORKERS ({pool_min_workers}) cannot exceed POOL_MAX_WORKERS ({pool_max_workers})"
            ));
        }

        Ok(Self {
            queue_max_size,
            queue_max_concurrent,
            queue_max_retries,

            pool_min_workers,
            pool_max_workers,
            pool_max_tasks_per_worker: env_parse(
                "POOL_MAX_TASKS_PER_WORKER",
                POOL_MAX_TASKS_PER_WORKER,
            )?,
            pool_scale_up_threshold: env_parse(
                "POOL_SCALE_UP_THRESHOLD",
                POOL_SCALE_UP_THRESHOLD,
            )?,
            pool_scale_down_threshold: env_parse(
                "POOL_SCALE_DOWN_THRESHOLD",
                POOL_SCALE_DOWN_THRESHOLD,
            )?,
            pool_scale_interval_secs: env_parse(
                "POOL_SCALE_INTERVAL_SECS",
                POOL_SCALE_INTERVAL_SECS,
            )?,
            pool_stale_task_timeout_secs: env_parse(
                "POOL_STALE_TASK_TIMEOUT_SECS",
                POOL_STALE_TASK_TIMEOUT_SECS,
            )?,
            pool_job_channel_capacity: env_parse(
                "POOL_JOB_CHANNEL_CAPACITY",
                POOL_JOB_CHANNEL_CAPACITY,
            )?,

            workspace_root: env::var("WORKSPACE_ROOT").unwrap_or_else(|_| "./workspaces".to_string()),

            audit_log_path: env::var("AUDIT_LOG_PATH").unwrap_or_else(|_| "audit.log".to_string()),
            audit_max_file_size_bytes: env_parse(
                "AUDIT_MAX_FILE_SIZE_BYTES",
                DEFAULT_MAX_FILE_SIZE_BYTES,
            )?,
            audit_backup_count: env_parse("AUDIT_BACKUP_COUNT", DEFAULT_BACKUP_COUNT)?,
            audit_max_memory_events: env_parse(
                "AUDIT_MAX_MEMORY_EVENTS",
                DEFAULT_MAX_MEMORY_EVENTS,
            )?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid value: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        // SAFETY: test runs single-threaded within this module; no other
        // test in this crate mutates these specific env vars.
        unsafe {
            env::remove_var("POOL_MIN_WORKERS");
            env::remove_var("POOL_MAX_WORKERS");
        }
        let config = Config::from_env().unwrap();
        assert!(config.pool_min_workers <= config.pool_max_workers);
    }
}

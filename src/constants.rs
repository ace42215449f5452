//! Application-wide constants.
//!
//! Centralized policy values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Returns the git command timeout.
///
/// Can be customized via the GIT_DAILY_PULL_TIMEOUT environment variable (in seconds).
/// Falls back to 120 seconds if not set or invalid.
///
/// Example: `GIT_DAILY_PULL_TIMEOUT=300 git-daily-pull run`
pub fn git_timeout() -> Duration {
    std::env::var("GIT_DAILY_PULL_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Maximum number of bytes captured per output stream of a git command.
pub const MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024;

/// How deep below a root folder the locator looks for repositories.
/// The root itself is depth 0.
pub const MAX_SCAN_DEPTH: usize = 3;

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Message attached to stash entries created before a pull.
pub const STASH_MESSAGE: &str = "git-daily-pull";

/// Number of run records kept in the history.
pub const HISTORY_LIMIT: usize = 50;

/// Default local time of day for the scheduled run.
pub const DEFAULT_RUN_AT: &str = "09:30";

/// How often the scheduler checks whether the daily run is due.
pub const SCHEDULER_TICK: Duration = Duration::from_secs(60);

/// How often the abort watcher looks for a pending request.
pub const ABORT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Progress bar tick interval in milliseconds.
/// Controls how often the spinner/bar animates.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Default name used when a repository name cannot be determined from its path.
pub const DEFAULT_REPO_NAME: &str = "repository";

/// Directory name used for config and state files.
pub const APP_DIR: &str = "git-daily-pull";

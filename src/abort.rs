//! Cooperative cancellation of a run.
//!
//! A run checks its [`AbortToken`] between repositories. Requests reach the
//! token through an [`AbortGate`], which only accepts callers that know the
//! configured secret. Across processes a request travels as a small file
//! next to the state file, picked up by [`spawn_request_watcher`].

use crate::constants::ABORT_POLL_INTERVAL;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag for one run.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    requested: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Returns whether an abort was pending and clears it.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Authenticates abort requests against the configured secret.
#[derive(Debug, Clone, Default)]
pub struct AbortGate {
    secret: Option<String>,
}

impl AbortGate {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Sets the token when `supplied` matches the secret.
    ///
    /// Returns `false` and leaves the token untouched otherwise, including
    /// when no secret is configured.
    pub fn request_abort(&self, token: &AbortToken, supplied: &str) -> bool {
        match &self.secret {
            Some(secret) if secret == supplied => {
                token.request();
                true
            }
            _ => false,
        }
    }
}

/// Location of the abort request file for a given state file.
pub fn request_path(state_file: &Path) -> PathBuf {
    state_file.with_file_name("abort-request")
}

/// Leaves an abort request for a running process to pick up.
pub fn write_request(path: &Path, supplied: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, supplied)
        .with_context(|| format!("Failed to write abort request {}", path.display()))
}

/// Consumes a pending request file, if any, and hands it to the gate.
///
/// Returns whether the token was set.
pub fn poll_request(path: &Path, gate: &AbortGate, token: &AbortToken) -> bool {
    let Ok(supplied) = std::fs::read_to_string(path) else {
        return false;
    };
    let _ = std::fs::remove_file(path);

    let accepted = gate.request_abort(token, supplied.trim_end_matches(['\r', '\n']));
    if accepted {
        tracing::info!("abort requested");
    } else {
        tracing::warn!("abort request rejected: secret mismatch");
    }
    accepted
}

/// Watches `path` for abort requests in a background thread.
///
/// Any request file left over from an earlier process is discarded first.
pub fn spawn_request_watcher(
    path: PathBuf,
    gate: AbortGate,
    token: AbortToken,
) -> std::thread::JoinHandle<()> {
    let _ = std::fs::remove_file(&path);
    std::thread::spawn(move || {
        loop {
            poll_request(&path, &gate, &token);
            std::thread::sleep(ABORT_POLL_INTERVAL);
        }
    })
}

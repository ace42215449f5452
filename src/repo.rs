// Safe pull of a single repository: stash, pull, restore.

use crate::config::Config;
use crate::constants::{DEFAULT_REPO_NAME, STASH_MESSAGE};
use crate::git;
use crate::progress::{ProgressEvent, ProgressSink, PullStep};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Note placed at the top of the captured output when a stash was made.
pub const STASH_NOTE: &str = "(stashed local changes before pull)";

/// Problem that was absorbed without failing the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullWarning {
    /// `git status` failed; the pull went ahead as if the tree were clean.
    StatusQueryFailed { message: String },
    /// Local changes were present but could not be stashed.
    StashFailed { message: String },
    /// The stash made before the pull could not be popped.
    StashRestoreFailed { message: String },
}

impl std::fmt::Display for PullWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullWarning::StatusQueryFailed { message } => {
                write!(f, "could not check for local changes: {message}")
            }
            PullWarning::StashFailed { message } => {
                write!(f, "could not stash local changes: {message}")
            }
            PullWarning::StashRestoreFailed { message } => {
                write!(f, "could not restore stashed changes: {message}")
            }
        }
    }
}

/// Result of processing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    pub name: String,
    pub path: PathBuf,
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    /// Local changes were stashed before the pull.
    pub stashed: bool,
    pub warnings: Vec<PullWarning>,
    pub duration: Duration,
}

impl PullOutcome {
    pub fn has_warning(&self, predicate: impl Fn(&PullWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }

    /// Local changes are still on the stash because popping them failed.
    pub fn stash_kept(&self) -> bool {
        self.stashed && self.has_warning(|w| matches!(w, PullWarning::StashRestoreFailed { .. }))
    }
}

/// Processes one repository and reports its outcome.
///
/// Implementations emit `Start` and `End` events for the repository and
/// never fail: every problem ends up in the returned [`PullOutcome`].
pub trait PullExecutor {
    fn pull(&self, path: &Path, sink: &dyn ProgressSink) -> PullOutcome;
}

/// [`PullExecutor`] backed by the git CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitPuller {
    config: Config,
}

impl GitPuller {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl PullExecutor for GitPuller {
    fn pull(&self, path: &Path, sink: &dyn ProgressSink) -> PullOutcome {
        pull(path, sink, &self.config)
    }
}

pub fn repo_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_REPO_NAME)
        .to_string()
}

/// Pulls `path`, shelving local changes around the pull.
pub fn pull(path: &Path, sink: &dyn ProgressSink, config: &Config) -> PullOutcome {
    let started = Instant::now();
    let name = repo_name(path);
    let logger = config.git_logger();
    let mut warnings = Vec::new();

    sink.on_event(&ProgressEvent::Start {
        name: name.clone(),
        path: path.to_path_buf(),
    });

    sink.on_step(PullStep::CheckingChanges);
    let dirty = match git::has_local_changes(path, config, logger) {
        Ok(dirty) => dirty,
        Err(e) => {
            tracing::warn!(repo = %name, error = %e, "status check failed, pulling without stash");
            warnings.push(PullWarning::StatusQueryFailed {
                message: format!("{e:#}"),
            });
            false
        }
    };

    let stashed = dirty && {
        sink.on_step(PullStep::Stashing);
        match git::stash_push(path, config, STASH_MESSAGE, logger) {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(repo = %name, error = %e, "stash failed, pulling without stash");
                warnings.push(PullWarning::StashFailed {
                    message: format!("{e:#}"),
                });
                false
            }
        }
    };

    sink.on_step(PullStep::Pulling);
    let pulled = git::pull(path, config, logger);

    let mut outcome = PullOutcome {
        name,
        path: path.to_path_buf(),
        ok: false,
        stdout: String::new(),
        stderr: String::new(),
        error: None,
        stashed,
        warnings: Vec::new(),
        duration: Duration::ZERO,
    };

    match pulled {
        Ok(output) if output.success => {
            let mut stdout = [stashed.then_some(STASH_NOTE), Some(output.stdout.trim())]
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            if stashed {
                sink.on_step(PullStep::RestoringStash);
                match git::stash_pop(path, config, logger) {
                    Ok(pop) => {
                        let pop_stderr = pop.stderr.trim();
                        if !pop_stderr.is_empty() {
                            stdout.push('\n');
                            stdout.push_str(pop_stderr);
                        }
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        tracing::warn!(repo = %outcome.name, error = %message, "stash pop failed after pull");
                        stdout.push_str(&format!("\n(stash pop failed: {message})"));
                        warnings.push(PullWarning::StashRestoreFailed { message });
                    }
                }
            }

            outcome.ok = true;
            outcome.stdout = stdout;
            outcome.stderr = output.stderr.trim().to_string();
        }
        Ok(output) => {
            restore_after_failure(path, config, stashed, &mut warnings);
            outcome.error = Some(output.failure_message(&["pull"], config.git_timeout));
            outcome.stdout = output.stdout.trim().to_string();
            outcome.stderr = output.stderr.trim().to_string();
        }
        Err(e) => {
            restore_after_failure(path, config, stashed, &mut warnings);
            outcome.error = Some(format!("{e:#}"));
        }
    }

    outcome.warnings = warnings;
    outcome.duration = started.elapsed();

    sink.on_event(&ProgressEvent::End {
        name: outcome.name.clone(),
        path: outcome.path.clone(),
        ok: outcome.ok,
        stdout: outcome.stdout.clone(),
        stderr: outcome.stderr.clone(),
        error: outcome.error.clone(),
    });

    outcome
}

/// Best-effort pop after a failed pull. The failure is recorded but the
/// outcome text is left untouched.
fn restore_after_failure(
    path: &Path,
    config: &Config,
    stashed: bool,
    warnings: &mut Vec<PullWarning>,
) {
    if !stashed {
        return;
    }
    if let Err(e) = git::stash_pop(path, config, config.git_logger()) {
        tracing::warn!(path = %path.display(), error = %e, "stash pop failed after failed pull");
        warnings.push(PullWarning::StashRestoreFailed {
            message: format!("{e:#}"),
        });
    }
}

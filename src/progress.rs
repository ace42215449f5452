//! Progress events emitted while a run is in flight.

use std::path::PathBuf;
use std::sync::mpsc;

/// Event pushed to a [`ProgressSink`] as a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A run is about to process `total` repositories.
    RunStarted { total: usize },
    Start {
        name: String,
        path: PathBuf,
    },
    End {
        name: String,
        path: PathBuf,
        ok: bool,
        stdout: String,
        stderr: String,
        error: Option<String>,
    },
    /// The run stopped early; always the last event of its run.
    Aborted,
}

/// Step inside the safe-pull sequence of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStep {
    CheckingChanges,
    Stashing,
    Pulling,
    RestoringStash,
}

impl std::fmt::Display for PullStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PullStep::CheckingChanges => "Checking for local changes",
            PullStep::Stashing => "Stashing local changes",
            PullStep::Pulling => "Pulling from upstream",
            PullStep::RestoringStash => "Restoring stashed changes",
        };
        f.write_str(label)
    }
}

/// Receiver of progress notifications.
///
/// Delivery is fire-and-forget: sinks must not block the run.
pub trait ProgressSink {
    fn on_event(&self, event: &ProgressEvent);

    /// Called as each step of a repository starts. Most sinks ignore it.
    fn on_step(&self, _step: PullStep) {}
}

/// No-op sink for when progress tracking is not needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Forwards events over a channel. A dropped receiver is ignored.
impl ProgressSink for mpsc::Sender<ProgressEvent> {
    fn on_event(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}

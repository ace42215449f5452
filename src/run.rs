//! Sequential pull over a list of repositories.

use crate::abort::AbortToken;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::repo::{PullExecutor, PullOutcome};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const MESSAGE_ABORTED: &str = "aborted by user";
pub const MESSAGE_NO_REPOS: &str = "no repositories found";

/// Aggregate result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Outcomes in processing order.
    pub results: Vec<PullOutcome>,
    pub total: usize,
    pub ok_count: usize,
    pub fail_count: usize,
    pub aborted: bool,
    pub message: String,
    /// No failures and not aborted.
    pub ok: bool,
    pub duration: Duration,
}

impl RunReport {
    fn new(results: Vec<PullOutcome>, aborted: bool, requested: usize, duration: Duration) -> Self {
        let total = results.len();
        let ok_count = results.iter().filter(|r| r.ok).count();
        let fail_count = total - ok_count;

        let message = if aborted {
            MESSAGE_ABORTED.to_string()
        } else if requested == 0 {
            MESSAGE_NO_REPOS.to_string()
        } else {
            format!("{ok_count} ok, {fail_count} with error")
        };

        Self {
            results,
            total,
            ok_count,
            fail_count,
            aborted,
            message,
            ok: fail_count == 0 && !aborted,
            duration,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &PullOutcome> {
        self.results.iter().filter(|r| !r.ok)
    }
}

/// Pulls each repository in order, one at a time.
///
/// `abort` is cleared on entry and checked before every repository; an
/// in-flight pull always finishes. Repositories not reached after an abort
/// are absent from the report.
pub fn run<E>(
    repo_paths: &[PathBuf],
    executor: &E,
    sink: &dyn ProgressSink,
    abort: &AbortToken,
) -> RunReport
where
    E: PullExecutor + ?Sized,
{
    let started = Instant::now();
    abort.reset();

    sink.on_event(&ProgressEvent::RunStarted {
        total: repo_paths.len(),
    });

    let mut results = Vec::with_capacity(repo_paths.len());
    let mut aborted = false;

    for path in repo_paths {
        if abort.take() {
            aborted = true;
            sink.on_event(&ProgressEvent::Aborted);
            break;
        }
        results.push(executor.pull(path, sink));
    }

    RunReport::new(results, aborted, repo_paths.len(), started.elapsed())
}

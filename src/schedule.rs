//! Daily scheduling, manual triggers and run bookkeeping.
//!
//! The scheduler decides when a run happens: once per calendar day at or
//! after the configured time, immediately at startup when today's run is
//! missing, or on demand. After each run it records a history entry and,
//! unless the run was aborted, the date of the run.

use crate::abort::AbortToken;
use crate::config::Settings;
use crate::constants::SCHEDULER_TICK;
use crate::discovery;
use crate::history::{HistoryEntry, StateStore};
use crate::progress::ProgressSink;
use crate::repo::PullExecutor;
use crate::run::{self, RunReport};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("no repository folder configured")]
    NoFoldersConfigured,
    #[error("failed to read run state: {0:#}")]
    State(anyhow::Error),
}

/// True when the daily run should start now.
pub fn is_due(now: NaiveDateTime, run_at: NaiveTime, last_run: Option<NaiveDate>) -> bool {
    last_run != Some(now.date()) && now.time() >= run_at
}

/// True when today's run has not happened yet, whatever the time.
pub fn needs_catch_up(today: NaiveDate, last_run: Option<NaiveDate>) -> bool {
    last_run != Some(today)
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self, TriggerError> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| TriggerError::AlreadyRunning)?;
        Ok(Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct Scheduler<C, E> {
    clock: C,
    settings: Settings,
    store: StateStore,
    executor: E,
    running: AtomicBool,
    /// Day of an automatic run that was aborted; not retried that day.
    aborted_on: Mutex<Option<NaiveDate>>,
}

impl<C: Clock, E: PullExecutor> Scheduler<C, E> {
    pub fn new(clock: C, settings: Settings, store: StateStore, executor: E) -> Self {
        Self {
            clock,
            settings,
            store,
            executor,
            running: AtomicBool::new(false),
            aborted_on: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Discovers repositories and runs a pull over them now.
    ///
    /// Overlapping runs are rejected. Failing to persist the result is
    /// logged; the report is returned regardless.
    pub fn trigger(
        &self,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<RunReport, TriggerError> {
        if !self.settings.has_folders() {
            return Err(TriggerError::NoFoldersConfigured);
        }
        let _guard = RunGuard::acquire(&self.running)?;

        let roots = discovery::collect_roots(
            self.settings.repos_folder.as_deref(),
            self.settings.include_default_folder,
        );
        tracing::info!(repos = roots.len(), "starting pull run");

        let report = run::run(&roots, &self.executor, sink, abort);
        tracing::info!(message = %report.message, aborted = report.aborted, "pull run finished");

        let now = self.clock.now();
        let completed_on = (!report.aborted).then(|| now.date_naive());
        if let Err(e) = self
            .store
            .record_run(HistoryEntry::from_report(&report, now), completed_on)
        {
            tracing::error!(error = %format!("{e:#}"), "failed to record run");
        }

        Ok(report)
    }

    /// Runs when today's run is missing; used once at startup.
    pub fn catch_up(
        &self,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<Option<RunReport>, TriggerError> {
        let today = self.clock.now().date_naive();
        let last_run = self.store.last_run_date().map_err(TriggerError::State)?;
        if !needs_catch_up(today, last_run) {
            return Ok(None);
        }
        self.automatic_run(today, sink, abort).map(Some)
    }

    /// Runs when the daily time has passed and today's run is missing.
    pub fn tick(
        &self,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<Option<RunReport>, TriggerError> {
        let now = self.clock.now();
        let today = now.date_naive();
        let last_run = self.store.last_run_date().map_err(TriggerError::State)?;

        if !is_due(now.naive_local(), self.settings.run_at, last_run) || self.aborted_today(today) {
            return Ok(None);
        }
        self.automatic_run(today, sink, abort).map(Some)
    }

    fn automatic_run(
        &self,
        today: NaiveDate,
        sink: &dyn ProgressSink,
        abort: &AbortToken,
    ) -> Result<RunReport, TriggerError> {
        let report = self.trigger(sink, abort)?;
        if report.aborted {
            if let Ok(mut aborted_on) = self.aborted_on.lock() {
                *aborted_on = Some(today);
            }
        }
        Ok(report)
    }

    fn aborted_today(&self, today: NaiveDate) -> bool {
        self.aborted_on
            .lock()
            .map(|aborted_on| *aborted_on == Some(today))
            .unwrap_or(false)
    }

    /// Catches up, then checks every [`SCHEDULER_TICK`] forever.
    pub fn run_forever(&self, sink: &dyn ProgressSink, abort: &AbortToken) -> ! {
        if let Err(e) = self.catch_up(sink, abort) {
            tracing::warn!(error = %e, "startup run skipped");
        }
        loop {
            std::thread::sleep(SCHEDULER_TICK);
            if let Err(e) = self.tick(sink, abort) {
                tracing::warn!(error = %e, "scheduled run skipped");
            }
        }
    }
}

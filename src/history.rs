//! Persistent run state: the last completed run date and the run history.

use crate::constants::HISTORY_LIMIT;
use crate::run::RunReport;
use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-repository line of a history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResult {
    pub name: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

/// One stored run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the epoch at which the run was recorded.
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub date_time: DateTime<Utc>,
    pub ok_count: usize,
    pub fail_count: usize,
    pub total: usize,
    pub aborted: bool,
    pub message: String,
    pub results: Vec<HistoryResult>,
}

impl HistoryEntry {
    pub fn from_report(report: &RunReport, at: DateTime<Local>) -> Self {
        Self {
            id: at.timestamp_millis(),
            date: at.date_naive(),
            time: at.time().with_nanosecond(0).unwrap_or_else(|| at.time()),
            date_time: at.with_timezone(&Utc),
            ok_count: report.ok_count,
            fail_count: report.fail_count,
            total: report.total,
            aborted: report.aborted,
            message: report.message.clone(),
            results: report
                .results
                .iter()
                .map(|r| HistoryResult {
                    name: r.name.clone(),
                    ok: r.ok,
                    error: r.error.clone(),
                    stdout: r.stdout.clone(),
                    stderr: r.stderr.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub last_run_date: Option<NaiveDate>,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// JSON-file backed [`State`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state. A missing file is an empty state.
    ///
    /// A file that does not parse is renamed to `*.json.corrupt` and the
    /// state starts over empty, so the next run can be recorded.
    pub fn load(&self) -> anyhow::Result<State> {
        if !self.path.exists() {
            return Ok(State::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(error) => {
                let aside = self.corrupt_path();
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    %error,
                    "corrupt state file, starting over"
                );
                std::fs::rename(&self.path, &aside).with_context(|| {
                    format!("Failed to move corrupt state file {}", self.path.display())
                })?;
                Ok(State::default())
            }
        }
    }

    /// Where an unreadable state file is moved to.
    pub fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    /// Writes the state through a temporary file and a rename.
    pub fn save(&self, state: &State) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }

    pub fn last_run_date(&self) -> anyhow::Result<Option<NaiveDate>> {
        Ok(self.load()?.last_run_date)
    }

    /// Prepends `entry` to the history, keeping the newest
    /// [`HISTORY_LIMIT`] records, and updates the last run date when given.
    pub fn record_run(
        &self,
        entry: HistoryEntry,
        completed_on: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        let mut state = self.load()?;
        state.history.insert(0, entry);
        state.history.truncate(HISTORY_LIMIT);
        if let Some(date) = completed_on {
            state.last_run_date = Some(date);
        }
        self.save(&state)
    }

    pub fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(self.load()?.history)
    }
}

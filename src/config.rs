//! Runtime configuration and persisted settings.

use crate::constants::{self, APP_DIR, DEFAULT_RUN_AT, MAX_OUTPUT_BYTES};
use crate::git::{self, GitLogger};
use anyhow::Context;
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration derived from CLI arguments and the environment.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Upper bound for a single git invocation.
    pub git_timeout: Duration,
    /// Capture cap per output stream of a git invocation.
    pub max_output_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            git_timeout: constants::git_timeout(),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// Config only selects which logger function to use; the loggers
    /// themselves live in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// User settings read from the TOML settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Folder scanned for repositories.
    pub repos_folder: Option<PathBuf>,
    /// Also scan `~/Documents/GitHub`.
    pub include_default_folder: bool,
    /// Local time of day at which the daily run becomes due.
    #[serde(deserialize_with = "deserialize_run_at")]
    pub run_at: NaiveTime,
    /// Secret an abort request must carry. Without it aborts are rejected.
    pub abort_secret: Option<String>,
    /// Where the last run date and the run history are stored.
    pub state_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repos_folder: None,
            include_default_folder: true,
            run_at: default_run_at(),
            abort_secret: None,
            state_file: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_settings_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Resolves the state file location.
    pub fn state_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.state_file {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join("state.json"))
            .context("Could not determine a data directory for the state file")
    }

    /// True when at least one folder is configured for scanning.
    #[must_use]
    pub fn has_folders(&self) -> bool {
        self.repos_folder.is_some() || self.include_default_folder
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_run_at() -> NaiveTime {
    parse_run_at(DEFAULT_RUN_AT).unwrap_or(NaiveTime::MIN)
}

pub fn parse_run_at(value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("run_at must look like {DEFAULT_RUN_AT}, got {value:?}"))
}

fn deserialize_run_at<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_run_at(&raw).map_err(serde::de::Error::custom)
}

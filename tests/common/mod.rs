//! Test infrastructure for git-daily-pull integration tests.
#![allow(dead_code)]

use anyhow::Result;
use git_daily_pull::config::{Config, Verbosity};
use git_daily_pull::git::run_git;
use git_daily_pull::progress::{ProgressEvent, ProgressSink, PullStep};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub fn test_config() -> Config {
    Config {
        verbosity: Verbosity::Quiet,
        git_timeout: Duration::from_secs(30),
        ..Config::default()
    }
}

/// Initializes a repository with one commit on `branch`.
pub fn init_repo(path: &Path, branch: &str) -> Result<()> {
    let config = test_config();
    run_git(path, &config, &["init", "-b", branch])?;
    configure_identity(path)?;
    std::fs::write(path.join("README.md"), "# Test Repo\n")?;
    run_git(path, &config, &["add", "README.md"])?;
    run_git(path, &config, &["commit", "-m", "Initial commit"])?;
    Ok(())
}

fn configure_identity(path: &Path) -> Result<()> {
    let config = test_config();
    run_git(path, &config, &["config", "user.email", "test@example.com"])?;
    run_git(path, &config, &["config", "user.name", "Test User"])?;
    run_git(path, &config, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped.
pub struct TestRepo {
    _temp_dir: TempDir,
    remote: Option<TempDir>,
    path: PathBuf,
}

impl TestRepo {
    /// Creates a new test repository with an initial commit on the master branch.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("repo");
        std::fs::create_dir_all(&path)?;
        init_repo(&path, "master")?;

        Ok(Self {
            _temp_dir: temp_dir,
            remote: None,
            path,
        })
    }

    /// Creates a test repository tracking a bare remote.
    pub fn with_remote() -> Result<Self> {
        let mut repo = Self::new()?;
        let remote_dir = TempDir::new()?;
        let config = test_config();

        run_git(remote_dir.path(), &config, &["init", "--bare", "-b", "master"])?;
        let remote_url = remote_dir.path().to_string_lossy().into_owned();
        run_git(
            &repo.path,
            &config,
            &["remote", "add", "origin", remote_url.as_str()],
        )?;
        run_git(&repo.path, &config, &["push", "-u", "origin", "master"])?;

        repo.remote = Some(remote_dir);
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the remote so the next pull fails.
    pub fn remove_remote(&mut self) {
        self.remote = None;
    }

    /// Commits `contents` to `file` from a second clone and pushes it.
    pub fn push_upstream_change(&self, file: &str, contents: &str) -> Result<()> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("repository has no remote"))?;
        let config = test_config();
        let other = TempDir::new()?;
        let clone = other.path().join("clone");

        let remote_url = remote.path().to_string_lossy().into_owned();
        run_git(other.path(), &config, &["clone", remote_url.as_str(), "clone"])?;
        configure_identity(&clone)?;
        std::fs::write(clone.join(file), contents)?;
        run_git(&clone, &config, &["add", file])?;
        run_git(&clone, &config, &["commit", "-m", "Upstream change"])?;
        run_git(&clone, &config, &["push", "origin", "master"])?;
        Ok(())
    }

    pub fn make_dirty(&self) -> Result<()> {
        std::fs::write(self.path.join("README.md"), "# Modified locally\n")?;
        Ok(())
    }

    pub fn make_untracked(&self) -> Result<()> {
        std::fs::write(self.path.join("untracked.txt"), "untracked content\n")?;
        Ok(())
    }

    pub fn has_stash(&self) -> Result<bool> {
        let output = run_git(&self.path, &test_config(), &["stash", "list"])?;
        Ok(!output.is_empty())
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.path.join(name).exists()
    }

    pub fn read(&self, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.path.join(name))?)
    }
}

/// Creates one repository per name inside `workspace`, each with its own
/// bare remote stored under `workspace/.remotes`.
pub fn setup_workspace_with_repos(workspace: &TempDir, names: &[&str]) -> Result<Vec<PathBuf>> {
    let config = test_config();
    let remotes = workspace.path().join(".remotes");
    let mut paths = Vec::new();

    for name in names {
        let repo_path = workspace.path().join(name);
        let remote_path = remotes.join(format!("{name}.git"));
        std::fs::create_dir_all(&repo_path)?;
        std::fs::create_dir_all(&remote_path)?;

        run_git(&remote_path, &config, &["init", "--bare", "-b", "master"])?;
        init_repo(&repo_path, "master")?;
        let remote_url = remote_path.to_string_lossy().into_owned();
        run_git(
            &repo_path,
            &config,
            &["remote", "add", "origin", remote_url.as_str()],
        )?;
        run_git(&repo_path, &config, &["push", "-u", "origin", "master"])?;
        paths.push(repo_path);
    }
    Ok(paths)
}

/// Sink that keeps every event and step in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<ProgressEvent>>,
    pub steps: RefCell<Vec<PullStep>>,
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.borrow_mut().push(event.clone());
    }

    fn on_step(&self, step: PullStep) {
        self.steps.borrow_mut().push(step);
    }
}

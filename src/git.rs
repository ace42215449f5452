//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands,
//! handling bounded execution, output capture and error formatting.

use crate::config::Config;
use anyhow::Context;
use colored::Colorize;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Callback invoked with the arguments of every git command before it runs.
pub type GitLogger = fn(&[&str]);

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Minimum time left for output readers once the process has exited.
const READER_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8 * 1024;

pub fn verbose_logger(args: &[&str]) {
    eprintln!("  {} git {}", "$".dimmed(), args.join(" ").dimmed());
}

pub fn no_op_logger(_args: &[&str]) {}

/// Captured result of a single git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl GitOutput {
    /// Human readable reason the command did not succeed.
    pub fn failure_message(&self, args: &[&str], timeout: Duration) -> String {
        if self.timed_out {
            format!(
                "git {} timed out after {}s",
                args.join(" "),
                timeout.as_secs()
            )
        } else {
            let code = self
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            format!(
                "git {} failed (exit {}): {}",
                args.join(" "),
                code,
                self.stderr.trim()
            )
        }
    }
}

/// Runs git in `repo` and captures both output streams.
///
/// The process is killed once `config.git_timeout` elapses. Output is
/// collected until the same deadline, or [`READER_GRACE`] after exit when
/// that is later; a background process that inherited the pipes cannot hold
/// the call open past it. Each stream keeps at most `config.max_output_bytes`;
/// the rest is drained and dropped so the child never blocks on a full pipe.
/// Only a failure to spawn or wait is an `Err`; a non-zero exit is reported
/// through [`GitOutput::success`].
pub fn run_git_captured(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<GitOutput> {
    let mut child = Command::new("git")
        .current_dir(repo)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn git command")?;

    let stdout_rx = capture(child.stdout.take(), config.max_output_bytes);
    let stderr_rx = capture(child.stderr.take(), config.max_output_bytes);

    let started = Instant::now();
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait().context("Failed to wait for git command")? {
            break status;
        }
        if started.elapsed() >= config.git_timeout {
            timed_out = true;
            let _ = child.kill();
            break child.wait().context("Failed to wait for git command")?;
        }
        std::thread::sleep(WAIT_POLL);
    };

    let deadline = (started + config.git_timeout).max(Instant::now() + READER_GRACE);

    Ok(GitOutput {
        exit_code: status.code(),
        success: status.success() && !timed_out,
        stdout: collect(&stdout_rx, deadline),
        stderr: collect(&stderr_rx, deadline),
        timed_out,
    })
}

/// Reads `stream` on a background thread, sending chunks until `limit`
/// bytes were sent, then discarding the rest up to EOF.
fn capture<R>(stream: Option<R>, limit: usize) -> mpsc::Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let Some(stream) = stream else {
            return;
        };
        let mut limited = stream.take(limit as u64);
        let mut chunk = vec![0; READ_CHUNK];
        loop {
            match limited.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
        drop(tx);
        let _ = std::io::copy(&mut limited.into_inner(), &mut std::io::sink());
    });
    rx
}

/// Gathers chunks until the reader finishes or `deadline` passes.
fn collect(rx: &mpsc::Receiver<Vec<u8>>, deadline: Instant) -> String {
    let mut bytes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn run_git_checked(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<GitOutput> {
    let output = run_git_captured(repo, config, args)?;
    if output.success {
        Ok(output)
    } else {
        anyhow::bail!(output.failure_message(args, config.git_timeout))
    }
}

/// Runs git and returns its trimmed stdout, failing on a non-zero exit.
pub fn run_git(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<String> {
    let output = run_git_checked(repo, config, args)?;
    Ok(output.stdout.trim().to_string())
}

/// True when `status --porcelain` reports modified, staged or untracked files.
pub fn has_local_changes(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<bool> {
    let args = ["status", "--porcelain"];
    logger(&args);
    run_git(repo, config, &args)
        .map(|output| !output.is_empty())
        .context("Failed to check for local changes")
}

/// Stashes tracked and untracked changes under `message`.
///
/// Returns `false` when git reports there was nothing to stash.
pub fn stash_push(
    repo: &Path,
    config: &Config,
    message: &str,
    logger: GitLogger,
) -> anyhow::Result<bool> {
    let args = ["stash", "push", "--include-untracked", "-m", message];
    logger(&args);
    let output = run_git(repo, config, &args).context("Failed to stash changes")?;
    Ok(!output.contains("No local changes to save"))
}

pub fn stash_pop(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<GitOutput> {
    let args = ["stash", "pop"];
    logger(&args);
    run_git_checked(repo, config, &args).context("Failed to pop stash")
}

/// Pulls from the configured upstream.
///
/// The output is returned unchecked so callers can report the captured text
/// of a failed pull.
pub fn pull(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<GitOutput> {
    let args = ["pull"];
    logger(&args);
    run_git_captured(repo, config, &args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: Option<i32>, timed_out: bool) -> GitOutput {
        GitOutput {
            exit_code,
            success: false,
            stdout: String::new(),
            stderr: "fatal: no upstream\n".to_string(),
            timed_out,
        }
    }

    #[test]
    fn test_failure_message_includes_exit_code_and_stderr() {
        let message = output(Some(1), false).failure_message(&["pull"], Duration::from_secs(120));
        assert_eq!(message, "git pull failed (exit 1): fatal: no upstream");
    }

    #[test]
    fn test_failure_message_for_timeout() {
        let message = output(None, true).failure_message(&["pull"], Duration::from_secs(120));
        assert_eq!(message, "git pull timed out after 120s");
    }

    #[test]
    fn test_failure_message_for_signal() {
        let message = output(None, false).failure_message(&["stash", "pop"], Duration::from_secs(5));
        assert!(message.starts_with("git stash pop failed (exit signal)"));
    }
}

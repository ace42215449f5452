//! Progress bars, colored output, and summary formatting.
//!
//! This module provides visual feedback during a pull run including a
//! progress bar, verbose per-step lines, and colored summary output.

use crate::config::Config;
use crate::constants::PROGRESS_TICK_MS;
use crate::history::HistoryEntry;
use crate::progress::{ProgressEvent, ProgressSink, PullStep};
use crate::repo::PullOutcome;
use crate::run::RunReport;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Prints a repository header in verbose mode.
pub fn print_repo_header(config: &Config, repo_name: &str) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("\n{}", format!("[{}]", repo_name).white().bold());
}

/// Prints a step progress message in verbose mode.
pub fn print_step(config: &Config, step: PullStep) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("  {}...", step.to_string().dimmed());
}

/// Prints completion status (verbose mode only).
pub fn print_completion_status(config: &Config, ok: bool, error: Option<&str>) {
    if !config.is_verbose() {
        return;
    }
    if ok {
        eprintln!("  {} completed successfully", "✓".green());
    } else if let Some(err) = error {
        eprintln!("  {} failed: {}", "✗".red(), err);
    }
}

/// Terminal sink for interactive runs.
///
/// Normal mode shows a progress bar with the repository being pulled;
/// verbose mode prints a header and each step instead; quiet mode shows
/// nothing.
pub struct TerminalSink {
    config: Config,
    bar: Mutex<Option<ProgressBar>>,
    failed: Mutex<usize>,
}

impl TerminalSink {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bar: Mutex::new(None),
            failed: Mutex::new(0),
        }
    }

    fn hide_progress(&self) -> bool {
        self.config.is_quiet() || self.config.is_verbose()
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(bar) = bar.as_ref() {
                f(bar);
            }
        }
    }

    fn start_bar(&self, total: usize) {
        if self.hide_progress() || total == 0 {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn mark_completed(&self, name: &str, ok: bool) {
        self.with_bar(|bar| {
            bar.inc(1);
            let symbol = if ok { "✓".green() } else { "✗".red() };
            bar.println(format!("  {} {}", symbol, name));
        });
        if !ok {
            if let Ok(mut failed) = self.failed.lock() {
                *failed += 1;
                let count = *failed;
                self.with_bar(|bar| {
                    bar.set_message(format!("│ {} failed", count).red().to_string());
                });
            }
        }
    }
}

impl ProgressSink for TerminalSink {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total } => {
                print_run_start(*total, &self.config);
                self.start_bar(*total);
            }
            ProgressEvent::Start { name, .. } => {
                print_repo_header(&self.config, name);
                self.with_bar(|bar| bar.set_message(format!("pulling {}", name)));
            }
            ProgressEvent::End {
                name, ok, error, ..
            } => {
                print_completion_status(&self.config, *ok, error.as_deref());
                self.mark_completed(name, *ok);
            }
            ProgressEvent::Aborted => {
                self.finish_bar();
                if !self.config.is_quiet() {
                    eprintln!("{}", "Run aborted".yellow().bold());
                }
            }
        }
    }

    fn on_step(&self, step: PullStep) {
        print_step(&self.config, step);
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        self.finish_bar();
    }
}

/// Sink for unattended runs: one log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total } => tracing::info!(total, "run started"),
            ProgressEvent::Start { name, .. } => tracing::info!(repo = %name, "pulling"),
            ProgressEvent::End {
                name, ok: true, ..
            } => tracing::info!(repo = %name, "pulled"),
            ProgressEvent::End { name, error, .. } => tracing::warn!(
                repo = %name,
                error = error.as_deref().unwrap_or_default(),
                "pull failed"
            ),
            ProgressEvent::Aborted => tracing::warn!("run aborted"),
        }
    }
}

pub fn print_run_start(count: usize, config: &Config) {
    if config.is_quiet() {
        return;
    }
    if count == 0 {
        print_no_repos()
    } else {
        println!(
            "{}",
            format!("Pulling {} repositories", count).dimmed()
        )
    }
}

pub fn print_repos(repos: &[PathBuf], config: &Config) {
    if repos.is_empty() {
        if !config.is_quiet() {
            print_no_repos();
        }
        return;
    }
    for repo in repos {
        println!("{}", repo.display());
    }
}

pub fn print_summary(report: &RunReport, config: &Config) {
    if config.is_quiet() {
        print_quiet_summary(report);
    } else {
        print_normal_summary(report);
    }
}

fn print_quiet_summary(report: &RunReport) {
    // Always print count to stdout
    println!("{}/{} repositories pulled", report.ok_count, report.total);

    // Print failures to stderr
    for outcome in report.failures() {
        eprintln!(
            "error: {}: {}",
            outcome.path.display(),
            outcome.error.as_deref().unwrap_or_default()
        );
    }
}

fn print_normal_summary(report: &RunReport) {
    print_section("Summary");
    let (successes, failures): (Vec<_>, Vec<_>) = report.results.iter().partition(|r| r.ok);

    print_successes(&successes);
    print_failures(&failures);

    let message = if report.ok {
        report.message.green()
    } else {
        report.message.yellow()
    };
    println!(
        "{}: {} in {}",
        "Total".white().bold(),
        message,
        format_duration(report.duration)
    );
}

pub fn print_history(entries: &[HistoryEntry], config: &Config) {
    if entries.is_empty() {
        if !config.is_quiet() {
            println!("{}", "No runs recorded yet".yellow().bold());
        }
        return;
    }

    for entry in entries {
        let status = if entry.aborted {
            "ABORTED".yellow().bold()
        } else if entry.fail_count == 0 {
            "OK".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!(
            "{} {} {} {}",
            entry.date.to_string().white(),
            entry.time.format("%H:%M:%S").to_string().white(),
            status,
            entry.message.dimmed()
        );
        if config.is_quiet() {
            continue;
        }
        for result in entry.results.iter().filter(|r| !r.ok) {
            println!(
                "    {} {}",
                result.name.red(),
                result.error.as_deref().unwrap_or_default().dimmed()
            );
        }
    }
}

fn print_no_repos() {
    println!("{}", "No git repositories found".yellow().bold())
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

/// What happened to the local changes of a pulled repository, if any were stashed.
fn stash_label(outcome: &PullOutcome) -> Option<&'static str> {
    if !outcome.stashed {
        None
    } else if outcome.stash_kept() {
        Some("(stash kept, run `git stash pop`)")
    } else {
        Some("(stash restored)")
    }
}

fn print_section(title: &str) {
    let line = "=".repeat(50).cyan().dimmed();
    let padding = (50 - title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}

fn print_successes(successes: &[&PullOutcome]) {
    if successes.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("Succeeded ({}):", successes.len()).green().bold()
    );

    for outcome in successes {
        let stash_msg = match stash_label(outcome) {
            Some(label) if outcome.stash_kept() => format!(" {}", label).red().bold(),
            Some(label) => format!(" {}", label).yellow(),
            None => "".normal(),
        };
        println!(
            "  {} {}{} in {}",
            "OK".green().bold(),
            outcome.path.display().to_string().white(),
            stash_msg,
            format_duration(outcome.duration).dimmed(),
        );
        for warning in &outcome.warnings {
            println!("     {}", warning.to_string().yellow());
        }
    }
    println!();
}

fn print_failures(failures: &[&PullOutcome]) {
    if failures.is_empty() {
        return;
    }

    println!("{}", format!("Failed ({}):", failures.len()).red().bold());

    for outcome in failures {
        println!(
            "  {} {} {} in {}",
            "FAIL".red().bold(),
            outcome.path.display().to_string().white(),
            outcome.error.as_deref().unwrap_or_default().red(),
            format_duration(outcome.duration).dimmed(),
        );
    }
    println!();
}

/// Prints where repositories are searched.
pub fn print_folders(user_folder: Option<&Path>, default_folder: Option<&Path>, config: &Config) {
    if config.is_quiet() {
        return;
    }
    for folder in [user_folder, default_folder].into_iter().flatten() {
        println!(
            "{} {}",
            "Scanning:".cyan(),
            folder.display().to_string().white().bold()
        );
    }
}

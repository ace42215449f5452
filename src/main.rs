use anyhow::Context;
use clap::Parser;
use git_daily_pull::abort::{self, AbortGate, AbortToken};
use git_daily_pull::cli::{Cli, Command, FolderArgs};
use git_daily_pull::config::{Config, Settings};
use git_daily_pull::discovery;
use git_daily_pull::history::StateStore;
use git_daily_pull::output::{self, LogSink, TerminalSink};
use git_daily_pull::repo::GitPuller;
use git_daily_pull::schedule::{Scheduler, SystemClock};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.runtime_config();
    init_tracing(&config, matches!(cli.command, Command::Daemon))?;

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(ref folders) => run_now(with_overrides(settings, folders), config),
        Command::Daemon => daemon(settings, config),
        Command::List(ref folders) => list(&with_overrides(settings, folders), &config),
        Command::History { limit } => history(&settings, limit, &config),
        Command::Abort { ref secret } => request_abort(&settings, secret.clone(), &config),
    }
}

fn init_tracing(config: &Config, daemon: bool) -> anyhow::Result<()> {
    let level = if config.is_quiet() {
        "error"
    } else if config.is_verbose() {
        "debug"
    } else if daemon {
        "info"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("GIT_DAILY_PULL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn with_overrides(mut settings: Settings, folders: &FolderArgs) -> Settings {
    if let Some(folder) = &folders.folder {
        settings.repos_folder = Some(folder.clone());
    }
    if folders.no_default_folder {
        settings.include_default_folder = false;
    }
    settings
}

/// Starts a watcher that turns abort requests into a set token.
fn watch_for_abort(settings: &Settings, state_path: &std::path::Path) -> AbortToken {
    let token = AbortToken::new();
    abort::spawn_request_watcher(
        abort::request_path(state_path),
        AbortGate::new(settings.abort_secret.clone()),
        token.clone(),
    );
    token
}

fn scheduler(settings: Settings, config: Config) -> anyhow::Result<Scheduler<SystemClock, GitPuller>> {
    let store = StateStore::new(settings.state_path()?);
    Ok(Scheduler::new(SystemClock, settings, store, GitPuller::new(config)))
}

fn run_now(settings: Settings, config: Config) -> anyhow::Result<()> {
    output::print_folders(
        settings.repos_folder.as_deref(),
        settings
            .include_default_folder
            .then(discovery::default_folder)
            .flatten()
            .as_deref(),
        &config,
    );

    let token = watch_for_abort(&settings, &settings.state_path()?);
    let scheduler = scheduler(settings, config)?;

    let report = {
        let sink = TerminalSink::new(config);
        scheduler
            .trigger(&sink, &token)
            .context("Pull run did not start")?
    };
    output::print_summary(&report, &config);

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn daemon(settings: Settings, config: Config) -> anyhow::Result<()> {
    if !settings.has_folders() {
        anyhow::bail!("No repository folder configured; set repos_folder or include_default_folder");
    }
    let token = watch_for_abort(&settings, &settings.state_path()?);
    tracing::info!(run_at = %settings.run_at.format("%H:%M"), "daemon started");

    scheduler(settings, config)?.run_forever(&LogSink, &token)
}

fn list(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    let repos = discovery::collect_roots(
        settings.repos_folder.as_deref(),
        settings.include_default_folder,
    );
    output::print_repos(&repos, config);
    Ok(())
}

fn history(settings: &Settings, limit: usize, config: &Config) -> anyhow::Result<()> {
    let store = StateStore::new(settings.state_path()?);
    let entries: Vec<_> = store.history()?.into_iter().take(limit).collect();
    output::print_history(&entries, config);
    Ok(())
}

fn request_abort(settings: &Settings, secret: Option<String>, config: &Config) -> anyhow::Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => dialoguer::Password::new()
            .with_prompt("Abort secret")
            .interact()
            .context("Failed to read the abort secret")?,
    };

    abort::write_request(&abort::request_path(&settings.state_path()?), &secret)?;
    if !config.is_quiet() {
        println!("Abort requested; the repository being pulled will finish first");
    }
    Ok(())
}

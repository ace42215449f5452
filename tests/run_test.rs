mod common;

use common::{RecordingSink, init_repo, setup_workspace_with_repos, test_config};
use git_daily_pull::abort::AbortToken;
use git_daily_pull::discovery;
use git_daily_pull::git;
use git_daily_pull::progress::{NoOpSink, ProgressEvent};
use git_daily_pull::repo::GitPuller;
use git_daily_pull::run::{self, MESSAGE_NO_REPOS};
use std::collections::HashSet;
use tempfile::TempDir;

fn puller() -> GitPuller {
    GitPuller::new(test_config())
}

#[test]
fn test_run_pulls_every_discovered_repo() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    setup_workspace_with_repos(&workspace, &["repo-a", "repo-b"])?;

    let repos = discovery::collect_roots_from(Some(workspace.path()), None);
    let report = run::run(&repos, &puller(), &NoOpSink, &AbortToken::new());

    assert_eq!(report.total, 2);
    assert_eq!(report.ok_count, 2);
    assert!(report.ok);
    assert_eq!(report.message, "2 ok, 0 with error");
    Ok(())
}

#[test]
fn test_run_mixed_success_and_failure() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    setup_workspace_with_repos(&workspace, &["repo-ok", "repo-fail"])?;
    git::run_git(
        &workspace.path().join("repo-fail"),
        &test_config(),
        &["remote", "set-url", "origin", "/nope"],
    )?;

    let repos = discovery::collect_roots_from(Some(workspace.path()), None);
    let report = run::run(&repos, &puller(), &NoOpSink, &AbortToken::new());

    assert_eq!(report.total, 2);
    assert_eq!(report.ok_count, 1);
    assert_eq!(report.fail_count, 1);
    assert!(!report.ok);
    assert_eq!(report.message, "1 ok, 1 with error");

    let failed: Vec<_> = report.failures().map(|r| r.name.as_str()).collect();
    assert_eq!(failed, ["repo-fail"]);
    Ok(())
}

#[test]
fn test_run_with_dirty_repo_keeps_local_work() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    let paths = setup_workspace_with_repos(&workspace, &["repo-dirty"])?;
    std::fs::write(paths[0].join("README.md"), "# Work in progress\n")?;

    let report = run::run(&paths, &puller(), &NoOpSink, &AbortToken::new());

    assert!(report.ok);
    assert!(report.results[0].stashed);
    assert_eq!(
        std::fs::read_to_string(paths[0].join("README.md"))?,
        "# Work in progress\n"
    );
    Ok(())
}

#[test]
fn test_run_empty_workspace() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    let repos = discovery::collect_roots_from(Some(workspace.path()), None);
    let report = run::run(&repos, &puller(), &NoOpSink, &AbortToken::new());

    assert_eq!(report.total, 0);
    assert!(report.ok);
    assert_eq!(report.message, MESSAGE_NO_REPOS);
    Ok(())
}

#[test]
fn test_run_events_follow_processing_order() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    let paths = setup_workspace_with_repos(&workspace, &["alpha", "beta", "gamma"])?;
    let sink = RecordingSink::default();

    run::run(&paths, &puller(), &sink, &AbortToken::new());

    let events = sink.events.borrow();
    assert_eq!(events.len(), 1 + 2 * paths.len());
    assert_eq!(events[0], ProgressEvent::RunStarted { total: 3 });

    let order: Vec<String> = events[1..]
        .iter()
        .map(|e| match e {
            ProgressEvent::Start { name, .. } => format!("start:{name}"),
            ProgressEvent::End { name, .. } => format!("end:{name}"),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(
        order,
        [
            "start:alpha",
            "end:alpha",
            "start:beta",
            "end:beta",
            "start:gamma",
            "end:gamma"
        ]
    );
    Ok(())
}

#[test]
fn test_discovery_finds_nested_layouts_once() -> anyhow::Result<()> {
    let workspace = TempDir::new()?;
    let org = workspace.path().join("org");
    let outer = org.join("outer-repo");
    let nested = outer.join("nested-repo");
    std::fs::create_dir_all(&nested)?;
    init_repo(&outer, "master")?;
    init_repo(&nested, "master")?;
    std::fs::create_dir_all(workspace.path().join("notes"))?;

    let repos = discovery::collect_roots_from(Some(workspace.path()), Some(&org));

    assert_eq!(repos.len(), 1);
    assert!(repos[0].ends_with("outer-repo"));
    let unique: HashSet<_> = repos.iter().collect();
    assert_eq!(unique.len(), repos.len());
    Ok(())
}

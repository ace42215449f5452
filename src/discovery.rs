//! Repository discovery below configured root folders.

use crate::constants::{GIT_DIR, MAX_SCAN_DEPTH};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// True when `path` has a `.git` entry directly inside it.
///
/// A `.git` file counts too; linked worktrees and submodules use one.
pub fn is_git_repo(path: &Path) -> bool {
    std::fs::metadata(path.join(GIT_DIR))
        .map(|meta| meta.is_dir() || meta.is_file())
        .unwrap_or(false)
}

/// Finds repository roots in `root`, looking at most `max_depth` levels down.
///
/// `root` itself is depth 0. A directory identified as a repository is not
/// descended into. Unreadable directories are skipped, and a missing root
/// yields an empty list. Entries are visited in sorted order so repeated
/// scans of an unchanged tree return the same list.
pub fn locate(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut repos = Vec::new();
    walk(root, 0, max_depth, &mut repos);
    repos
}

fn walk(dir: &Path, depth: usize, max_depth: usize, repos: &mut Vec<PathBuf>) {
    if is_git_repo(dir) {
        repos.push(dir.to_path_buf());
        return;
    }
    if depth >= max_depth {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::debug!(path = %dir.display(), %error, "skipping unreadable directory");
            return;
        }
    };

    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    subdirs.sort();

    for subdir in subdirs {
        walk(&subdir, depth + 1, max_depth, repos);
    }
}

/// Default clone folder used by GitHub Desktop: `~/Documents/GitHub`.
pub fn default_folder() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Documents").join("GitHub"))
}

/// Collects repository roots from the user folder and, optionally, the
/// platform default folder.
pub fn collect_roots(user_folder: Option<&Path>, include_default_folder: bool) -> Vec<PathBuf> {
    let default = if include_default_folder {
        default_folder()
    } else {
        None
    };
    collect_roots_from(user_folder, default.as_deref())
}

/// Unions the scan results of both folders, canonicalizing every path and
/// dropping duplicates. Folders that are absent or do not exist contribute
/// nothing.
pub fn collect_roots_from(user_folder: Option<&Path>, default_folder: Option<&Path>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    for folder in [user_folder, default_folder].into_iter().flatten() {
        let Ok(folder) = folder.canonicalize() else {
            tracing::debug!(path = %folder.display(), "repository folder does not exist");
            continue;
        };
        for repo in locate(&folder, MAX_SCAN_DEPTH) {
            let resolved = repo.canonicalize().unwrap_or(repo);
            if seen.insert(resolved.clone()) {
                roots.push(resolved);
            }
        }
    }

    roots
}

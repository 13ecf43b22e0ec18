//! Git-backed change detection (spec.md §4.9). Wraps `git2`'s tree diff
//! in a hard wall-clock timeout: a sync hook runs on every checkout and
//! merge, so a diff against a corrupt or enormous repo must never hang
//! the caller indefinitely.

use crate::error::{SyncError, SyncResult};
use git2::Repository;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Wall-clock budget for a single diff computation before giving up and
/// returning `SyncError::Timeout`.
pub const DIFF_TIMEOUT: Duration = Duration::from_secs(10);

/// Paths (repo-relative) that differ between `from` and `to`, each a
/// revspec `git2::Repository::revparse_single` can resolve (a branch
/// name, `ORIG_HEAD`, a sha, ...).
pub fn changed_files(repo_path: &Path, from: &str, to: &str) -> SyncResult<Vec<String>> {
    let (tx, rx) = mpsc::channel();
    let repo_path = repo_path.to_path_buf();
    let from = from.to_string();
    let to = to.to_string();

    thread::spawn(move || {
        let _ = tx.send(diff_now(&repo_path, &from, &to));
    });

    rx.recv_timeout(DIFF_TIMEOUT).unwrap_or(Err(SyncError::Timeout(DIFF_TIMEOUT)))
}

fn diff_now(repo_path: &Path, from: &str, to: &str) -> SyncResult<Vec<String>> {
    let repo = Repository::open(repo_path)?;
    let from_tree = repo.revparse_single(from)?.peel_to_tree()?;
    let to_tree = repo.revparse_single(to)?.peel_to_tree()?;
    let diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), None)?;

    let mut files = Vec::new();
    diff.foreach(
        &mut |delta, _| {
            let path = delta.new_file().path().or_else(|| delta.old_file().path());
            if let Some(path) = path {
                files.push(path.to_string_lossy().into_owned());
            }
            true
        },
        None,
        None,
        None,
    )?;
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn run(dir: &Path, args: &[&str]) {
        let status = Command::new("git").current_dir(dir).args(args).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init", "-q"]);
        run(dir.path(), &["config", "user.email", "test@example.com"]);
        run(dir.path(), &["config", "user.name", "test"]);
        dir
    }

    #[test]
    fn reports_files_changed_between_two_commits() {
        let dir = init_repo();
        std::fs::write(dir.path().join("a.rb"), "one").unwrap();
        run(dir.path(), &["add", "."]);
        run(dir.path(), &["commit", "-q", "-m", "first"]);

        std::fs::write(dir.path().join("b.rb"), "two").unwrap();
        run(dir.path(), &["add", "."]);
        run(dir.path(), &["commit", "-q", "-m", "second"]);

        let files = changed_files(dir.path(), "HEAD~1", "HEAD").unwrap();
        assert_eq!(files, vec!["b.rb".to_string()]);
    }

    #[test]
    fn identical_revisions_yield_no_changes() {
        let dir = init_repo();
        std::fs::write(dir.path().join("a.rb"), "one").unwrap();
        run(dir.path(), &["add", "."]);
        run(dir.path(), &["commit", "-q", "-m", "first"]);

        let files = changed_files(dir.path(), "HEAD", "HEAD").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn unresolvable_revision_is_an_error() {
        let dir = init_repo();
        std::fs::write(dir.path().join("a.rb"), "one").unwrap();
        run(dir.path(), &["add", "."]);
        run(dir.path(), &["commit", "-q", "-m", "first"]);

        assert!(changed_files(dir.path(), "HEAD", "not-a-real-ref").is_err());
    }
}

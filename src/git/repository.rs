//! Version-control collaborator: staged diff reads via git2, commits via the git CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Diff, DiffFormat, DiffStatsFormat, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::error::GitError;

/// Width used when rendering the `--stat` style summary.
const STAT_WIDTH: usize = 80;

/// Operations the commit flow needs from version control.
///
/// Reads are side-effect free; `commit` is the only mutating call and is
/// invoked at most once per accepted message.
pub trait VersionControl {
    /// Unified diff of the index against HEAD.
    fn staged_diff(&self) -> Result<String, GitError>;

    /// Per-file change counts of the index against HEAD.
    fn staged_stat(&self) -> Result<String, GitError>;

    /// Commit the staged changes with `message`, returning git's summary line.
    fn commit(&self, message: &str) -> Result<String, GitError>;
}

/// A non-bare git repository discovered from a working directory.
pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    /// Find the repository containing `path`, searching parent directories.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(GitError::NotARepository)?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or(GitError::BareRepository)?;
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn staged(&self) -> Result<Diff<'_>, GitError> {
        let head_tree = resolve_head_tree(&self.repo)?;
        self.repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .map_err(GitError::DiffFailed)
    }
}

impl VersionControl for GitRepository {
    fn staged_diff(&self) -> Result<String, GitError> {
        let diff = self.staged()?;
        let mut text = String::new();

        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let origin = line.origin();
            if origin == '+' || origin == '-' || origin == ' ' {
                text.push(origin);
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(GitError::DiffFailed)?;

        debug!("Staged diff is {} chars", text.chars().count());
        Ok(text)
    }

    fn staged_stat(&self) -> Result<String, GitError> {
        let diff = self.staged()?;
        let stats = diff.stats().map_err(GitError::DiffFailed)?;
        let buf = stats
            .to_buf(DiffStatsFormat::FULL, STAT_WIDTH)
            .map_err(GitError::DiffFailed)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        // The CLI runs hooks and signing exactly as a manual commit would.
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(["commit", "-m", message])
            .output()
            .map_err(GitError::GitUnavailable)?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(GitError::CommitFailed(detail));
        }

        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }
}

/// Resolve the HEAD tree, treating an unborn branch as an empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
        (dir, repo)
    }

    fn stage(repo: &Repository, dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    fn commit_all(repo: &Repository, message: &str) {
        let sig = Signature::now("Test User", "test@test.com").unwrap();
        let mut index = repo.index().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitRepository::discover(dir.path());
        assert!(matches!(result, Err(GitError::NotARepository(_))));
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let (dir, _repo) = init_repo();
        let nested = dir.path().join("src/nested");
        std::fs::create_dir_all(&nested).unwrap();

        let git = GitRepository::discover(&nested).unwrap();
        assert_eq!(
            git.workdir().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_staged_diff_empty_when_nothing_staged() {
        let (dir, repo) = init_repo();
        stage(&repo, dir.path(), "a.txt", "one\n");
        commit_all(&repo, "init");

        // Unstaged edits do not count
        std::fs::write(dir.path().join("a.txt"), "two\n").unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        assert!(git.staged_diff().unwrap().trim().is_empty());
    }

    #[test]
    fn test_staged_diff_on_unborn_branch() {
        let (dir, repo) = init_repo();
        stage(&repo, dir.path(), "new.txt", "hello world\n");

        let git = GitRepository::discover(dir.path()).unwrap();
        let diff = git.staged_diff().unwrap();
        assert!(diff.contains("new.txt"));
        assert!(diff.contains("+hello world"));
    }

    #[test]
    fn test_staged_diff_and_stat_for_modification() {
        let (dir, repo) = init_repo();
        stage(&repo, dir.path(), "file.txt", "original\n");
        commit_all(&repo, "init");
        stage(&repo, dir.path(), "file.txt", "modified\n");

        let git = GitRepository::discover(dir.path()).unwrap();
        let diff = git.staged_diff().unwrap();
        assert!(diff.contains("-original"));
        assert!(diff.contains("+modified"));

        let stat = git.staged_stat().unwrap();
        assert!(stat.contains("file.txt"));
        assert!(stat.contains("1 file changed"));
    }

    #[test]
    fn test_commit_records_message() {
        let (dir, repo) = init_repo();
        stage(&repo, dir.path(), "file.txt", "content\n");

        let git = GitRepository::discover(dir.path()).unwrap();
        git.commit("Add file").unwrap();

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message().unwrap().trim(), "Add file");
    }

    #[test]
    fn test_commit_with_nothing_staged_fails() {
        let (dir, repo) = init_repo();
        stage(&repo, dir.path(), "file.txt", "content\n");
        commit_all(&repo, "init");

        let git = GitRepository::discover(dir.path()).unwrap();
        let result = git.commit("Nothing here");
        assert!(matches!(result, Err(GitError::CommitFailed(_))));
    }
}

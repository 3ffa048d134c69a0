//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;

use git2::{Oid, Repository, Signature};

/// A scratch git repository with a configured identity.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");

        let mut config = repo.config().expect("Failed to open repo config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        config
            .set_bool("commit.gpgsign", false)
            .expect("Failed to disable signing");

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write `content` to `name` and add it to the index.
    pub fn stage(&self, name: &str, content: &str) {
        let file_path = self.dir.path().join(name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Commit whatever is in the index. Returns the commit OID.
    pub fn commit_index(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Message of the commit HEAD points to, if any.
    pub fn head_message(&self) -> Option<String> {
        let head = self.repo.head().ok()?.peel_to_commit().ok()?;
        head.message().map(|m| m.trim().to_string())
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }
}

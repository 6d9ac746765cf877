//! Shared test fixtures: a scriptable in-memory Git transport.
#![allow(dead_code)]

use async_trait::async_trait;
use git_config_provider::{
    AuthHandle, CloneRequest, Error, GitClient, GitConfigProvider, ParserRegistry, RemoteRef,
    RepoHandle, Result,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    refs: Vec<RemoteRef>,
    files: HashMap<String, Vec<u8>>,
    symlinks: HashMap<String, PathBuf>,
    branches: Vec<String>,
    tags: Vec<String>,
    commits: Vec<String>,
    list_failures: VecDeque<Error>,
    clone_failures: VecDeque<Error>,
    list_calls: u64,
    clone_calls: u64,
    last_clone_auth: Option<String>,
}

/// In-memory Git transport with scriptable failures.
///
/// A clone materializes the configured files into the target directory;
/// ref listings return the configured refs. Failures are queued and
/// consumed one call at a time.
pub struct MockGitClient {
    state: Mutex<MockState>,
}

impl MockGitClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                branches: vec!["main".to_string()],
                ..MockState::default()
            }),
        })
    }

    /// Point HEAD and `refs/heads/main` at a commit.
    pub fn set_head(&self, commit: &str) {
        let mut state = self.state.lock().unwrap();
        state.refs = vec![
            RemoteRef::new("HEAD", commit),
            RemoteRef::new("refs/heads/main", commit),
        ];
    }

    pub fn set_refs(&self, refs: Vec<RemoteRef>) {
        self.state.lock().unwrap().refs = refs;
    }

    /// Set the content a clone will materialize for `path`.
    pub fn put_file(&self, path: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_vec());
    }

    /// Make clones materialize a symlink, as a hostile repository would.
    pub fn put_symlink(&self, link: &str, target: &Path) {
        self.state
            .lock()
            .unwrap()
            .symlinks
            .insert(link.to_string(), target.to_path_buf());
    }

    pub fn add_branch(&self, name: &str) {
        self.state.lock().unwrap().branches.push(name.to_string());
    }

    pub fn add_tag(&self, name: &str) {
        self.state.lock().unwrap().tags.push(name.to_string());
    }

    pub fn add_commit(&self, hex: &str) {
        self.state.lock().unwrap().commits.push(hex.to_string());
    }

    /// Queue a failure for the next `list_refs` call.
    pub fn fail_next_list(&self, err: Error) {
        self.state.lock().unwrap().list_failures.push_back(err);
    }

    /// Queue a failure for the next `clone_repo` call.
    pub fn fail_next_clone(&self, err: Error) {
        self.state.lock().unwrap().clone_failures.push_back(err);
    }

    pub fn list_calls(&self) -> u64 {
        self.state.lock().unwrap().list_calls
    }

    pub fn clone_calls(&self) -> u64 {
        self.state.lock().unwrap().clone_calls
    }

    /// Username of the credential used by the most recent clone.
    pub fn last_clone_auth(&self) -> Option<String> {
        self.state.lock().unwrap().last_clone_auth.clone()
    }
}

#[async_trait]
impl GitClient for MockGitClient {
    async fn list_refs(
        &self,
        _repo_url: &str,
        _auth: Option<&AuthHandle>,
    ) -> Result<Vec<RemoteRef>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        Ok(state.refs.clone())
    }

    async fn clone_repo(&self, request: CloneRequest) -> Result<Box<dyn RepoHandle>> {
        let mut state = self.state.lock().unwrap();
        state.clone_calls += 1;
        state.last_clone_auth = request.auth.as_ref().map(|auth| match auth {
            AuthHandle::Basic { username, .. } => username.clone(),
            AuthHandle::SshKey { path, .. } => path.display().to_string(),
        });
        if let Some(err) = state.clone_failures.pop_front() {
            return Err(err);
        }

        for (path, content) in &state.files {
            let full = request.target_dir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io("fixture mkdir failed", Some(e)))?;
            }
            std::fs::write(&full, content)
                .map_err(|e| Error::io("fixture write failed", Some(e)))?;
        }

        for (link, target) in &state.symlinks {
            let full = request.target_dir.join(link);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io("fixture mkdir failed", Some(e)))?;
            }
            std::os::unix::fs::symlink(target, &full)
                .map_err(|e| Error::io("fixture symlink failed", Some(e)))?;
        }

        Ok(Box::new(MockRepo {
            root: request.target_dir.clone(),
            branches: state.branches.clone(),
            tags: state.tags.clone(),
            commits: state.commits.clone(),
        }))
    }
}

struct MockRepo {
    root: PathBuf,
    branches: Vec<String>,
    tags: Vec<String>,
    commits: Vec<String>,
}

impl RepoHandle for MockRepo {
    fn checkout_branch(&mut self, reference: &str) -> Result<()> {
        if self.branches.iter().any(|b| b == reference) {
            Ok(())
        } else {
            Err(Error::git(format!("branch {reference} not found")))
        }
    }

    fn checkout_tag(&mut self, reference: &str) -> Result<()> {
        if self.tags.iter().any(|t| t == reference) {
            Ok(())
        } else {
            Err(Error::git(format!("tag {reference} not found")))
        }
    }

    fn checkout_commit(&mut self, commit: &str) -> Result<()> {
        if self.commits.iter().any(|c| c == commit) {
            Ok(())
        } else {
            Err(Error::git(format!("commit {commit} not found")))
        }
    }

    fn worktree_root(&self) -> &Path {
        &self.root
    }
}

/// Provider wired to the mock transport with the default parser registry.
pub fn provider(git: Arc<MockGitClient>) -> GitConfigProvider {
    GitConfigProvider::new(git, ParserRegistry::with_defaults())
}

//! Git transport port.
//!
//! The provider never speaks the Git wire protocol itself; it drives an
//! implementation of [`GitClient`] supplied by the host. The contract is
//! deliberately small: list a remote's references without transferring
//! objects, and produce a shallow checked-out worktree.

use crate::domain::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Transport credential handed to the Git client.
///
/// Produced by the auth resolver, cached per `(kind, repository)` and treated
/// as immutable after insertion. `Debug` redacts secret fields.
#[derive(Clone)]
pub enum AuthHandle {
    Basic { username: String, password: String },
    SshKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHandle::Basic { username, .. } => f
                .debug_struct("AuthHandle::Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthHandle::SshKey { path, passphrase } => f
                .debug_struct("AuthHandle::SshKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

/// A remote reference and the commit it currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Full reference name, e.g. `refs/heads/main` or `HEAD`
    pub name: String,
    /// Commit hash in hex
    pub commit: String,
}

impl RemoteRef {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, commit: C) -> Self {
        Self {
            name: name.into(),
            commit: commit.into(),
        }
    }
}

/// Parameters for a shallow clone.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub repo_url: String,
    pub auth: Option<AuthHandle>,
    /// Directory the worktree is materialized into. Implementations must
    /// tolerate a retried clone into the same directory.
    pub target_dir: PathBuf,
    pub depth: u32,
    pub single_branch: bool,
    /// Full target reference (`refs/heads/<name>`) when the request pins a
    /// non-default branch; `None` clones the remote's default branch.
    pub reference: Option<String>,
}

/// A cloned repository with a materialized worktree.
pub trait RepoHandle: Send {
    fn checkout_branch(&mut self, reference: &str) -> Result<()>;
    fn checkout_tag(&mut self, reference: &str) -> Result<()>;
    fn checkout_commit(&mut self, commit: &str) -> Result<()>;
    /// Root of the checked-out file tree
    fn worktree_root(&self) -> &Path;
}

/// Abstract Git transport.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// List the remote's references without transferring objects
    /// (`git ls-remote`).
    async fn list_refs(
        &self,
        repo_url: &str,
        auth: Option<&AuthHandle>,
    ) -> Result<Vec<RemoteRef>>;

    /// Shallow-clone the repository into `request.target_dir`.
    async fn clone_repo(&self, request: CloneRequest) -> Result<Box<dyn RepoHandle>>;
}

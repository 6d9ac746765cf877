//! Load pipeline: resolve the head commit, consult the cache, and on a miss
//! clone, check out, read and parse the configuration file.

use super::Inner;
use crate::core::limits::{GIT_OPERATION_TIMEOUT, HEALTH_CHECK_TIMEOUT, MAX_CONFIG_FILE_SIZE};
use crate::domain::error::{Error, Result};
use crate::domain::ports::git::{CloneRequest, RemoteRef, RepoHandle};
use crate::domain::request::RepoRequest;
use crate::domain::value::ConfigValue;
use crate::infrastructure::cache::CacheKey;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

impl Inner {
    /// Full load: head resolution, cache consultation, clone on miss.
    ///
    /// A head-resolution failure falls through to a direct, cache-bypassing
    /// load so transient listing faults never make a loadable repository
    /// unloadable.
    pub(crate) async fn load_document(
        &self,
        cancel: &CancellationToken,
        request: &RepoRequest,
    ) -> Result<ConfigValue> {
        let commit = match self.resolve_head(cancel, request).await {
            Ok(commit) => commit,
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(err);
                }
                warn!(
                    repo = %request.repo_url(),
                    error = %err,
                    "head resolution failed, loading without cache"
                );
                self.metrics.increment_direct_loads();
                return self.load_direct(cancel, request).await;
            }
        };

        // Seed change detection: a watch must not treat the commit this load
        // already observed as a fresh change on its first poll tick.
        self.repo_cache.observe(request.repo_url(), &commit);

        let key = CacheKey {
            repo_url: request.repo_url().to_string(),
            file_path: request.file_path().to_string(),
            commit,
        };
        if let Some(document) = self.config_cache.get(&key) {
            self.metrics.increment_cache_hits();
            debug!(repo = %request.repo_url(), commit = %key.commit, "configuration served from cache");
            return Ok(document);
        }
        self.metrics.increment_cache_misses();

        let document = self.load_direct(cancel, request).await?;
        self.config_cache.put(key, document.clone());
        self.metrics.increment_configs_cached();
        Ok(document)
    }

    /// Resolve the commit the request's reference currently points at,
    /// via a retried lightweight ref listing.
    pub(crate) async fn resolve_head(
        &self,
        cancel: &CancellationToken,
        request: &RepoRequest,
    ) -> Result<String> {
        let auth = self.auth.resolve(request).await?;
        let refs = self
            .retry
            .run(cancel, "git ls-remote", || {
                let auth = auth.clone();
                async move {
                    match tokio::time::timeout(
                        GIT_OPERATION_TIMEOUT,
                        self.git.list_refs(request.repo_url(), auth.as_deref()),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(Error::git("timeout listing remote references")),
                    }
                }
            })
            .await?;

        Self::pick_reference(&refs, request.reference())
    }

    /// Match the target reference against a ref listing: branch first, then
    /// tag, then the remote's HEAD as the default-branch fallback.
    pub(crate) fn pick_reference(refs: &[RemoteRef], reference: &str) -> Result<String> {
        let branch = format!("refs/heads/{reference}");
        let tag = format!("refs/tags/{reference}");

        if let Some(found) = refs.iter().find(|r| r.name == branch || r.name == tag) {
            return Ok(found.commit.clone());
        }
        if let Some(head) = refs.iter().find(|r| r.name == "HEAD") {
            return Ok(head.commit.clone());
        }
        Err(Error::git(format!(
            "reference {reference} not found in remote repository"
        )))
    }

    /// Clone into a scoped workspace and read the file, bypassing the cache.
    async fn load_direct(
        &self,
        cancel: &CancellationToken,
        request: &RepoRequest,
    ) -> Result<ConfigValue> {
        let workspace = self.workspaces.acquire()?;
        self.metrics.increment_temp_dirs_created();
        // The workspace guard removes the directory on every exit path.
        self.clone_and_read(cancel, request, workspace.path()).await
    }

    async fn clone_and_read(
        &self,
        cancel: &CancellationToken,
        request: &RepoRequest,
        target: &Path,
    ) -> Result<ConfigValue> {
        let auth = self.auth.resolve(request).await?;
        let reference = request.reference();
        // A clone already lands on the default branch; only other
        // references need pinning and an explicit checkout.
        let pinned = !matches!(reference, "main" | "master");

        let mut repo = self
            .retry
            .run(cancel, "git clone", || {
                let clone_request = CloneRequest {
                    repo_url: request.repo_url().to_string(),
                    auth: auth.as_deref().cloned(),
                    target_dir: target.to_path_buf(),
                    depth: 1,
                    single_branch: true,
                    reference: pinned.then(|| format!("refs/heads/{reference}")),
                };
                async move {
                    match tokio::time::timeout(
                        GIT_OPERATION_TIMEOUT,
                        self.git.clone_repo(clone_request),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(Error::git("timeout cloning repository")),
                    }
                }
            })
            .await?;

        if pinned {
            Self::checkout_reference(repo.as_mut(), reference)?;
        }

        let root = repo.worktree_root().to_path_buf();
        self.read_config_file(&root, request.file_path()).await
    }

    /// Try the reference as a branch, then a tag, then a commit hash.
    fn checkout_reference(repo: &mut dyn RepoHandle, reference: &str) -> Result<()> {
        if repo.checkout_branch(reference).is_ok() {
            return Ok(());
        }
        if repo.checkout_tag(reference).is_ok() {
            return Ok(());
        }
        // Minimum viable abbreviated commit hash.
        if reference.len() >= 7
            && reference.chars().all(|c| c.is_ascii_hexdigit())
            && repo.checkout_commit(reference).is_ok()
        {
            return Ok(());
        }
        Err(Error::git(format!(
            "failed to checkout reference: {reference}"
        )))
    }

    /// Read and parse the configuration file from a checked-out worktree.
    ///
    /// The resolved path must remain a strict descendant of the worktree
    /// root; canonicalization catches symlinks escaping the repository.
    async fn read_config_file(&self, root: &Path, file_path: &str) -> Result<ConfigValue> {
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| Error::security(format!("failed to resolve repository root: {e}")))?;

        let candidate = root.join(file_path);
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(file_path));
            }
            Err(e) => {
                return Err(Error::io(
                    format!("failed to resolve configuration file path: {file_path}"),
                    Some(e),
                ));
            }
        };
        if resolved == root || !resolved.starts_with(&root) {
            return Err(Error::security(format!(
                "path traversal detected: {file_path} is outside repository root"
            )));
        }

        let content = tokio::fs::read(&resolved).await.map_err(|e| {
            Error::io(
                format!("failed to read configuration file: {file_path}"),
                Some(e),
            )
        })?;
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(Error::resource_limit(format!(
                "configuration file too large: {} bytes (max {})",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let extension = Path::new(file_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        self.parsers.parse(extension, &content)
    }

    /// Health probe: one bounded shallow-clone attempt into a scratch
    /// workspace. Succeeds iff the remote is reachable and the credential
    /// is accepted.
    pub(crate) async fn check_repository_health(
        &self,
        cancel: &CancellationToken,
        request: &RepoRequest,
    ) -> Result<()> {
        let auth = self.auth.resolve(request).await?;
        let workspace = self.workspaces.acquire()?;
        self.metrics.increment_temp_dirs_created();

        let clone_request = CloneRequest {
            repo_url: request.repo_url().to_string(),
            auth: auth.as_deref().cloned(),
            target_dir: workspace.path().to_path_buf(),
            depth: 1,
            single_branch: true,
            reference: None,
        };

        tokio::select! {
            result = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.git.clone_repo(clone_request)) => {
                match result {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(err)) => Err(Error::health_check(format!("repository not accessible: {err}"))),
                    Err(_) => Err(Error::health_check("repository not accessible: timed out")),
                }
            }
            _ = cancel.cancelled() => Err(Error::cancelled("health check")),
        }
    }
}

//! Provider facade: lifecycle, admission and resource governance.
//!
//! One [`GitConfigProvider`] instance owns every cache, workspace and watch
//! task it creates. `load` and `watch` are bounded by the concurrent
//! operation and active watch limits; `close` is idempotent and cancels all
//! in-flight watches.

mod load;
mod watch;

pub use watch::WatchStream;

use crate::core::limits::{MAX_ACTIVE_WATCHES, MAX_CONCURRENT_OPERATIONS};
use crate::core::url;
use crate::domain::error::{Error, Result};
use crate::domain::ports::git::GitClient;
use crate::domain::ports::parser::ParserRegistry;
use crate::domain::value::ConfigValue;
use crate::infrastructure::auth::AuthResolver;
use crate::infrastructure::cache::ConfigCache;
use crate::infrastructure::metrics::{MetricsSnapshot, ProviderMetrics};
use crate::infrastructure::repo_cache::RepoMetadataCache;
use crate::infrastructure::retry::{RetryController, RetryPolicy};
use crate::infrastructure::workspace::WorkspaceManager;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// Tunable provider parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Maximum cached configuration documents
    pub cache_max_size: usize,
    /// Time-to-live of a cached document
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cache_max_size: 100,
            cache_ttl: Duration::from_secs(600),
            retry: RetryPolicy::default(),
        }
    }
}

impl ProviderConfig {
    pub fn with_cache_capacity(mut self, max_size: usize) -> Self {
        self.cache_max_size = max_size;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Git-backed remote configuration provider.
pub struct GitConfigProvider {
    inner: Arc<Inner>,
}

/// Shared state behind the facade; watch tasks hold an `Arc` of this.
pub(crate) struct Inner {
    pub(crate) git: Arc<dyn GitClient>,
    pub(crate) parsers: Arc<ParserRegistry>,
    pub(crate) auth: AuthResolver,
    pub(crate) config_cache: ConfigCache,
    pub(crate) repo_cache: RepoMetadataCache,
    pub(crate) workspaces: WorkspaceManager,
    pub(crate) retry: RetryController,
    pub(crate) metrics: Arc<ProviderMetrics>,
    pub(crate) operation_count: AtomicI64,
    pub(crate) watch_count: AtomicI64,
    pub(crate) closed: AtomicBool,
    pub(crate) shutdown: CancellationToken,
    pub(crate) watch_tasks: TaskTracker,
}

/// Releases a claimed operation slot on every exit path.
struct OperationSlot<'a>(&'a AtomicI64);

impl Drop for OperationSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Inner {
    /// Claim a bounded counter slot; `false` at the limit.
    fn try_claim(counter: &AtomicI64, limit: i64) -> bool {
        let mut current = counter.load(Ordering::SeqCst);
        loop {
            if current >= limit {
                return false;
            }
            match counter.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl GitConfigProvider {
    pub fn new(git: Arc<dyn GitClient>, parsers: ParserRegistry) -> Self {
        Self::with_config(git, parsers, ProviderConfig::default())
    }

    pub fn with_config(
        git: Arc<dyn GitClient>,
        parsers: ParserRegistry,
        config: ProviderConfig,
    ) -> Self {
        let metrics = Arc::new(ProviderMetrics::new());
        Self {
            inner: Arc::new(Inner {
                git,
                parsers: Arc::new(parsers),
                auth: AuthResolver::new(),
                config_cache: ConfigCache::new(config.cache_max_size, config.cache_ttl),
                repo_cache: RepoMetadataCache::new(),
                workspaces: WorkspaceManager::new(),
                retry: RetryController::new(config.retry, Arc::clone(&metrics)),
                metrics,
                operation_count: AtomicI64::new(0),
                watch_count: AtomicI64::new(0),
                closed: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                watch_tasks: TaskTracker::new(),
            }),
        }
    }

    /// Human-readable provider label
    pub fn name(&self) -> &'static str {
        "Git Configuration Provider"
    }

    /// URL scheme this provider registers under
    pub fn scheme(&self) -> &'static str {
        "git"
    }

    /// Load the configuration document a URL points at.
    pub async fn load(
        &self,
        cancel: &CancellationToken,
        config_url: &str,
    ) -> Result<ConfigValue> {
        let started = Instant::now();
        let inner = &self.inner;
        inner.metrics.increment_load_requests();

        let result = async {
            if inner.closed.load(Ordering::SeqCst) {
                return Err(Error::ProviderClosed);
            }
            if !Inner::try_claim(&inner.operation_count, MAX_CONCURRENT_OPERATIONS) {
                return Err(Error::resource_limit(format!(
                    "maximum concurrent operations reached ({MAX_CONCURRENT_OPERATIONS})"
                )));
            }
            let _slot = OperationSlot(&inner.operation_count);

            let request = url::parse_request(config_url)?;
            inner.load_document(cancel, &request).await
        }
        .await;

        inner.metrics.record_load_time(started.elapsed());
        if let Err(err) = &result {
            inner.metrics.increment_failed_operations();
            inner.metrics.record_error(err);
        }
        result
    }

    /// Start watching the URL for configuration changes.
    ///
    /// The returned stream delivers one document per observed change,
    /// starting with an immediate load. It closes when `cancel` fires or
    /// the provider is closed.
    pub async fn watch(
        &self,
        cancel: &CancellationToken,
        config_url: &str,
    ) -> Result<WatchStream> {
        let inner = &self.inner;
        inner.metrics.increment_watch_requests();

        if inner.closed.load(Ordering::SeqCst) {
            inner.metrics.increment_failed_operations();
            return Err(Error::ProviderClosed);
        }
        if !Inner::try_claim(&inner.watch_count, MAX_ACTIVE_WATCHES) {
            inner.metrics.increment_failed_operations();
            return Err(Error::resource_limit(format!(
                "maximum active watches reached ({MAX_ACTIVE_WATCHES})"
            )));
        }

        let request = match url::parse_request(config_url) {
            Ok(request) => request,
            Err(err) => {
                inner.watch_count.fetch_sub(1, Ordering::SeqCst);
                inner.metrics.increment_failed_operations();
                inner.metrics.record_error(&err);
                return Err(err);
            }
        };

        // Capacity 1: the producer blocks until the consumer catches up,
        // deliveries are never silently dropped.
        let (tx, rx) = mpsc::channel(1);
        let _task = inner
            .watch_tasks
            .spawn(watch::run_watch(Arc::clone(inner), cancel.clone(), request, tx));

        Ok(WatchStream::new(rx))
    }

    /// Validate that this provider can handle the URL, without any I/O.
    pub fn validate(&self, config_url: &str) -> Result<()> {
        url::parse_request(config_url).map(|_| ())
    }

    /// Verify the repository is reachable and the credential is accepted.
    pub async fn health_check(
        &self,
        cancel: &CancellationToken,
        config_url: &str,
    ) -> Result<()> {
        let request = url::parse_request(config_url)?;
        self.inner.check_repository_health(cancel, &request).await
    }

    /// Idempotent teardown: cancels every watch, releases workspaces and
    /// clears the credential and metadata caches.
    pub async fn close(&self) -> Result<()> {
        let inner = &self.inner;
        if inner
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        info!("closing git configuration provider");
        inner.shutdown.cancel();
        inner.watch_tasks.close();
        inner.watch_tasks.wait().await;

        inner.workspaces.close_all();
        inner.auth.clear();
        inner.repo_cache.clear();
        Ok(())
    }

    /// Read-only metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner
            .metrics
            .snapshot(self.inner.config_cache.stats())
    }
}

//! Watch pipeline: timer-driven polling, change detection and bounded
//! stream delivery.
//!
//! Each watch runs as one tracked task: an immediate load, then one change
//! check per poll tick, reloading and delivering on change. The task exits
//! when the caller's token fires or the provider shuts down, releasing its
//! watch slot and closing the stream exactly once.

use super::Inner;
use crate::core::limits::CHANGE_CHECK_TIMEOUT;
use crate::domain::error::{Error, Result};
use crate::domain::request::RepoRequest;
use crate::domain::value::ConfigValue;
use crate::infrastructure::retry::RetryPolicy;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Single-consumer stream of configuration documents from one watch.
pub struct WatchStream {
    rx: mpsc::Receiver<ConfigValue>,
}

impl WatchStream {
    pub(crate) fn new(rx: mpsc::Receiver<ConfigValue>) -> Self {
        Self { rx }
    }

    /// Receive the next document; `None` once the watch has closed.
    pub async fn recv(&mut self) -> Option<ConfigValue> {
        self.rx.recv().await
    }

    /// Non-blocking poll of the stream.
    pub fn try_recv(&mut self) -> std::result::Result<ConfigValue, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

/// Gates the "change check failed, assume changed" reload path behind the
/// retry policy's backoff so a persistent outage cannot clone every tick.
struct FailureGate {
    policy: RetryPolicy,
    consecutive_failures: u32,
    next_allowed: Option<Instant>,
}

impl FailureGate {
    fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            next_allowed: None,
        }
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.next_allowed = None;
    }

    /// Report one failed check; returns whether a forced reload may run now.
    fn permit(&mut self) -> bool {
        let now = Instant::now();
        if let Some(gate) = self.next_allowed {
            if now < gate {
                return false;
            }
        }
        let delay = self.policy.delay_for(self.consecutive_failures);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.next_allowed = Some(now + delay);
        true
    }
}

/// Body of one watch task.
pub(crate) async fn run_watch(
    inner: Arc<Inner>,
    caller: CancellationToken,
    request: RepoRequest,
    tx: mpsc::Sender<ConfigValue>,
) {
    info!(
        repo = %request.repo_url(),
        file = %request.file_path(),
        interval_s = request.poll_interval().as_secs(),
        "watch started"
    );

    run_watch_loop(&inner, &caller, &request, &tx).await;

    inner.watch_count.fetch_sub(1, Ordering::SeqCst);
    info!(repo = %request.repo_url(), file = %request.file_path(), "watch stopped");
    // Dropping `tx` here closes the stream; the consumer sees `None`.
}

async fn run_watch_loop(
    inner: &Inner,
    caller: &CancellationToken,
    request: &RepoRequest,
    tx: &mpsc::Sender<ConfigValue>,
) {
    if caller.is_cancelled() || inner.shutdown.is_cancelled() {
        return;
    }

    // Starting state: one immediate load. A failure here is not fatal; the
    // first load may race against the repository becoming ready.
    match inner.load_document(caller, request).await {
        Ok(document) => {
            if !deliver(tx, caller, &inner.shutdown, document).await {
                return;
            }
        }
        Err(err) => {
            warn!(repo = %request.repo_url(), error = %err, "initial watch load failed");
        }
    }

    let mut ticker = tokio::time::interval(request.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The interval's first tick completes immediately; consume it so the
    // first poll happens one period after the initial load.
    ticker.tick().await;

    let mut failure_gate = FailureGate::new(inner.retry.policy().clone());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = caller.cancelled() => return,
            _ = inner.shutdown.cancelled() => return,
        }

        if !has_changed(inner, caller, request, &mut failure_gate).await {
            continue;
        }

        match inner.load_document(caller, request).await {
            Ok(document) => {
                if !deliver(tx, caller, &inner.shutdown, document).await {
                    return;
                }
            }
            Err(err) => {
                debug!(repo = %request.repo_url(), error = %err, "watch reload failed");
            }
        }
    }
}

/// Change detection for one tick.
///
/// A failed check conservatively reports a change (updates must not be
/// missed during network trouble), rate-limited by the failure gate.
async fn has_changed(
    inner: &Inner,
    caller: &CancellationToken,
    request: &RepoRequest,
    failure_gate: &mut FailureGate,
) -> bool {
    match remote_commit(inner, caller, request).await {
        Ok(commit) => {
            failure_gate.reset();
            inner.repo_cache.observe(request.repo_url(), &commit)
        }
        Err(Error::Cancelled { .. }) => false,
        Err(err) => {
            debug!(repo = %request.repo_url(), error = %err, "change check failed, assuming changed");
            failure_gate.permit()
        }
    }
}

/// Current remote commit for the watched reference, bounded by the short
/// change-check timeout and without retries.
async fn remote_commit(
    inner: &Inner,
    caller: &CancellationToken,
    request: &RepoRequest,
) -> Result<String> {
    let auth = inner.auth.resolve(request).await?;

    let listing = tokio::select! {
        listing = tokio::time::timeout(
            CHANGE_CHECK_TIMEOUT,
            inner.git.list_refs(request.repo_url(), auth.as_deref()),
        ) => listing,
        _ = caller.cancelled() => return Err(Error::cancelled("change check")),
        _ = inner.shutdown.cancelled() => return Err(Error::cancelled("change check")),
    };

    let refs = match listing {
        Ok(result) => result?,
        Err(_) => return Err(Error::git("timeout listing remote references")),
    };
    Inner::pick_reference(&refs, request.reference())
}

/// Deliver a document, abandoning the send if cancellation fires first.
/// Returns `false` when the watch should stop.
async fn deliver(
    tx: &mpsc::Sender<ConfigValue>,
    caller: &CancellationToken,
    shutdown: &CancellationToken,
    document: ConfigValue,
) -> bool {
    tokio::select! {
        sent = tx.send(document) => sent.is_ok(),
        _ = caller.cancelled() => false,
        _ = shutdown.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn failure_gate_permits_the_first_failure() {
        let mut gate = FailureGate::new(RetryPolicy::default());
        assert!(gate.permit());
    }

    #[test]
    fn failure_gate_blocks_inside_the_backoff_window() {
        // One second of base delay keeps the gate shut for the rest of a
        // fast-running test.
        let mut gate = FailureGate::new(RetryPolicy::default());
        assert!(gate.permit());
        assert!(!gate.permit());
        assert!(!gate.permit());
    }

    #[test]
    fn failure_gate_reopens_after_the_window() {
        let policy = RetryPolicy::default().with_base_delay(Duration::ZERO);
        let mut gate = FailureGate::new(policy);
        assert!(gate.permit());
        // Zero delay: the window has already elapsed.
        assert!(gate.permit());
    }

    #[test]
    fn failure_gate_reset_clears_the_streak() {
        let mut gate = FailureGate::new(RetryPolicy::default());
        assert!(gate.permit());
        assert!(!gate.permit());
        gate.reset();
        assert!(gate.permit());
    }
}

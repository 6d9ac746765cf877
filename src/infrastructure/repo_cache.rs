//! Last-observed commit per repository, used by watch change detection.

use dashmap::DashMap;
use std::time::Instant;

/// Cached observation of a repository's head
#[derive(Debug, Clone)]
pub struct RepoMetadata {
    pub last_commit: String,
    pub last_check: Instant,
}

/// Concurrent map from repository URL to its last observed commit.
#[derive(Default)]
pub struct RepoMetadataCache {
    entries: DashMap<String, RepoMetadata>,
}

impl RepoMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a commit observation and report whether it differs from the
    /// previous one. A first observation counts as a change.
    pub fn observe(&self, repo_url: &str, commit: &str) -> bool {
        let changed = self
            .entries
            .get(repo_url)
            .map_or(true, |metadata| metadata.last_commit != commit);

        if changed {
            self.entries.insert(
                repo_url.to_string(),
                RepoMetadata {
                    last_commit: commit.to_string(),
                    last_check: Instant::now(),
                },
            );
        }

        changed
    }

    pub fn last_commit(&self, repo_url: &str) -> Option<String> {
        self.entries
            .get(repo_url)
            .map(|metadata| metadata.last_commit.clone())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_a_change() {
        let cache = RepoMetadataCache::new();
        assert!(cache.observe("repo", "c1"));
        assert_eq!(cache.last_commit("repo"), Some("c1".to_string()));
    }

    #[test]
    fn same_commit_is_not_a_change() {
        let cache = RepoMetadataCache::new();
        cache.observe("repo", "c1");
        assert!(!cache.observe("repo", "c1"));
        assert!(cache.observe("repo", "c2"));
        assert_eq!(cache.last_commit("repo"), Some("c2".to_string()));
    }

    #[test]
    fn clear_forgets_observations() {
        let cache = RepoMetadataCache::new();
        cache.observe("repo", "c1");
        cache.clear();
        assert!(cache.last_commit("repo").is_none());
        assert!(cache.observe("repo", "c1"));
    }
}

//! TTL cache for task analyses, keyed by normalized task text.
//!
//! Backed by a moka cache, which is safe for concurrent get/insert across
//! runs and evicts expired entries lazily. A TTL of zero disables caching.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{AnalysisResult, PipelineConfig};

/// Shared analysis cache.
#[derive(Clone)]
pub struct AnalysisCache {
    entries: Option<Cache<String, Arc<AnalysisResult>>>,
}

impl AnalysisCache {
    /// Create a cache with the given TTL and capacity. A zero TTL disables it.
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let entries = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { entries }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Duration::from_secs(config.analysis_cache_ttl_secs),
            config.analysis_cache_capacity,
        )
    }

    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub const fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    fn key(task: &str) -> String {
        task.trim().to_string()
    }

    pub async fn get(&self, task: &str) -> Option<AnalysisResult> {
        let entries = self.entries.as_ref()?;
        entries.get(&Self::key(task)).await.map(|cached| (*cached).clone())
    }

    pub async fn insert(&self, task: &str, analysis: AnalysisResult) {
        if let Some(entries) = &self.entries {
            entries.insert(Self::key(task), Arc::new(analysis)).await;
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
        }
    }
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("enabled", &self.is_enabled())
            .field(
                "entries",
                &self.entries.as_ref().map_or(0, |entries| entries.entry_count()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_insert_uses_trimmed_key() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        let analysis = AnalysisResult::heuristic(12);

        cache.insert("  plan a trip  ", analysis.clone()).await;

        assert_eq!(cache.get("plan a trip").await, Some(analysis));
        assert_eq!(cache.get("plan another trip").await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = AnalysisCache::new(Duration::ZERO, 10);
        assert!(!cache.is_enabled());

        cache.insert("task", AnalysisResult::heuristic(1)).await;
        assert_eq!(cache.get("task").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = AnalysisCache::new(Duration::from_millis(50), 10);
        cache.insert("task", AnalysisResult::heuristic(1)).await;
        assert!(cache.get("task").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("task").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = AnalysisCache::new(Duration::from_secs(60), 10);
        cache.insert("task", AnalysisResult::heuristic(1)).await;
        cache.invalidate_all();
        assert!(cache.get("task").await.is_none());
    }
}

//! Request-scoped memo of per-pipeline build lists.
//!
//! The pipeline and codebase domains both need each pipeline's BuildRecords.
//! Entries are keyed by (pipeline id, window), populated once, and read-only
//! afterwards; the cache lives and dies with one report request, so there is
//! no cross-request bleed.

use std::sync::Arc;

use moka::future::Cache;

use crate::adapters::error::AdapterError;
use crate::adapters::traits::{PipelineClient, PipelineSpec};
use crate::adapters::types::{BuildRecord, ReportWindow};
use crate::observability::adapter_metrics;

#[derive(Clone)]
pub struct BuildCache {
    cache: Cache<(String, ReportWindow), Arc<Vec<BuildRecord>>>,
}

impl Default for BuildCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildCache {
    pub fn new() -> Self {
        Self {
            // One entry per pipeline per request; capacity is just a bound.
            cache: Cache::builder().max_capacity(256).build(),
        }
    }

    /// Fetch the pipeline's builds through the cache. Concurrent lookups for
    /// the same key coalesce into a single adapter call; errors are not
    /// cached, so a retried domain fetches again.
    pub async fn get_or_fetch(
        &self,
        client: Arc<dyn PipelineClient>,
        pipeline: &PipelineSpec,
        window: &ReportWindow,
    ) -> Result<Arc<Vec<BuildRecord>>, Arc<AdapterError>> {
        let key = (pipeline.id.clone(), *window);
        if let Some(builds) = self.cache.get(&key).await {
            adapter_metrics().record_cache_hit();
            tracing::debug!(pipeline.id = %pipeline.id, "Build cache hit");
            return Ok(builds);
        }
        adapter_metrics().record_cache_miss();

        let pipeline = pipeline.clone();
        let window = *window;
        self.cache
            .try_get_with(key, async move {
                client
                    .fetch_builds(&pipeline, &window)
                    .await
                    .map(Arc::new)
            })
            .await
    }
}

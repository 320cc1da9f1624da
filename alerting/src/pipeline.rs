//! Classification pipeline.
//!
//! Ties the classifier, grouper, dedup cache, factory, and store together:
//! text chunk → records → groups → per group: dedup decision → active-set
//! duplicate check → alert creation. The pipeline is shared across streams;
//! the dedup cache sits behind a single lock and the store serializes its
//! own mutation, so concurrent streams interleave safely (no I/O happens
//! inside the critical path).
//!
//! Failures inside classification or grouping never propagate to the stream
//! consumer; they are contained here and surfaced as a `processing-error`
//! system alert carrying the original text.

use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::alert::{Alert, AlertContext, AlertFactory, AlertSource, SharedAlertStore, StoreError};
use crate::classify::{classify, ClassifyError};
use crate::dedup::{DedupCache, DedupConfig};
use crate::grouping::{group, AlertGroup};
use crate::normalize::normalize;

/// Characters of normalized text carried into an alert's content field.
const CONTENT_EXCERPT_CHARS: usize = 500;

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub dedup: DedupConfig,
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("dedup cache lock poisoned")]
    CacheLock,
}

/// Shared pipeline turning raw stream chunks into stored alerts.
pub struct AlertPipeline {
    store: SharedAlertStore,
    dedup: Mutex<DedupCache>,
}

impl AlertPipeline {
    pub fn new(store: SharedAlertStore, config: PipelineConfig) -> Self {
        Self {
            store,
            dedup: Mutex::new(DedupCache::new(config.dedup)),
        }
    }

    /// The store this pipeline feeds.
    pub fn store(&self) -> &SharedAlertStore {
        &self.store
    }

    /// Process one quiesced chunk from a stream.
    ///
    /// Infallible toward the caller: classification misses return an empty
    /// list, and internal failures come back as a single contained
    /// `processing-error` alert instead of an error.
    pub fn process_chunk(&self, source: AlertSource, raw: &str) -> Vec<Alert> {
        let text = normalize(raw);
        match self.run(source, &text) {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(%source, error = %e, "pipeline failure contained");
                self.fallback_alert(&text, e)
            }
        }
    }

    fn run(&self, source: AlertSource, text: &str) -> Result<Vec<Alert>, PipelineError> {
        let records = classify(text)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let groups = group(records);
        debug!(%source, groups = groups.len(), "chunk classified");

        let mut created = Vec::new();
        for group in &groups {
            if let Some(alert) = self.admit(source, text, group)? {
                created.push(alert);
            }
        }
        Ok(created)
    }

    fn admit(
        &self,
        source: AlertSource,
        text: &str,
        group: &AlertGroup,
    ) -> Result<Option<Alert>, PipelineError> {
        let module = group.module_name();
        let signature = group.signature_text();

        let (decision, occurrences) = {
            let mut dedup = self.dedup.lock().map_err(|_| PipelineError::CacheLock)?;
            let decision = dedup.observe(module, &signature, text);
            let occurrences = module
                .and_then(|m| dedup.context(m))
                .map(|ctx| ctx.count)
                .unwrap_or(group.count as u64);
            (decision, occurrences)
        };

        if !decision.is_admitted() {
            debug!(key = %group.key, "group suppressed by dedup cache");
            return Ok(None);
        }

        // A still-active alert for the same logical cause blocks a visible
        // duplicate even after the dedup windows lapse.
        if self.store.has_active(group.variant.kind_str(), &group.key)? {
            debug!(key = %group.key, "alert already active, skipping");
            return Ok(None);
        }

        let ctx = AlertContext {
            source,
            captured_at: Utc::now(),
            raw_excerpt: text.chars().take(CONTENT_EXCERPT_CHARS).collect(),
            occurrences,
        };
        let alert = self.store.create_alert(AlertFactory::from_group(group, ctx))?;
        Ok(Some(alert))
    }

    fn fallback_alert(&self, text: &str, e: PipelineError) -> Vec<Alert> {
        match self
            .store
            .create_alert(AlertFactory::processing_error(text, e))
        {
            Ok(alert) => vec![alert],
            Err(store_err) => {
                error!(error = %store_err, "failed to store processing-error alert");
                Vec::new()
            }
        }
    }

    /// Clear the dedup cache. Test-isolation hook; the store is untouched.
    pub fn reset(&self) {
        if let Ok(mut dedup) = self.dedup.lock() {
            dedup.reset();
        }
    }
}

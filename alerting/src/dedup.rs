//! Dedup / debounce cache.
//!
//! Two independent time-windowed suppression tiers, both consulted for
//! every occurrence: a coarse tier keyed by `module-error:<name>` (or a raw
//! text prefix when no module name exists) with a short window, and a
//! module tier keyed by module name alone with a long window. An occurrence
//! is admitted only when both tiers report the key stale.
//!
//! Suppression never discards diagnostic value: the per-module context
//! accumulator is updated on every observation, admitted or not, so the
//! eventual alert can report how often and from where an error fired while
//! rate limiting held it back.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Characters of raw text used for the coarse key when no module name exists.
const COARSE_TEXT_KEY_CHARS: usize = 150;
/// Characters of each stored context excerpt.
const CONTEXT_EXCERPT_CHARS: usize = 300;
/// Excerpts retained per module.
const CONTEXT_EXCERPT_CAP: usize = 5;
/// Shared-prefix length treated as a near-duplicate excerpt.
const CONTEXT_DUP_PREFIX_CHARS: usize = 100;

/// Time-tier compaction: past this many entries, keep the most recent half.
const TIER_COMPACT_THRESHOLD: usize = 100;
const TIER_COMPACT_KEEP: usize = 50;
/// Context compaction is frequency-based, not recency-based.
const CONTEXT_COMPACT_THRESHOLD: usize = 50;
const CONTEXT_COMPACT_KEEP: usize = 25;

/// Suppression windows for the two tiers.
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    /// Coarse tier window (per occurrence signature).
    pub coarse_window: Duration,
    /// Module tier window (per module name).
    pub module_window: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            coarse_window: Duration::from_secs(1),
            module_window: Duration::from_secs(5),
        }
    }
}

/// Outcome of consulting the cache for one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// Both tiers stale; the occurrence may become an alert.
    Admitted,
    /// At least one tier saw this signature inside its window.
    Suppressed,
}

impl DedupDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, DedupDecision::Admitted)
    }
}

/// Origin of a chunk, inferred from console markers in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Browser,
    Node,
}

/// Diagnostic context retained per module even while occurrences are
/// suppressed.
#[derive(Debug, Clone, Serialize)]
pub struct ContextAccumulator {
    /// Total occurrences observed, including suppressed ones.
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Up to five distinct text excerpts, oldest dropped first.
    pub contexts: Vec<String>,
    pub source_types: BTreeSet<SourceType>,
}

impl ContextAccumulator {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            first_seen: now,
            last_seen: now,
            contexts: Vec::new(),
            source_types: BTreeSet::new(),
        }
    }

    fn record(&mut self, chunk: &str, now: DateTime<Utc>) {
        self.count += 1;
        self.last_seen = now;
        self.source_types.insert(infer_source_type(chunk));

        let excerpt = char_prefix(chunk, CONTEXT_EXCERPT_CHARS);
        let near_duplicate = self.contexts.iter().any(|existing| {
            char_prefix(existing, CONTEXT_DUP_PREFIX_CHARS)
                == char_prefix(&excerpt, CONTEXT_DUP_PREFIX_CHARS)
        });
        if !near_duplicate {
            self.contexts.push(excerpt);
            if self.contexts.len() > CONTEXT_EXCERPT_CAP {
                self.contexts.remove(0);
            }
        }
    }
}

/// Two-tier suppression cache plus per-module context accumulation.
///
/// Mutable state lives behind whatever serialization the owner provides
/// (the pipeline holds it in a mutex); timestamps are monotonically
/// refreshed, so last-writer-wins is safe.
#[derive(Debug)]
pub struct DedupCache {
    config: DedupConfig,
    coarse: HashMap<String, Instant>,
    module: HashMap<String, Instant>,
    contexts: HashMap<String, ContextAccumulator>,
}

impl DedupCache {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            coarse: HashMap::new(),
            module: HashMap::new(),
            contexts: HashMap::new(),
        }
    }

    /// Consult and refresh both tiers for one occurrence.
    ///
    /// `module` is the extracted module name, when one exists; `signature`
    /// stands in for the raw occurrence text used as the coarse key
    /// fallback; `chunk` feeds the context accumulator.
    pub fn observe(&mut self, module: Option<&str>, signature: &str, chunk: &str) -> DedupDecision {
        self.observe_at(module, signature, chunk, Instant::now(), Utc::now())
    }

    /// Clock-explicit variant of [`observe`](Self::observe) for tests.
    pub fn observe_at(
        &mut self,
        module: Option<&str>,
        signature: &str,
        chunk: &str,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> DedupDecision {
        let coarse_key = match module {
            Some(name) => format!("module-error:{}", name),
            None => char_prefix(signature, COARSE_TEXT_KEY_CHARS),
        };

        let coarse_stale = is_stale(&self.coarse, &coarse_key, now, self.config.coarse_window);
        let module_stale = match module {
            Some(name) => is_stale(&self.module, name, now, self.config.module_window),
            None => true,
        };

        self.coarse.insert(coarse_key, now);
        compact_tier(&mut self.coarse);

        if let Some(name) = module {
            self.module.insert(name.to_string(), now);
            compact_tier(&mut self.module);

            self.contexts
                .entry(name.to_string())
                .or_insert_with(|| ContextAccumulator::new(wall))
                .record(chunk, wall);
            compact_contexts(&mut self.contexts);
        }

        if coarse_stale && module_stale {
            DedupDecision::Admitted
        } else {
            debug!(module = module.unwrap_or("<none>"), "occurrence suppressed");
            DedupDecision::Suppressed
        }
    }

    /// Accumulated context for a module, if any occurrence has been seen.
    pub fn context(&self, module: &str) -> Option<&ContextAccumulator> {
        self.contexts.get(module)
    }

    /// Clear all tiers and accumulators. Test-isolation hook.
    pub fn reset(&mut self) {
        self.coarse.clear();
        self.module.clear();
        self.contexts.clear();
    }

    /// Entry counts per tier: (coarse, module, contexts).
    pub fn tier_sizes(&self) -> (usize, usize, usize) {
        (self.coarse.len(), self.module.len(), self.contexts.len())
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

fn is_stale(tier: &HashMap<String, Instant>, key: &str, now: Instant, window: Duration) -> bool {
    tier.get(key)
        .map_or(true, |last| now.duration_since(*last) >= window)
}

fn compact_tier(tier: &mut HashMap<String, Instant>) {
    if tier.len() <= TIER_COMPACT_THRESHOLD {
        return;
    }
    let mut entries: Vec<(String, Instant)> = tier.drain().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(TIER_COMPACT_KEEP);
    tier.extend(entries);
    debug!(kept = TIER_COMPACT_KEEP, "dedup tier compacted");
}

fn compact_contexts(contexts: &mut HashMap<String, ContextAccumulator>) {
    if contexts.len() <= CONTEXT_COMPACT_THRESHOLD {
        return;
    }
    let mut entries: Vec<(String, ContextAccumulator)> = contexts.drain().collect();
    entries.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    entries.truncate(CONTEXT_COMPACT_KEEP);
    contexts.extend(entries);
    debug!(kept = CONTEXT_COMPACT_KEEP, "context cache compacted");
}

const BROWSER_MARKERS: &[&str] = &[
    "Uncaught ",
    "console.error",
    "window is not defined",
    "document is not defined",
];

fn infer_source_type(chunk: &str) -> SourceType {
    if BROWSER_MARKERS.iter().any(|m| chunk.contains(m)) {
        SourceType::Browser
    } else {
        SourceType::Node
    }
}

/// Char-safe prefix; byte slicing would split multi-byte sequences.
fn char_prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

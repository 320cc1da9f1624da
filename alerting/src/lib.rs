//! Diagnostic alerting core for sandboxed code execution.
//!
//! Ingests raw diagnostic text (package-manager output, runtime panics,
//! browser-style console errors) and turns it into classified, deduplicated,
//! severity-ranked alerts:
//!
//! - `normalize`: strips escape sequences and unifies line endings before
//!   anything looks at the text
//! - `classify`: ordered pattern rules producing typed `ErrorRecord`s
//! - `grouping`: batches same-cause records into `AlertGroup`s
//! - `dedup`: two-tier time-windowed suppression with per-module context
//!   accumulation
//! - `alert`: the `Alert` model, factory, and bounded priority store with
//!   history and broadcast change notification
//! - `pipeline`: ties the stages together with contained error handling
//! - `stream`: per-session monitors with trailing-edge debounce and
//!   structured preview-host messages
//!
//! Alerts and caches are in-memory and process-lifetime only; classification
//! is heuristic pattern matching, not a parser, and can both miss and
//! over-match.

pub mod alert;
pub mod classify;
pub mod dedup;
pub mod grouping;
pub mod normalize;
pub mod pipeline;
pub mod stream;

// Re-export the alert surface
pub use alert::{
    Alert, AlertContext, AlertDraft, AlertFactory, AlertMetadata, AlertSource, AlertStore,
    AlertStoreConfig, AlertStoreEvent, Severity, SharedAlertStore, StoreError, StoreResult,
};

// Re-export classification types
pub use classify::{
    classify, ClassifyError, ClassifyResult, ErrorRecord, GoroutineErrorType, ImportType,
    NpmFailure, RecordVariant,
};

// Re-export grouping types
pub use grouping::{group, AlertGroup};

// Re-export dedup types
pub use dedup::{ContextAccumulator, DedupCache, DedupConfig, DedupDecision, SourceType};

// Re-export pipeline and stream types
pub use normalize::normalize;
pub use pipeline::{AlertPipeline, PipelineConfig};
pub use stream::{PreviewMessage, StreamMonitor};

//! Alert data model.
//!
//! An [`Alert`] is the user-facing record of one classified, deduplicated
//! diagnostic event. The serialized surface is camelCase to match the
//! canonical transport shape consumed by presentation layers
//! (`{id, type, title, ..., suggestedAction}`); everything behind it stays
//! in-process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{GoroutineErrorType, ImportType, NpmFailure};

/// Severity ladder. The derived order (`Info < Warning < Error < Critical`)
/// governs both display priority and store eviction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an alert originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    Terminal,
    Preview,
    System,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::Terminal => "terminal",
            AlertSource::Preview => "preview",
            AlertSource::System => "system",
        }
    }
}

impl std::fmt::Display for AlertSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Variant-tagged alert metadata. A closed union with an explicit
/// discriminant, one shape per error family; never an open dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AlertMetadata {
    Module {
        module_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        col: Option<u32>,
        import_type: ImportType,
        related_packages: Vec<String>,
        occurrences: u64,
    },
    Goroutine {
        error_type: GoroutineErrorType,
        goroutine_id: String,
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_file: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_line: Option<u32>,
        stack: Vec<String>,
    },
    Npm {
        module_name: String,
        reason: NpmFailure,
        occurrences: u64,
    },
    Preview {
        file_path: String,
        line: u32,
        col: u32,
    },
}

impl AlertMetadata {
    /// The dedup-relevant key of this metadata: module name for module/npm
    /// variants, error type for goroutines, file path for preview errors.
    pub fn group_key(&self) -> &str {
        match self {
            AlertMetadata::Module { module_name, .. } => module_name,
            AlertMetadata::Goroutine { error_type, .. } => error_type.as_str(),
            AlertMetadata::Npm { module_name, .. } => module_name,
            AlertMetadata::Preview { file_path, .. } => file_path,
        }
    }

    /// Module name, when this metadata carries one.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            AlertMetadata::Module { module_name, .. } => Some(module_name),
            AlertMetadata::Npm { module_name, .. } => Some(module_name),
            _ => None,
        }
    }
}

/// A live, user-facing alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique opaque id, distinct across the active set and history.
    pub id: String,

    /// Stable kind string (`module-not-found`, `goroutine`, ...). Serialized
    /// as `type` for transport compatibility.
    #[serde(rename = "type")]
    pub kind: String,

    pub title: String,

    pub description: String,

    /// Raw excerpt of the diagnostic text that produced this alert.
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AlertSource>,

    pub severity: Severity,

    /// Creation time, filled by the store when the draft omits it.
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AlertMetadata>,

    pub actionable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl Alert {
    /// The dedup key carried in this alert's metadata, if any.
    pub fn group_key(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.group_key())
    }
}

/// Builder for alerts submitted to the store. Missing `id`/`timestamp` are
/// filled at creation; severity defaults to `Error`, `actionable` to true.
#[derive(Debug, Clone, Default)]
pub struct AlertDraft {
    pub kind: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub source: Option<AlertSource>,
    pub severity: Option<Severity>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<AlertMetadata>,
    pub actionable: Option<bool>,
    pub suggested_action: Option<String>,
}

impl AlertDraft {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source(mut self, source: AlertSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: AlertMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_actionable(mut self, actionable: bool) -> Self {
        self.actionable = Some(actionable);
        self
    }

    pub fn with_suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    /// Materialize the draft, filling id, timestamp, and defaults.
    pub(crate) fn into_alert(self) -> Alert {
        Alert {
            id: uuid::Uuid::new_v4().to_string(),
            kind: self.kind,
            title: self.title,
            description: self.description,
            content: self.content,
            source: self.source,
            severity: self.severity.unwrap_or(Severity::Error),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            metadata: self.metadata,
            actionable: self.actionable.unwrap_or(true),
            suggested_action: self.suggested_action,
        }
    }
}

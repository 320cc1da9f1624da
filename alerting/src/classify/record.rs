//! Structured classification records.
//!
//! One [`ErrorRecord`] per recognized diagnostic occurrence. Records are
//! ephemeral: produced by [`classify`](super::classify), consumed by the
//! grouper within the same pass, never stored.

use serde::{Deserialize, Serialize};

/// How a module was referenced at the failing import site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// Relative path import (`./` or `../`).
    Static,
    /// Bare package specifier resolved from node_modules.
    Dynamic,
}

/// Why a package-manager operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NpmFailure {
    /// 404 from the registry; the requested version is kept for the report.
    NotInRegistry { requested_version: String },
    /// Peer dependency conflict; `requester` is the already-installed package.
    PeerConflict { requester: String },
    /// The registry knows the package but not the requested range.
    NoMatchingVersion { requested: String },
    /// EACCES while touching the cache or install tree.
    Permissions { path: String },
}

/// Flavor of a goroutine-style runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoroutineErrorType {
    /// `too many writes on closed pipe`
    ClosedPipe,
    /// `panic: <message>`
    Panic,
    /// `all goroutines are asleep - deadlock!`
    Deadlock,
    /// Generic `error:` / `fatal error: <message>`
    Fatal,
}

impl GoroutineErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoroutineErrorType::ClosedPipe => "closed_pipe",
            GoroutineErrorType::Panic => "panic",
            GoroutineErrorType::Deadlock => "deadlock",
            GoroutineErrorType::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for GoroutineErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discriminant of an [`ErrorRecord`], used for grouping keys and alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordVariant {
    ModuleNotFound,
    Goroutine,
    NpmRegistry,
    PreviewSyntax,
}

impl RecordVariant {
    /// Stable alert-kind string for this variant.
    pub fn kind_str(&self) -> &'static str {
        match self {
            RecordVariant::ModuleNotFound => "module-not-found",
            RecordVariant::Goroutine => "goroutine",
            RecordVariant::NpmRegistry => "npm-registry",
            RecordVariant::PreviewSyntax => "preview-syntax",
        }
    }
}

impl std::fmt::Display for RecordVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind_str())
    }
}

/// All recognized diagnostic shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorRecord {
    /// `Cannot find module '<name>'`, paired with the nearest stack frame.
    ModuleNotFound {
        module_name: String,
        file_path: Option<String>,
        line: Option<u32>,
        col: Option<u32>,
        import_type: ImportType,
        related_packages: Vec<String>,
        stack: Vec<String>,
    },

    /// A `goroutine <id> [<state>]:` block with a recognized failure body.
    Goroutine {
        error_type: GoroutineErrorType,
        goroutine_id: String,
        state: String,
        message: String,
        stack: Vec<String>,
        source_file: Option<String>,
        source_line: Option<u32>,
    },

    /// Registry/resolution/permission failure from the package manager.
    NpmRegistry {
        module_name: String,
        reason: NpmFailure,
    },

    /// Bundler plugin syntax error surfaced in the preview.
    PreviewSyntax {
        file_path: String,
        line: u32,
        col: u32,
        message: String,
    },
}

impl ErrorRecord {
    /// Which variant this record is.
    pub fn variant(&self) -> RecordVariant {
        match self {
            ErrorRecord::ModuleNotFound { .. } => RecordVariant::ModuleNotFound,
            ErrorRecord::Goroutine { .. } => RecordVariant::Goroutine,
            ErrorRecord::NpmRegistry { .. } => RecordVariant::NpmRegistry,
            ErrorRecord::PreviewSyntax { .. } => RecordVariant::PreviewSyntax,
        }
    }

    /// Variant-specific grouping key: module name for module/npm records,
    /// error type for goroutine records, file path for preview records.
    pub fn group_key(&self) -> &str {
        match self {
            ErrorRecord::ModuleNotFound { module_name, .. } => module_name,
            ErrorRecord::Goroutine { error_type, .. } => error_type.as_str(),
            ErrorRecord::NpmRegistry { module_name, .. } => module_name,
            ErrorRecord::PreviewSyntax { file_path, .. } => file_path,
        }
    }

    /// Module name, when this record carries one.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            ErrorRecord::ModuleNotFound { module_name, .. } => Some(module_name),
            ErrorRecord::NpmRegistry { module_name, .. } => Some(module_name),
            _ => None,
        }
    }

    /// File path associated with the occurrence, when one was recovered.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            ErrorRecord::ModuleNotFound { file_path, .. } => file_path.as_deref(),
            ErrorRecord::Goroutine { source_file, .. } => source_file.as_deref(),
            ErrorRecord::NpmRegistry { .. } => None,
            ErrorRecord::PreviewSyntax { file_path, .. } => Some(file_path),
        }
    }
}

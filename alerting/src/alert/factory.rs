//! Alert construction.
//!
//! Builds drafts from grouped records plus producer context, and provides
//! convenience constructors that fix the defaults for the common producers
//! (terminal errors, preview errors, system notices).

use chrono::{DateTime, Utc};

use crate::classify::ErrorRecord;
use crate::grouping::AlertGroup;

use super::types::{AlertDraft, AlertMetadata, AlertSource, Severity};

/// Stack frames carried into alert metadata.
const MAX_STACK_FRAMES: usize = 5;

/// Producer context accompanying a group on its way to the store.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub source: AlertSource,
    /// When the producing chunk was captured.
    pub captured_at: DateTime<Utc>,
    /// Raw excerpt of the normalized chunk, for the alert body.
    pub raw_excerpt: String,
    /// Total occurrences from the context accumulator, including suppressed
    /// ones; falls back to the group count when no accumulator exists.
    pub occurrences: u64,
}

/// Builds [`AlertDraft`]s from groups and producer context.
pub struct AlertFactory;

impl AlertFactory {
    /// Build a draft from an admitted group.
    pub fn from_group(group: &AlertGroup, ctx: AlertContext) -> AlertDraft {
        AlertDraft::new(group.variant.kind_str(), title_for(group))
            .with_description(description_for(group, &ctx))
            .with_content(ctx.raw_excerpt)
            .with_source(ctx.source)
            .with_severity(group.severity)
            .with_timestamp(ctx.captured_at)
            .with_metadata(metadata_for(&group.primary, ctx.occurrences))
            .with_suggested_action(
                group
                    .suggested_fixes
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Check the diagnostic output".to_string()),
            )
    }

    /// Generic terminal error: source fixed, severity `Error`.
    pub fn terminal_error(
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> AlertDraft {
        AlertDraft::new("terminal-error", title)
            .with_description(description)
            .with_content(content)
            .with_source(AlertSource::Terminal)
            .with_severity(Severity::Error)
            .with_suggested_action("Check the terminal output and fix the reported error")
    }

    /// Generic preview error: source fixed, severity `Error`.
    pub fn preview_error(
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> AlertDraft {
        AlertDraft::new("preview-error", title)
            .with_description(description)
            .with_content(content)
            .with_source(AlertSource::Preview)
            .with_severity(Severity::Error)
            .with_suggested_action("Open the preview console for the full stack trace")
    }

    /// Non-actionable system notice with caller-supplied severity.
    pub fn system_notice(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> AlertDraft {
        AlertDraft::new("system-notice", title)
            .with_description(description)
            .with_source(AlertSource::System)
            .with_severity(severity)
            .with_actionable(false)
    }

    /// Fallback for contained pipeline failures: the original text survives
    /// as content so the failure is visible instead of silently dropped.
    pub fn processing_error(original_text: &str, error: impl std::fmt::Display) -> AlertDraft {
        AlertDraft::new("processing-error", "Diagnostic processing failed")
            .with_description(format!("Internal error while classifying output: {}", error))
            .with_content(original_text.to_string())
            .with_source(AlertSource::System)
            .with_severity(Severity::Warning)
            .with_actionable(false)
    }
}

fn title_for(group: &AlertGroup) -> String {
    match &group.primary {
        ErrorRecord::ModuleNotFound { module_name, .. } => {
            format!("Missing module: {}", module_name)
        }
        ErrorRecord::Goroutine { error_type, .. } => {
            use crate::classify::GoroutineErrorType::*;
            match error_type {
                ClosedPipe => "Runtime pipe failure".to_string(),
                Panic => "Runtime panic".to_string(),
                Deadlock => "Runtime deadlock".to_string(),
                Fatal => "Runtime fatal error".to_string(),
            }
        }
        ErrorRecord::NpmRegistry {
            module_name,
            reason,
        } => {
            use crate::classify::NpmFailure::*;
            match reason {
                NotInRegistry { .. } => format!("Package not in registry: {}", module_name),
                PeerConflict { .. } => format!("Peer dependency conflict: {}", module_name),
                NoMatchingVersion { .. } => format!("No matching version: {}", module_name),
                Permissions { .. } => "Package manager permission error".to_string(),
            }
        }
        ErrorRecord::PreviewSyntax { file_path, .. } => {
            format!("Syntax error in {}", file_path)
        }
    }
}

fn description_for(group: &AlertGroup, ctx: &AlertContext) -> String {
    let mut description = match &group.primary {
        ErrorRecord::Goroutine { message, .. } => message.clone(),
        ErrorRecord::PreviewSyntax { message, line, col, .. } => {
            format!("{} at {}:{}", message, line, col)
        }
        _ => group.suggested_fixes.join(". "),
    };

    if ctx.occurrences > 1 {
        description.push_str(&format!(" ({} occurrences)", ctx.occurrences));
    }
    if !group.files_affected.is_empty() {
        description.push_str(&format!(" [files: {}]", group.files_affected));
    }
    description
}

fn metadata_for(primary: &ErrorRecord, occurrences: u64) -> AlertMetadata {
    match primary {
        ErrorRecord::ModuleNotFound {
            module_name,
            file_path,
            line,
            col,
            import_type,
            related_packages,
            ..
        } => AlertMetadata::Module {
            module_name: module_name.clone(),
            file_path: file_path.clone(),
            line: *line,
            col: *col,
            import_type: *import_type,
            related_packages: related_packages.clone(),
            occurrences,
        },
        ErrorRecord::Goroutine {
            error_type,
            goroutine_id,
            state,
            stack,
            source_file,
            source_line,
            ..
        } => AlertMetadata::Goroutine {
            error_type: *error_type,
            goroutine_id: goroutine_id.clone(),
            state: state.clone(),
            source_file: source_file.clone(),
            source_line: *source_line,
            stack: stack.iter().take(MAX_STACK_FRAMES).cloned().collect(),
        },
        ErrorRecord::NpmRegistry {
            module_name,
            reason,
        } => AlertMetadata::Npm {
            module_name: module_name.clone(),
            reason: reason.clone(),
            occurrences,
        },
        ErrorRecord::PreviewSyntax {
            file_path,
            line,
            col,
            ..
        } => AlertMetadata::Preview {
            file_path: file_path.clone(),
            line: *line,
            col: *col,
        },
    }
}

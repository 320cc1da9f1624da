//! Error grouping.
//!
//! Aggregates the records of one classification batch by their logical
//! cause before dedup and alert creation. Groups are ephemeral, like the
//! records they wrap.

use std::collections::HashMap;

use serde::Serialize;

use crate::alert::Severity;
use crate::classify::{ErrorRecord, GoroutineErrorType, NpmFailure, RecordVariant};

/// An ephemeral aggregation of same-cause records from one batch.
#[derive(Debug, Clone, Serialize)]
pub struct AlertGroup {
    pub variant: RecordVariant,
    /// Variant-specific key the records were grouped under.
    pub key: String,
    /// First record encountered for this key.
    pub primary: ErrorRecord,
    /// Number of records in the group.
    pub count: usize,
    /// Deduplicated, comma-joined file paths across the group.
    pub files_affected: String,
    /// Fixed, variant-specific remediation list.
    pub suggested_fixes: Vec<String>,
    pub severity: Severity,
}

impl AlertGroup {
    /// Module name of the primary record, when the variant carries one.
    pub fn module_name(&self) -> Option<&str> {
        self.primary.module_name()
    }

    /// Text standing in for the raw occurrence when no module name exists,
    /// used as the coarse dedup-key fallback. Distinct per logical cause so
    /// two different groups from one chunk never share a coarse key.
    pub fn signature_text(&self) -> String {
        match &self.primary {
            ErrorRecord::Goroutine {
                error_type,
                state,
                message,
                ..
            } => format!("goroutine [{}] {}: {}", state, error_type, message),
            ErrorRecord::PreviewSyntax {
                file_path,
                line,
                col,
                message,
            } => format!("{}: {} ({}:{})", file_path, message, line, col),
            // Module/npm groups key on the module name, not this text.
            _ => format!("{}:{}", self.variant, self.key),
        }
    }
}

/// Group a batch of records by variant-specific key, insertion-ordered.
pub fn group(records: Vec<ErrorRecord>) -> Vec<AlertGroup> {
    let mut order: Vec<Builder> = Vec::new();
    let mut index: HashMap<(RecordVariant, String), usize> = HashMap::new();

    for record in records {
        let key = (record.variant(), record.group_key().to_string());
        match index.get(&key) {
            Some(&i) => order[i].absorb(&record),
            None => {
                index.insert(key, order.len());
                order.push(Builder::new(record));
            }
        }
    }

    order.into_iter().map(Builder::finish).collect()
}

struct Builder {
    primary: ErrorRecord,
    count: usize,
    files: Vec<String>,
}

impl Builder {
    fn new(record: ErrorRecord) -> Self {
        let mut builder = Self {
            primary: record.clone(),
            count: 0,
            files: Vec::new(),
        };
        builder.absorb(&record);
        builder
    }

    fn absorb(&mut self, record: &ErrorRecord) {
        self.count += 1;
        if let Some(path) = record.file_path() {
            if !path.is_empty() && !self.files.iter().any(|f| f == path) {
                self.files.push(path.to_string());
            }
        }
    }

    fn finish(self) -> AlertGroup {
        let variant = self.primary.variant();
        AlertGroup {
            variant,
            key: self.primary.group_key().to_string(),
            severity: severity_for(variant),
            suggested_fixes: suggested_fixes(&self.primary),
            files_affected: self.files.join(", "),
            count: self.count,
            primary: self.primary,
        }
    }
}

fn severity_for(variant: RecordVariant) -> Severity {
    match variant {
        RecordVariant::Goroutine => Severity::Critical,
        RecordVariant::ModuleNotFound
        | RecordVariant::NpmRegistry
        | RecordVariant::PreviewSyntax => Severity::Error,
    }
}

fn suggested_fixes(primary: &ErrorRecord) -> Vec<String> {
    match primary {
        ErrorRecord::ModuleNotFound { module_name, .. } => vec![
            format!("Install the missing package: npm install {}", module_name),
            "Verify the import path and file extension".to_string(),
        ],
        ErrorRecord::NpmRegistry {
            module_name,
            reason,
        } => match reason {
            NpmFailure::NotInRegistry { .. } => vec![
                format!("Check the package name for typos: {}", module_name),
                "Verify the package exists on the npm registry".to_string(),
            ],
            NpmFailure::PeerConflict { requester } => vec![
                "Check package manifest for version conflicts".to_string(),
                format!("Align the peer range of {} with {}", module_name, requester),
            ],
            NpmFailure::NoMatchingVersion { requested } => vec![
                format!("Request a published version of {} instead of {}", module_name, requested),
                "Check package manifest for version conflicts".to_string(),
            ],
            NpmFailure::Permissions { .. } => vec![
                "Clear the package cache and retry the install".to_string(),
            ],
        },
        ErrorRecord::Goroutine { error_type, .. } => {
            let mut fixes = vec!["Restart the dev server process".to_string()];
            if *error_type != GoroutineErrorType::ClosedPipe {
                fixes.push("Inspect the stack trace for the failing source location".to_string());
            }
            fixes
        }
        ErrorRecord::PreviewSyntax { .. } => vec![
            "Fix the reported syntax error, the preview reloads automatically".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn module_record(name: &str, file: Option<&str>) -> ErrorRecord {
        ErrorRecord::ModuleNotFound {
            module_name: name.to_string(),
            file_path: file.map(String::from),
            line: Some(1),
            col: Some(1),
            import_type: crate::classify::ImportType::Dynamic,
            related_packages: vec![],
            stack: vec![],
        }
    }

    #[test]
    fn test_same_module_collapses_to_one_group() {
        let records = vec![
            module_record("axios", Some("/app/a.js")),
            module_record("axios", Some("/app/b.js")),
            module_record("axios", Some("/app/a.js")),
        ];
        let groups = group(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].files_affected, "/app/a.js, /app/b.js");
        assert_eq!(groups[0].severity, Severity::Error);
    }

    #[test]
    fn test_distinct_variants_stay_separate() {
        let text = "Cannot find module 'dayjs'\n\ngoroutine 4 [running]:\npanic: boom";
        let groups = group(classify(text).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].variant, RecordVariant::ModuleNotFound);
        assert_eq!(groups[1].variant, RecordVariant::Goroutine);
        assert_eq!(groups[1].severity, Severity::Critical);
        assert_eq!(groups[1].key, "panic");
    }

    #[test]
    fn test_goroutines_group_by_error_type() {
        let text = "goroutine 1 [running]:\npanic: a\n\ngoroutine 2 [running]:\npanic: b\n\ngoroutine 3 [running]:\nfatal error: c";
        let groups = group(classify(text).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].key, "panic");
        assert_eq!(groups[1].key, "fatal");
    }

    #[test]
    fn test_empty_files_are_skipped() {
        let records = vec![module_record("axios", None), module_record("axios", None)];
        let groups = group(records);
        assert_eq!(groups[0].files_affected, "");
    }

    #[test]
    fn test_suggested_fixes_mention_module() {
        let groups = group(vec![module_record("left-pad", None)]);
        assert!(groups[0].suggested_fixes[0].contains("npm install left-pad"));
    }
}

//! Multi-format pattern classifier.
//!
//! Turns one normalized text chunk into zero or more typed [`ErrorRecord`]s.
//! Rules are independent and globally searched: a chunk may fire several
//! rules, and overlapping matches are all emitted. Collapsing near-duplicates
//! is the job of the grouper, the dedup cache, and the active-set check
//! downstream, never this layer.
//!
//! Rule families, applied in order:
//!
//! 1. Module resolution and package-manager failures (`module_errors`)
//! 2. Goroutine-style runtime dumps (`runtime_errors`)
//! 3. Bundler plugin syntax errors (`preview_errors`)

mod module_errors;
mod preview_errors;
mod record;
mod runtime_errors;

pub use module_errors::PERMISSIONS_MODULE;
pub use record::{ErrorRecord, GoroutineErrorType, ImportType, NpmFailure, RecordVariant};

/// Error type for classification failures.
///
/// Pattern misses are not errors (they produce an empty list); this only
/// covers malformed captures, which the pipeline contains and surfaces as a
/// processing-error alert.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("invalid number in capture: {0}")]
    InvalidNumber(String),
}

/// Result type for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Classify one text chunk into structured records.
///
/// Input matching none of the known patterns returns an empty list.
pub fn classify(text: &str) -> ClassifyResult<Vec<ErrorRecord>> {
    let mut records = Vec::new();
    module_errors::collect(text, &mut records)?;
    runtime_errors::collect(text, &mut records)?;
    preview_errors::collect(text, &mut records)?;
    Ok(records)
}

fn parse_u32(raw: &str) -> ClassifyResult<u32> {
    raw.parse()
        .map_err(|_| ClassifyError::InvalidNumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_input_is_empty() {
        assert!(classify("").unwrap().is_empty());
        assert!(classify("vite v5.0.0 ready in 230 ms").unwrap().is_empty());
        assert!(classify("Compiled successfully.\n\nYou can now view app in the browser.")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_multiple_rules_fire_on_one_chunk() {
        let text = "Error: Cannot find module 'axios'\n    at load (/app/src/api.js:2:10)\n\ngoroutine 12 [running]:\npanic: send on closed channel";
        let records = classify(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].variant(), RecordVariant::ModuleNotFound);
        assert_eq!(records[1].variant(), RecordVariant::Goroutine);
    }

    #[test]
    fn test_overlapping_matches_all_emitted() {
        // The 404 line fires the registry rule; the surrounding resolve text
        // also fires the version-miss rule. Both come back.
        let text = "npm ERR! 404 left-pad@9.9.9 is not in the npm registry\nnpm ERR! notarget No matching version found for left-pad@9.9.9";
        let records = classify(text).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.module_name() == Some("left-pad")));
    }

    #[test]
    fn test_oversized_line_number_is_an_error() {
        let text = "Cannot find module 'x'\n    at f (/a.js:99999999999999999999:1)";
        assert!(classify(text).is_err());
    }
}

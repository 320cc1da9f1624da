//! Bundler/plugin syntax error rule.
//!
//! Shape: `[plugin:<tool>] <file>: <message> (<line>:<col>)`, as emitted by
//! vite-style plugin overlays. The unterminated-template case gets its own
//! message so the alert points at the missing backtick instead of a generic
//! parser complaint.

use regex::Regex;
use std::sync::LazyLock;

use super::record::ErrorRecord;
use super::{parse_u32, ClassifyResult};

static PLUGIN_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[plugin:([^\]]+)\]\s+([^:\n]+):\s+(.+?)\s+\((\d+):(\d+)\)").unwrap()
});

pub(super) fn collect(text: &str, out: &mut Vec<ErrorRecord>) -> ClassifyResult<()> {
    for caps in PLUGIN_ERROR.captures_iter(text) {
        let raw_message = caps[3].trim_end_matches('.').to_string();

        let message = if raw_message.starts_with("Unterminated template") {
            "Unterminated template literal (likely missing backtick)".to_string()
        } else {
            raw_message
        };

        out.push(ErrorRecord::PreviewSyntax {
            file_path: caps[2].trim().to_string(),
            line: parse_u32(&caps[4])?,
            col: parse_u32(&caps[5])?,
            message,
        });
    }
    Ok(())
}

//! Output normalization before classification.
//!
//! Terminal and preview streams arrive with ANSI styling, carriage-return
//! progress rewrites, and stray control bytes. The classification rules
//! assume plain newline-delimited text, so every chunk passes through here
//! first. Normalization never fails: a chunk truncated mid escape sequence
//! loses the partial sequence and nothing else.

use regex::Regex;
use std::sync::LazyLock;

/// CSI sequences (`ESC [ params cmd`), including truncated ones at end of input.
static CSI_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*(?:[@-~]|$)").unwrap());

/// OSC sequences (`ESC ] ... BEL` or `ESC ] ... ST`), terminator optional so a
/// truncated title-set sequence still strips to end of input.
static OSC_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\|$)").unwrap());

/// Two-byte escapes and a bare trailing ESC.
static SIMPLE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b[@-_]?").unwrap());

/// Runs of three or more blank lines (terminal spinners produce them).
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip escape sequences, normalize line endings, and drop control bytes.
pub fn normalize(text: &str) -> String {
    let stripped = CSI_SEQUENCE.replace_all(text, "");
    let stripped = OSC_SEQUENCE.replace_all(&stripped, "");
    let stripped = SIMPLE_ESCAPE.replace_all(&stripped, "");

    // CRLF and bare CR both become LF; progress-bar rewrites turn into lines.
    let unified = stripped.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: String = unified
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    BLANK_RUN.replace_all(&cleaned, "\n\n").into_owned()
}

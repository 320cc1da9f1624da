//! Goroutine-style runtime failure rule.
//!
//! Bundlers in the sandbox run native Go tooling; when it dies the stream
//! carries classic goroutine dumps. A block is the header
//! `goroutine <id> [<state>]:` plus every following non-blank line until a
//! blank line or the next header. Body classification order matters: the
//! closed-pipe line also contains `error:`, so specific shapes win first.

use regex::Regex;
use std::sync::LazyLock;

use super::record::{ErrorRecord, GoroutineErrorType};
use super::{parse_u32, ClassifyResult};

static GOROUTINE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^goroutine (\d+) \[([^\]]+)\]:").unwrap());

/// First `<file>.go:<line>` occurrence in a stack, e.g. `/app/main.go:10`.
static GO_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\s:]+\.go):(\d+)").unwrap());

pub(super) fn collect(text: &str, out: &mut Vec<ErrorRecord>) -> ClassifyResult<()> {
    let headers: Vec<_> = GOROUTINE_HEADER.captures_iter(text).collect();

    for (i, caps) in headers.iter().enumerate() {
        let body_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let body_end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());

        let body: Vec<&str> = text[body_start..body_end]
            .lines()
            .map(str::trim_end)
            .skip_while(|l| l.is_empty())
            .take_while(|l| !l.is_empty())
            .collect();

        let Some((error_type, message)) = classify_body(&body) else {
            continue;
        };

        let stack: Vec<String> = body.iter().map(|l| l.trim().to_string()).collect();

        let source = stack.iter().find_map(|l| GO_SOURCE.captures(l));
        let (source_file, source_line) = match source {
            Some(src) => (Some(src[1].to_string()), Some(parse_u32(&src[2])?)),
            None => (None, None),
        };

        out.push(ErrorRecord::Goroutine {
            error_type,
            goroutine_id: caps[1].to_string(),
            state: caps[2].to_string(),
            message,
            stack,
            source_file,
            source_line,
        });
    }
    Ok(())
}

fn classify_body(body: &[&str]) -> Option<(GoroutineErrorType, String)> {
    for line in body {
        let line = line.trim();
        if line.contains("too many writes on closed pipe") {
            return Some((GoroutineErrorType::ClosedPipe, line.to_string()));
        }
    }
    for line in body {
        if let Some(rest) = line.trim().strip_prefix("panic: ") {
            return Some((GoroutineErrorType::Panic, rest.to_string()));
        }
    }
    for line in body {
        if line.contains("all goroutines are asleep - deadlock!") {
            return Some((GoroutineErrorType::Deadlock, line.trim().to_string()));
        }
    }
    for line in body {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("fatal error: ") {
            return Some((GoroutineErrorType::Fatal, rest.to_string()));
        }
        if let Some(rest) = line.strip_prefix("error: ") {
            return Some((GoroutineErrorType::Fatal, rest.to_string()));
        }
    }
    None
}

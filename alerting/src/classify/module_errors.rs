//! Module-resolution and package-manager failure rules.
//!
//! Five independent rules, all global-search: cannot-find-module, registry
//! 404 (scoped and unscoped), ERESOLVE peer conflicts, unsatisfiable version
//! requests, and EACCES permission failures.

use regex::Regex;
use std::sync::LazyLock;

use super::record::{ErrorRecord, ImportType, NpmFailure};
use super::{parse_u32, ClassifyResult};

/// Sentinel module name for permission failures, which have no real package.
pub const PERMISSIONS_MODULE: &str = "permissions";

static CANNOT_FIND_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:Error: )?Cannot find module '([^']+)'").unwrap());

/// Stack frame lines: `at func (/path/file.js:3:1)` or `at /path/file.js:3:1`.
static STACK_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*at\s+(?:.*?\()?([^():\s]+):(\d+):(\d+)\)?").unwrap()
});

static STACK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(at\s.+)$").unwrap());

/// `name@version is not in the npm registry`, scoped or unscoped. The module
/// name keeps the `@scope/` prefix but never the version suffix.
static NOT_IN_REGISTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:@[\w.-]+/)?[\w.-]+)@(\S+?)'? is not in (?:the|this) npm registry").unwrap()
});

static ERESOLVE_FOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found:\s+((?:@[\w.-]+/)?[\w.-]+)@").unwrap());

static ERESOLVE_PEER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"peer\s+((?:@[\w.-]+/)?[\w.-]+)@").unwrap());

static NO_MATCHING_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"No matching version found for ((?:@[\w.-]+/)?[\w.-]+)@(\S+)").unwrap()
});

static EACCES_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"path\s+(\S+)").unwrap());

struct Frame {
    offset: usize,
    file: String,
    line: u32,
    col: u32,
}

pub(super) fn collect(text: &str, out: &mut Vec<ErrorRecord>) -> ClassifyResult<()> {
    collect_missing_modules(text, out)?;
    collect_registry_404(text, out);
    collect_peer_conflicts(text, out);
    collect_version_misses(text, out);
    collect_permission_errors(text, out);
    Ok(())
}

fn collect_missing_modules(text: &str, out: &mut Vec<ErrorRecord>) -> ClassifyResult<()> {
    let frames = stack_frames(text)?;
    let stack: Vec<String> = STACK_LINE
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .collect();

    for caps in CANNOT_FIND_MODULE.captures_iter(text) {
        let module_name = caps[1].to_string();
        let import_type = if module_name.starts_with('.') {
            ImportType::Static
        } else {
            ImportType::Dynamic
        };

        let nearest = nearest_frame(&frames, caps.get(0).map(|m| m.start()).unwrap_or(0));

        out.push(ErrorRecord::ModuleNotFound {
            module_name,
            file_path: nearest.map(|f| f.file.clone()),
            line: nearest.map(|f| f.line),
            col: nearest.map(|f| f.col),
            import_type,
            related_packages: Vec::new(),
            stack: stack.clone(),
        });
    }
    Ok(())
}

fn stack_frames(text: &str) -> ClassifyResult<Vec<Frame>> {
    let mut frames = Vec::new();
    for caps in STACK_FRAME.captures_iter(text) {
        frames.push(Frame {
            offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
            file: caps[1].to_string(),
            line: parse_u32(&caps[2])?,
            col: parse_u32(&caps[3])?,
        });
    }
    Ok(frames)
}

/// The frame closest to `offset` by byte distance, preferring frames at or
/// after the match over earlier ones.
fn nearest_frame(frames: &[Frame], offset: usize) -> Option<&Frame> {
    frames
        .iter()
        .min_by_key(|f| {
            if f.offset >= offset {
                (0u8, f.offset - offset)
            } else {
                (1u8, offset - f.offset)
            }
        })
}

fn collect_registry_404(text: &str, out: &mut Vec<ErrorRecord>) {
    for caps in NOT_IN_REGISTRY.captures_iter(text) {
        out.push(ErrorRecord::NpmRegistry {
            module_name: caps[1].to_string(),
            reason: NpmFailure::NotInRegistry {
                requested_version: trim_version(&caps[2]),
            },
        });
    }
}

fn collect_peer_conflicts(text: &str, out: &mut Vec<ErrorRecord>) {
    if !text.contains("code ERESOLVE") {
        return;
    }
    let Some(peer) = ERESOLVE_PEER.captures(text) else {
        return;
    };
    let requester = ERESOLVE_FOUND
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    out.push(ErrorRecord::NpmRegistry {
        module_name: peer[1].to_string(),
        reason: NpmFailure::PeerConflict { requester },
    });
}

fn collect_version_misses(text: &str, out: &mut Vec<ErrorRecord>) {
    for caps in NO_MATCHING_VERSION.captures_iter(text) {
        out.push(ErrorRecord::NpmRegistry {
            module_name: caps[1].to_string(),
            reason: NpmFailure::NoMatchingVersion {
                requested: trim_version(&caps[2]),
            },
        });
    }
}

fn collect_permission_errors(text: &str, out: &mut Vec<ErrorRecord>) {
    if !text.contains("code EACCES") {
        return;
    }
    let path = EACCES_PATH
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    out.push(ErrorRecord::NpmRegistry {
        module_name: PERMISSIONS_MODULE.to_string(),
        reason: NpmFailure::Permissions { path },
    });
}

/// Version captures are `\S+` and may drag trailing punctuation along.
fn trim_version(raw: &str) -> String {
    raw.trim_end_matches(['.', ',', ';', '\'', '"']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<ErrorRecord> {
        let mut out = Vec::new();
        collect(text, &mut out).unwrap();
        out
    }

    #[test]
    fn test_cannot_find_module_with_stack() {
        let text = "Error: Cannot find module 'react-query'\n    at Object.<anonymous> (/app/src/components/App.js:3:1)\n    at Module._compile (node:internal/modules/cjs/loader:1105:14)";
        let records = run(text);
        assert_eq!(records.len(), 1);

        match &records[0] {
            ErrorRecord::ModuleNotFound {
                module_name,
                file_path,
                line,
                col,
                import_type,
                stack,
                ..
            } => {
                assert_eq!(module_name, "react-query");
                assert_eq!(file_path.as_deref(), Some("/app/src/components/App.js"));
                assert_eq!(*line, Some(3));
                assert_eq!(*col, Some(1));
                assert_eq!(*import_type, ImportType::Dynamic);
                assert_eq!(stack.len(), 2);
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_relative_import_is_static() {
        let records = run("Cannot find module './util/format'");
        match &records[0] {
            ErrorRecord::ModuleNotFound {
                import_type,
                file_path,
                ..
            } => {
                assert_eq!(*import_type, ImportType::Static);
                assert!(file_path.is_none());
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_registry_404_scoped_excludes_version() {
        let records = run("npm ERR! 404 @my-scope/my-lib@2.0.0 is not in the npm registry");
        match &records[0] {
            ErrorRecord::NpmRegistry {
                module_name,
                reason,
            } => {
                assert_eq!(module_name, "@my-scope/my-lib");
                assert_eq!(
                    reason,
                    &NpmFailure::NotInRegistry {
                        requested_version: "2.0.0".to_string()
                    }
                );
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_registry_404_unscoped() {
        let records = run("npm ERR! 404 'leftt-pad@1.3.0' is not in this registry... wait");
        // Deliberately malformed wording: the registry phrase must be exact.
        assert!(records.is_empty());

        let records = run("npm ERR! 404 leftt-pad@1.3.0 is not in the npm registry.");
        match &records[0] {
            ErrorRecord::NpmRegistry { module_name, .. } => assert_eq!(module_name, "leftt-pad"),
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_peer_conflict_names_peer_and_requester() {
        let text = "npm ERR! code ERESOLVE\nnpm ERR! ERESOLVE unable to resolve dependency tree\nnpm ERR! Found: react@17.0.2\nnpm ERR! Could not resolve dependency:\nnpm ERR! peer react-dom@\"^18.0.0\" from the root project";
        let records = run(text);
        assert_eq!(records.len(), 1);
        match &records[0] {
            ErrorRecord::NpmRegistry {
                module_name,
                reason,
            } => {
                assert_eq!(module_name, "react-dom");
                assert_eq!(
                    reason,
                    &NpmFailure::PeerConflict {
                        requester: "react".to_string()
                    }
                );
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_no_matching_version() {
        let records = run("npm ERR! notarget No matching version found for vite@^99.0.0.");
        match &records[0] {
            ErrorRecord::NpmRegistry {
                module_name,
                reason,
            } => {
                assert_eq!(module_name, "vite");
                assert_eq!(
                    reason,
                    &NpmFailure::NoMatchingVersion {
                        requested: "^99.0.0".to_string()
                    }
                );
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_eacces_uses_sentinel_module() {
        let text = "npm ERR! code EACCES\nnpm ERR! syscall mkdir\nnpm ERR! path /usr/lib/node_modules/foo";
        let records = run(text);
        match &records[0] {
            ErrorRecord::NpmRegistry {
                module_name,
                reason,
            } => {
                assert_eq!(module_name, PERMISSIONS_MODULE);
                assert_eq!(
                    reason,
                    &NpmFailure::Permissions {
                        path: "/usr/lib/node_modules/foo".to_string()
                    }
                );
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }
}

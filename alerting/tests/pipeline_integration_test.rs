//! Integration tests for the alerting pipeline
//!
//! Runs raw diagnostic text through the full classify → group → dedup →
//! factory → store flow and checks the user-visible outcomes: which alerts
//! exist, what their transport shape carries, and how the bounded active set
//! behaves under pressure.

use std::sync::Arc;
use std::time::Duration;

use alerting::{
    classify, AlertFactory, AlertPipeline, AlertSource, AlertStore, AlertStoreConfig, ErrorRecord,
    GoroutineErrorType, PipelineConfig, Severity, StreamMonitor,
};

fn store_with(capacity: usize, history_limit: usize) -> AlertStore {
    AlertStore::new(AlertStoreConfig {
        capacity,
        history_limit,
    })
}

fn pipeline_with(capacity: usize, history_limit: usize) -> AlertPipeline {
    AlertPipeline::new(store_with(capacity, history_limit).shared(), PipelineConfig::default())
}

fn pipeline() -> AlertPipeline {
    pipeline_with(20, 50)
}

/// Test: a goroutine dump with two blocks yields two typed records
#[test]
fn test_goroutine_dump_yields_two_records() {
    let text = "goroutine 42 [running]:\nruntime: too many writes on closed pipe\n\ngoroutine 36 [running]:\npanic: fatal error: runtime: out of memory";
    let records = classify(text).unwrap();
    assert_eq!(records.len(), 2);

    match &records[0] {
        ErrorRecord::Goroutine {
            goroutine_id,
            error_type,
            ..
        } => {
            assert_eq!(goroutine_id, "42");
            assert_eq!(*error_type, GoroutineErrorType::ClosedPipe);
        }
        other => panic!("unexpected record: {:?}", other),
    }
    match &records[1] {
        ErrorRecord::Goroutine {
            goroutine_id,
            error_type,
            ..
        } => {
            assert_eq!(goroutine_id, "36");
            assert_eq!(*error_type, GoroutineErrorType::Panic);
        }
        other => panic!("unexpected record: {:?}", other),
    }
}

/// Test: module-not-found with a stack frame recovers the source location
#[test]
fn test_module_not_found_recovers_location() {
    let p = pipeline();
    let alerts = p.process_chunk(
        AlertSource::Terminal,
        "Error: Cannot find module 'react-query'\n    at Object.<anonymous> (/app/src/components/App.js:3:1)",
    );
    assert_eq!(alerts.len(), 1);

    let json = serde_json::to_value(&alerts[0]).unwrap();
    assert_eq!(json["type"], "module-not-found");
    assert_eq!(json["metadata"]["moduleName"], "react-query");
    assert_eq!(json["metadata"]["filePath"], "/app/src/components/App.js");
    assert_eq!(json["metadata"]["line"], 3);
    assert_eq!(json["metadata"]["col"], 1);
}

/// Test: a registry 404 burst inside the suppression window creates one alert
#[test]
fn test_repeated_registry_404_creates_one_alert() {
    let p = pipeline();
    let chunk = "npm ERR! 404 @my-scope/my-lib@2.0.0 is not in the npm registry";

    let mut created = Vec::new();
    for _ in 0..3 {
        created.extend(p.process_chunk(AlertSource::Terminal, chunk));
    }

    assert_eq!(created.len(), 1);
    assert_eq!(p.store().active_len().unwrap(), 1);

    let json = serde_json::to_value(&created[0]).unwrap();
    assert_eq!(json["metadata"]["moduleName"], "@my-scope/my-lib");
    // History logged only the admitted creation; suppression made no copies.
    assert_eq!(p.store().history().unwrap().len(), 1);
}

/// Test: a plugin syntax error surfaces the unterminated-template case
#[test]
fn test_unterminated_template_alert() {
    let p = pipeline();
    let alerts = p.process_chunk(
        AlertSource::Preview,
        "[[plugin:x:react-babel] /home/p/App.tsx: Unterminated template. (154:3)]",
    );
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].description.contains("Unterminated template"));

    let json = serde_json::to_value(&alerts[0]).unwrap();
    assert_eq!(json["type"], "preview-syntax");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["metadata"]["filePath"], "/home/p/App.tsx");
    assert_eq!(json["metadata"]["line"], 154);
    assert_eq!(json["metadata"]["col"], 3);
}

/// Test: flooding with distinct module errors never exceeds capacity
#[test]
fn test_active_set_bounded_under_error_flood() {
    let p = pipeline_with(20, 50);
    for i in 0..21 {
        let chunk = format!("Cannot find module 'pkg-{}'", i);
        assert_eq!(p.process_chunk(AlertSource::Terminal, &chunk).len(), 1);
    }

    let active = p.store().active().unwrap();
    assert_eq!(active.len(), 20);
    assert!(!active.iter().any(|a| a.title == "Missing module: pkg-0"));
    assert!(active.iter().any(|a| a.title == "Missing module: pkg-20"));
}

/// Test: an info alert cannot displace a full set of critical alerts
#[test]
fn test_critical_slots_protected_from_info_noise() {
    let store = store_with(20, 50);
    for i in 0..20 {
        store
            .create_alert(AlertFactory::system_notice(
                format!("crash {}", i),
                "sandbox process died",
                Severity::Critical,
            ))
            .unwrap();
    }
    let before: Vec<String> = store.active().unwrap().iter().map(|a| a.id.clone()).collect();

    let info = store
        .create_alert(AlertFactory::system_notice(
            "sandbox restarted",
            "",
            Severity::Info,
        ))
        .unwrap();

    let after: Vec<String> = store.active().unwrap().iter().map(|a| a.id.clone()).collect();
    assert_eq!(before, after);
    assert!(!after.contains(&info.id));
    assert_eq!(store.history().unwrap()[0].id, info.id);
}

/// Test: history keeps the newest H creations even under heavy churn
#[test]
fn test_history_retains_newest_creations() {
    let p = pipeline_with(5, 50);
    for i in 0..60 {
        p.process_chunk(AlertSource::Terminal, &format!("Cannot find module 'pkg-{}'", i));
    }

    let history = p.store().history().unwrap();
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].title, "Missing module: pkg-59");
    assert_eq!(history[49].title, "Missing module: pkg-10");
    for pair in history.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

/// Test: clearing one alert leaves history untouched
#[test]
fn test_clear_preserves_history() {
    let p = pipeline();
    let first = p.process_chunk(AlertSource::Terminal, "Cannot find module 'axios'");
    p.process_chunk(AlertSource::Terminal, "Cannot find module 'dayjs'");
    let history_before = p.store().history().unwrap();

    assert_eq!(p.store().clear_alert(Some(&first[0].id)).unwrap(), 1);

    assert_eq!(p.store().active_len().unwrap(), 1);
    let history_after = p.store().history().unwrap();
    assert_eq!(history_before.len(), history_after.len());
    for (before, after) in history_before.iter().zip(&history_after) {
        assert_eq!(before.id, after.id);
    }
}

/// Test: one mixed chunk produces one alert per logical cause
#[test]
fn test_mixed_chunk_one_alert_per_cause() {
    let p = pipeline();
    let chunk = "Cannot find module 'dayjs'\n    at load (/app/src/main.js:1:1)\n\ngoroutine 3 [running]:\npanic: send on closed channel\n\n[plugin:vite:esbuild] /src/App.tsx: Unexpected token (4:2)";
    let alerts = p.process_chunk(AlertSource::Terminal, chunk);

    let kinds: Vec<&str> = alerts.iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(kinds, vec!["module-not-found", "goroutine", "preview-syntax"]);
    assert_eq!(alerts[1].severity, Severity::Critical);
}

/// Test: a full debounced stream run, write bursts through to stored alerts
#[tokio::test(start_paused = true)]
async fn test_debounced_stream_to_alert() {
    let store = AlertStore::new(AlertStoreConfig::default()).shared();
    let p = Arc::new(AlertPipeline::new(store.clone(), PipelineConfig::default()));
    let mut monitor = StreamMonitor::terminal(p, Duration::from_millis(250));

    // npm writes the ERESOLVE report across several flushes; only the
    // batched buffer has enough context to name peer and requester.
    monitor.push_chunk("npm ERR! code ERESOLVE\n");
    monitor.push_chunk("npm ERR! Found: react@17.0.2\n");
    monitor.push_chunk("npm ERR! peer react-dom@\"^18.0.0\" from the root project\n");

    tokio::time::sleep(Duration::from_millis(251)).await;
    tokio::task::yield_now().await;

    let active = store.active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].kind, "npm-registry");
    assert_eq!(active[0].title, "Peer dependency conflict: react-dom");
    assert_eq!(active[0].source, Some(AlertSource::Terminal));
}

/// Test: ANSI styling from the shell never reaches the classifier
#[test]
fn test_styled_terminal_output_classifies() {
    let p = pipeline();
    let chunk = "\x1b[31mError:\x1b[0m Cannot find module 'chalk'\r\n    at load (/app/cli.js:2:11)\r\n";
    let alerts = p.process_chunk(AlertSource::Terminal, chunk);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Missing module: chalk");
}

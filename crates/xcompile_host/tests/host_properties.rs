//! Behavioral tests for a writable compiler host: caching, change detection,
//! deduplication, failure handling, and batch compilation.

mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use common::{builder_with, strip_types, Project, StubTypeScript, FAIL_MARKER, TYPESCRIPT};
use serde_json::json;
use xcompile_common::Fingerprint;
use xcompile_host::{CompilerHost, FlushPolicy, HostError};

fn writable(project: &Project, ts: &StubTypeScript) -> CompilerHost {
    CompilerHost::create_writable(project.root(), project.cache_dir(), BTreeMap::new(), builder_with(ts)).unwrap()
}

#[test]
fn stub_strips_annotations() {
    assert_eq!(strip_types("let x: number = 1;"), "let x = 1;");
    assert_eq!(
        strip_types("function f(a: string, b: int[]): void {}"),
        "function f(a, b) {}"
    );
    assert_eq!(strip_types("let s = \"a:1\";"), "let s = \"a:1\";");
}

// ===========================================================================
// Fingerprints
// ===========================================================================

#[test]
fn fingerprint_is_deterministic() {
    let a = Fingerprint::of(b"let x = 1;", b"{\"target\":\"es5\"}");
    let b = Fingerprint::of(b"let x = 1;", b"{\"target\":\"es5\"}");
    assert_eq!(a, b);
    assert_eq!(a.to_hex(), b.to_hex());
    assert_eq!(a.to_hex().parse::<Fingerprint>().unwrap(), a);
}

#[test]
fn fingerprint_is_sensitive_to_bytes_and_configuration() {
    let base = Fingerprint::of(b"let x = 1;", b"{}");
    assert_ne!(base, Fingerprint::of(b"let x = 2;", b"{}"));
    assert_ne!(base, Fingerprint::of(b"let x = 1;", b"{\"minify\":true}"));
}

// ===========================================================================
// End-to-end scenario
// ===========================================================================

#[test]
fn typescript_end_to_end() {
    let project = Project::new();
    let app_ts = project.write("app.ts", "let x: number = 1;");
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    let first = host.compile_sync(&app_ts).unwrap();
    assert_eq!(first.code, "let x = 1;");
    assert_eq!(first.mime_type.as_str(), "application/javascript");
    assert_eq!(ts.calls(), 1);

    let second = host.compile_sync(&app_ts).unwrap();
    assert_eq!(second.code, "let x = 1;");
    assert_eq!(ts.calls(), 1);

    project.write("app.ts", "let x: number = 2;");
    let third = host.compile_sync(&app_ts).unwrap();
    assert_eq!(third.code, "let x = 2;");
    assert_eq!(ts.calls(), 2);
}

#[tokio::test]
async fn async_compile_matches_sync() {
    let project = Project::new();
    let app_ts = project.write("app.ts", "let x: number = 1;");
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    let out = host.compile(&app_ts).await.unwrap();
    assert_eq!(out.code, "let x = 1;");
    let again = host.compile_sync(&app_ts).unwrap();
    assert_eq!(again, out);
    assert_eq!(ts.calls(), 1);
}

// ===========================================================================
// Caching and invalidation
// ===========================================================================

#[test]
fn reverting_a_file_reuses_the_old_artifact() {
    let project = Project::new();
    let file = project.write("app.ts", "let a: number = 1;");
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    host.compile_sync(&file).unwrap();
    project.write("app.ts", "let a: number = 2;");
    host.compile_sync(&file).unwrap();
    project.write("app.ts", "let a: number = 1;");
    assert_eq!(host.compile_sync(&file).unwrap().code, "let a = 1;");
    assert_eq!(ts.calls(), 2);
}

#[test]
fn identical_files_share_one_compilation() {
    let project = Project::new();
    let a = project.write("src/a.ts", "let same: string = 's';");
    let b = project.write("lib/b.ts", "let same: string = 's';");
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    host.compile_sync(&a).unwrap();
    host.compile_sync(&b).unwrap();
    assert_eq!(ts.calls(), 1);
}

#[test]
fn artifacts_survive_a_new_host() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");

    let first = StubTypeScript::new();
    writable(&project, &first).compile_sync(&file).unwrap();

    let second = StubTypeScript::new();
    let host = writable(&project, &second);
    assert_eq!(host.compile_sync(&file).unwrap().code, "let x = 1;");
    assert_eq!(second.calls(), 0);
}

#[test]
fn corrupt_artifact_is_recompiled_and_rewritten() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");
    writable(&project, &StubTypeScript::new()).compile_sync(&file).unwrap();

    let artifacts = project.cache_dir().join("artifacts");
    let stored = std::fs::read_dir(&artifacts).unwrap().next().unwrap().unwrap().path();
    std::fs::write(&stored, b"garbage").unwrap();

    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);
    assert_eq!(host.compile_sync(&file).unwrap().code, "let x = 1;");
    assert_eq!(ts.calls(), 1);
    host.save_configuration_sync().unwrap();
    assert_ne!(std::fs::read(&stored).unwrap(), b"garbage");

    let readonly =
        CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), builder_with(&ts))
            .unwrap();
    assert_eq!(readonly.compile_sync(&file).unwrap().code, "let x = 1;");
}

#[test]
fn option_change_invalidates() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");

    let ts = StubTypeScript::new();
    writable(&project, &ts).compile_sync(&file).unwrap();

    let mut options = BTreeMap::new();
    options.insert(TYPESCRIPT.to_string(), json!({"target": "es2017"}));
    let host =
        CompilerHost::create_writable(project.root(), project.cache_dir(), options, builder_with(&ts)).unwrap();
    host.compile_sync(&file).unwrap();
    assert_eq!(ts.calls(), 2);
}

#[test]
fn compiler_upgrade_invalidates() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");
    writable(&project, &StubTypeScript::with_version("1.0.0"))
        .compile_sync(&file)
        .unwrap();

    let upgraded = StubTypeScript::with_version("2.0.0");
    writable(&project, &upgraded).compile_sync(&file).unwrap();
    assert_eq!(upgraded.calls(), 1);
}

// ===========================================================================
// Failures
// ===========================================================================

#[test]
fn failures_are_retried() {
    let project = Project::new();
    let file = project.write("bad.ts", &format!("let x: number = {FAIL_MARKER};"));
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    let err = host.compile_sync(&file).unwrap_err();
    assert!(matches!(err, HostError::CompileFailure(_)));
    assert!(err.to_string().contains("syntax error"));

    assert!(host.compile_sync(&file).is_err());
    assert_eq!(ts.calls(), 2);
}

#[test]
fn vanished_file_is_not_found() {
    let project = Project::new();
    let file = project.write("gone.ts", "let x: number = 1;");
    let host = writable(&project, &StubTypeScript::new());
    host.compile_sync(&file).unwrap();

    std::fs::remove_file(&file).unwrap();
    assert!(matches!(
        host.compile_sync(&file),
        Err(HostError::NotFound { .. })
    ));
}

#[test]
fn unknown_format_is_unsupported() {
    let project = Project::new();
    let file = project.write("photo.jpeg", "not really");
    let host = writable(&project, &StubTypeScript::new());
    let err = host.compile_sync(&file).unwrap_err();
    assert!(matches!(err, HostError::UnsupportedFormat { .. }));
    assert!(err.is_skippable());
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[test]
fn concurrent_requests_compile_once() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");
    let ts = StubTypeScript::slow(Duration::from_millis(100));
    let host = writable(&project, &ts);
    let barrier = Arc::new(Barrier::new(12));

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let host = host.clone();
            let file = file.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                host.compile_sync(&file).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(ts.calls(), 1);
    assert!(results.iter().all(|r| r.code == "let x = 1;"));
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_requests_compile_once() {
    let project = Project::new();
    let file = project.write("app.ts", "let y: string = 'y';");
    let ts = StubTypeScript::slow(Duration::from_millis(100));
    let host = writable(&project, &ts);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let host = host.clone();
            let file = file.clone();
            tokio::spawn(async move { host.compile(&file).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().code, "let y = 'y';");
    }
    assert_eq!(ts.calls(), 1);
}

#[test]
fn different_files_compile_in_parallel() {
    let project = Project::new();
    let files: Vec<_> = (0..4)
        .map(|i| project.write(&format!("f{i}.ts"), &format!("let v{i}: number = {i};")))
        .collect();
    let ts = StubTypeScript::slow(Duration::from_millis(200));
    let host = writable(&project, &ts);

    let started = std::time::Instant::now();
    std::thread::scope(|s| {
        for file in &files {
            let host = &host;
            s.spawn(move || host.compile_sync(file).unwrap());
        }
    });
    assert_eq!(ts.calls(), 4);
    assert!(started.elapsed() < Duration::from_millis(700));
}

// ===========================================================================
// Batch compilation, persistence, and pruning
// ===========================================================================

#[test]
fn compile_all_continues_past_failures() {
    let project = Project::new();
    project.write("src/a.ts", "let a: number = 1;");
    project.write("src/b.ts", &format!("let b = {FAIL_MARKER};"));
    project.write("src/c.js", "let c = 3;");
    project.write("src/d.bin", "binary");
    let ts = StubTypeScript::new();
    let host = writable(&project, &ts);

    let report = host.compile_all(project.root().join("src")).unwrap();
    assert_eq!(report.compiled, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert!(report.failures[0].path.ends_with("b.ts"));
    assert_eq!(report.total(), 4);
}

#[test]
fn compile_all_missing_root_is_error() {
    let project = Project::new();
    let host = writable(&project, &StubTypeScript::new());
    assert!(host.compile_all(project.root().join("nope")).is_err());
}

#[tokio::test]
async fn save_configuration_writes_snapshot_and_records() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");
    let host = writable(&project, &StubTypeScript::new());
    host.compile_sync(&file).unwrap();
    host.save_configuration().await.unwrap();

    let snapshot = std::fs::read_to_string(project.cache_dir().join("host-config.json")).unwrap();
    assert!(snapshot.contains("stub-typescript@1.0.0"));
    let records = std::fs::read_to_string(project.cache_dir().join("file-changes.json")).unwrap();
    assert!(records.contains("\"app.ts\""));
}

#[test]
fn every_n_policy_flushes_during_compiles() {
    let project = Project::new();
    let a = project.write("a.ts", "let a: number = 1;");
    let b = project.write("b.ts", "let b: number = 2;");
    let ts = StubTypeScript::new();
    let host = CompilerHost::create_writable_with_policy(
        project.root(),
        project.cache_dir(),
        BTreeMap::new(),
        builder_with(&ts),
        FlushPolicy::EveryN(2),
    )
    .unwrap();

    host.compile_sync(&a).unwrap();
    host.compile_sync(&b).unwrap();
    let records = std::fs::read_to_string(project.cache_dir().join("file-changes.json")).unwrap();
    assert!(records.contains("\"a.ts\""));
    assert!(records.contains("\"b.ts\""));
}

#[test]
fn prune_removes_superseded_artifacts() {
    let project = Project::new();
    let file = project.write("app.ts", "let x: number = 1;");
    let host = writable(&project, &StubTypeScript::new());

    host.compile_sync(&file).unwrap();
    project.write("app.ts", "let x: number = 2;");
    host.compile_sync(&file).unwrap();

    let artifacts = project.cache_dir().join("artifacts");
    assert_eq!(std::fs::read_dir(&artifacts).unwrap().count(), 2);
    assert_eq!(host.prune().unwrap(), 1);
    assert_eq!(std::fs::read_dir(&artifacts).unwrap().count(), 1);
    assert_eq!(host.compile_sync(&file).unwrap().code, "let x = 2;");
}

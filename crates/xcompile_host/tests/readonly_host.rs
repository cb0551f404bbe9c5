//! Read-only hosts rebuilt from a saved configuration snapshot.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{builder_with, copy_tree, Project, StubTypeScript, TYPESCRIPT};
use serde_json::json;
use xcompile_host::{CompilerHost, HostError, HostMode, InlineHtmlCompiler, PassthroughCompiler, RegistryBuilder};

/// Builds a cache over `files`, saves it, and returns the stub used.
fn prebuild(project: &Project, files: &[(&str, &str)]) -> StubTypeScript {
    let ts = StubTypeScript::new();
    let mut options = BTreeMap::new();
    options.insert(TYPESCRIPT.to_string(), json!({"target": "es2017"}));
    let host = CompilerHost::create_writable(project.root(), project.cache_dir(), options, builder_with(&ts)).unwrap();
    for (rel, content) in files {
        let path = project.write(rel, content);
        host.compile_sync(path).unwrap();
    }
    host.save_configuration_sync().unwrap();
    ts
}

#[test]
fn serves_prebuilt_files_and_rejects_unseen() {
    let project = Project::new();
    prebuild(
        &project,
        &[("a.ts", "let a: number = 1;"), ("b.ts", "let b: string = 'b';")],
    );

    let ts = StubTypeScript::new();
    let host =
        CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), builder_with(&ts))
            .unwrap();
    assert_eq!(host.mode(), HostMode::ReadOnly);

    assert_eq!(host.compile_sync(project.root().join("a.ts")).unwrap().code, "let a = 1;");
    assert_eq!(host.compile_sync(project.root().join("b.ts")).unwrap().code, "let b = 'b';");

    let c = project.write("c.ts", "let c: number = 3;");
    assert!(matches!(
        host.compile_sync(&c),
        Err(HostError::StaleCacheMiss { .. })
    ));
    assert_eq!(ts.calls(), 0);
}

#[test]
fn modified_file_is_a_stale_miss() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);
    project.write("a.ts", "let a: number = 42;");

    let ts = StubTypeScript::new();
    let host =
        CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), builder_with(&ts))
            .unwrap();
    let err = host.compile_sync(project.root().join("a.ts")).unwrap_err();
    assert!(matches!(err, HostError::StaleCacheMiss { .. }));
    assert!(!err.is_skippable());
    assert_eq!(ts.calls(), 0);
}

#[test]
fn read_only_host_writes_nothing() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);
    let before = std::fs::read(project.cache_dir().join("file-changes.json")).unwrap();

    let host = CompilerHost::create_readonly_from_configuration(
        project.cache_dir(),
        project.root(),
        builder_with(&StubTypeScript::new()),
    )
    .unwrap();
    project.write("new.ts", "let n: number = 0;");
    let _ = host.compile_sync(project.root().join("new.ts"));
    host.flush().unwrap();

    let after = std::fs::read(project.cache_dir().join("file-changes.json")).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        std::fs::read_dir(project.cache_dir().join("artifacts")).unwrap().count(),
        1
    );
}

#[test]
fn relocated_deployment_still_serves() {
    let project = Project::new();
    prebuild(&project, &[("src/app.ts", "let x: number = 1;")]);

    let deployed = Project::new();
    copy_tree(project.root(), deployed.root());
    copy_tree(project.cache_dir(), deployed.cache_dir());

    let host = CompilerHost::create_readonly_from_configuration(
        deployed.cache_dir(),
        deployed.root(),
        builder_with(&StubTypeScript::new()),
    )
    .unwrap();
    let out = host.compile_sync(deployed.root().join("src/app.ts")).unwrap();
    assert_eq!(out.code, "let x = 1;");
}

#[tokio::test]
async fn async_read_only_compile() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);
    let host = CompilerHost::create_readonly_from_configuration(
        project.cache_dir(),
        project.root(),
        builder_with(&StubTypeScript::new()),
    )
    .unwrap();
    assert_eq!(host.compile(project.root().join("a.ts")).await.unwrap().code, "let a = 1;");
}

// ===========================================================================
// Construction failures
// ===========================================================================

#[test]
fn missing_snapshot_fails_fast() {
    let project = Project::new();
    let err = CompilerHost::create_readonly_from_configuration(
        project.cache_dir(),
        project.root(),
        builder_with(&StubTypeScript::new()),
    )
    .unwrap_err();
    assert!(matches!(err, HostError::Configuration(_)));
}

#[test]
fn corrupt_snapshot_fails_fast() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);
    std::fs::write(project.cache_dir().join("host-config.json"), "{ truncated").unwrap();

    let err = CompilerHost::create_readonly_from_configuration(
        project.cache_dir(),
        project.root(),
        builder_with(&StubTypeScript::new()),
    )
    .unwrap_err();
    assert!(matches!(err, HostError::Configuration(_)));
}

#[test]
fn corrupt_change_records_fail_fast() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);
    std::fs::write(project.cache_dir().join("file-changes.json"), "[]").unwrap();

    let result = CompilerHost::create_readonly_from_configuration(
        project.cache_dir(),
        project.root(),
        builder_with(&StubTypeScript::new()),
    );
    assert!(matches!(result, Err(HostError::Configuration(_))));
}

#[test]
fn missing_compiler_fails_fast() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);

    let only_passthrough = RegistryBuilder::new().register(Arc::new(PassthroughCompiler::new()));
    let result =
        CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), only_passthrough);
    assert!(matches!(result, Err(HostError::Configuration(_))));
}

#[test]
fn compiler_version_mismatch_fails_fast() {
    let project = Project::new();
    prebuild(&project, &[("a.ts", "let a: number = 1;")]);

    let upgraded = StubTypeScript::with_version("9.9.9");
    let err =
        CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), builder_with(&upgraded))
            .unwrap_err();
    assert!(err.to_string().contains("stub-typescript@1.0.0"));
}

#[test]
fn extra_compiler_fails_fast() {
    let project = Project::new();
    let page = project.write("index.html", r#"<script type="application/javascript">run();</script>"#);
    let html = || {
        RegistryBuilder::new()
            .register(Arc::new(PassthroughCompiler::new()))
            .register_composite(|handle| Arc::new(InlineHtmlCompiler::new(handle)))
    };
    let host = CompilerHost::create_writable(project.root(), project.cache_dir(), BTreeMap::new(), html()).unwrap();
    host.compile_sync(&page).unwrap();
    host.save_configuration_sync().unwrap();

    let widened = html().register(Arc::new(StubTypeScript::new()));
    let err = CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), widened)
        .unwrap_err();
    assert!(matches!(err, HostError::Configuration(_)));
    assert!(err.to_string().contains("stub-typescript@1.0.0"));

    let readonly = CompilerHost::create_readonly_from_configuration(project.cache_dir(), project.root(), html())
        .unwrap();
    assert!(readonly.compile_sync(&page).is_ok());
}

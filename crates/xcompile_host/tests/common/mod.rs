//! Shared fixtures for host integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;
use xcompile_common::MimeType;
use xcompile_host::{CompileError, CompiledArtifact, Compiler, PassthroughCompiler, RegistryBuilder};
use xcompile_source::CompilationUnit;

pub const TYPESCRIPT: &str = "application/typescript";

/// Marker that makes [`StubTypeScript`] reject a file.
pub const FAIL_MARKER: &str = "@@error";

/// Removes `: Type` annotations. Just enough TypeScript for the tests.
pub fn strip_types(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' {
            let mut ahead = chars.clone();
            while ahead.peek() == Some(&' ') {
                ahead.next();
            }
            if ahead.peek().is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') {
                while ahead
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(*c, '_' | '[' | ']'))
                {
                    ahead.next();
                }
                chars = ahead;
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// A TypeScript stand-in that strips type annotations and counts calls.
#[derive(Clone)]
pub struct StubTypeScript {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
    pub version: &'static str,
}

impl StubTypeScript {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            version: "1.0.0",
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn with_version(version: &'static str) -> Self {
        Self {
            version,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Compiler for StubTypeScript {
    fn name(&self) -> &str {
        "stub-typescript"
    }

    fn version(&self) -> &str {
        self.version
    }

    fn input_mime_types(&self) -> Vec<MimeType> {
        vec![MimeType::new(TYPESCRIPT)]
    }

    fn compile(&self, unit: &CompilationUnit, _options: &Value) -> Result<CompiledArtifact, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let text = unit.text();
        if text.contains(FAIL_MARKER) {
            return Err(CompileError::new(self.name(), unit.path.to_string(), "syntax error"));
        }
        Ok(CompiledArtifact::new(strip_types(&text), MimeType::JAVASCRIPT))
    }
}

/// Claims a MIME type under a fixed name, echoing the name as output.
pub struct NamedCompiler {
    pub name: &'static str,
    pub mime: &'static str,
}

impl Compiler for NamedCompiler {
    fn name(&self) -> &str {
        self.name
    }

    fn input_mime_types(&self) -> Vec<MimeType> {
        vec![MimeType::new(self.mime)]
    }

    fn compile(&self, _unit: &CompilationUnit, _options: &Value) -> Result<CompiledArtifact, CompileError> {
        Ok(CompiledArtifact::new(self.name, MimeType::JAVASCRIPT))
    }
}

/// Registry with the stub TypeScript compiler and passthrough.
pub fn builder_with(ts: &StubTypeScript) -> RegistryBuilder {
    RegistryBuilder::new()
        .register(Arc::new(PassthroughCompiler::new()))
        .register(Arc::new(ts.clone()))
}

/// An application directory and a separate cache directory.
pub struct Project {
    pub app: TempDir,
    pub cache: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            app: tempfile::tempdir().unwrap(),
            cache: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.app.path()
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.path()
    }

    /// Writes `content` to `rel` under the app root, creating directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.app.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Recursively copies a directory tree.
pub fn copy_tree(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}


//! Compile-on-request middleware.
//!
//! [`CompileMiddleware`] is framework-agnostic: the embedding server passes
//! the request method and URL and either sends the returned [`Response`] or
//! moves on to its next handler. Errors never escape; anything that goes
//! wrong while compiling falls through as [`Handled::Next`].

use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::HostError;
use crate::host::CompilerHost;

/// Which requests the middleware answers.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareOptions {
    /// Directory request URLs are resolved against.
    pub root: PathBuf,
    /// Subdirectory of `root` that URLs are relative to.
    pub cwd: PathBuf,
    /// Glob patterns a resolved file must match to be compiled.
    pub paths: Vec<String>,
    /// Glob patterns that exclude an otherwise matching file.
    pub ignore: Vec<String>,
}

/// A compiled response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// Response body. Empty for `HEAD` requests.
    pub body: String,
}

/// What the server should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// Send this response.
    Respond(Response),
    /// Pass the request to the next handler.
    Next,
}

/// Serves compiled assets for requests that match configured globs.
pub struct CompileMiddleware {
    base: PathBuf,
    paths: GlobSet,
    ignore: GlobSet,
    host: CompilerHost,
}

impl CompileMiddleware {
    /// Creates the middleware. Fails if a glob pattern is invalid.
    pub fn new(options: MiddlewareOptions, host: CompilerHost) -> Result<Self, HostError> {
        Ok(Self {
            base: options.root.join(&options.cwd),
            paths: build_globs(&options.paths)?,
            ignore: build_globs(&options.ignore)?,
            host,
        })
    }

    /// The host used for compilation.
    pub fn host(&self) -> &CompilerHost {
        &self.host
    }

    /// Handles a request, blocking while compiling.
    pub fn handle(&self, method: &str, url: &str) -> Handled {
        let Some((file, head)) = self.route(method, url) else {
            return Handled::Next;
        };
        tracing::debug!(path = %file.display(), "compiling on request");
        match self.host.compile_sync(&file) {
            Ok(artifact) => respond(&artifact, head),
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "falling through");
                Handled::Next
            }
        }
    }

    /// Handles a request without blocking the async runtime.
    pub async fn handle_async(&self, method: &str, url: &str) -> Handled {
        let Some((file, head)) = self.route(method, url) else {
            return Handled::Next;
        };
        tracing::debug!(path = %file.display(), "compiling on request");
        match self.host.compile(&file).await {
            Ok(artifact) => respond(&artifact, head),
            Err(e) => {
                tracing::debug!(path = %file.display(), error = %e, "falling through");
                Handled::Next
            }
        }
    }

    /// Resolves a request to the file to compile, and whether it is a `HEAD`.
    fn route(&self, method: &str, url: &str) -> Option<(PathBuf, bool)> {
        let head = if method.eq_ignore_ascii_case("HEAD") {
            true
        } else if method.eq_ignore_ascii_case("GET") {
            false
        } else {
            return None;
        };

        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let file = self.base.join(relative);
        let has_extension = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| !e.is_empty());
        if !has_extension || !self.paths.is_match(&file) || self.ignore.is_match(&file) {
            return None;
        }
        Some((file, head))
    }
}

fn respond(artifact: &xcompile_compiler::CompiledArtifact, head: bool) -> Handled {
    Handled::Respond(Response {
        status: 200,
        content_type: artifact.mime_type.to_string(),
        body: if head { String::new() } else { artifact.code.clone() },
    })
}

fn build_globs(patterns: &[String]) -> Result<GlobSet, HostError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| HostError::Configuration(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| HostError::Configuration(format!("invalid glob set: {e}")))
}

//! Compiler output.

use serde::{Deserialize, Serialize};
use xcompile_common::MimeType;

/// The immutable result of compiling one unit.
///
/// Addressed by fingerprint once stored; never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    /// The transformed source text.
    pub code: String,
    /// Content type of [`code`](Self::code), e.g. `application/javascript`.
    pub mime_type: MimeType,
    /// Source map, if the compiler produced one out-of-line.
    pub source_map: Option<String>,
    /// Files the compiler reported reading while producing the output.
    pub dependencies: Vec<String>,
}

impl CompiledArtifact {
    /// Creates an artifact with no source map or dependencies.
    pub fn new(code: impl Into<String>, mime_type: impl Into<MimeType>) -> Self {
        Self {
            code: code.into(),
            mime_type: mime_type.into(),
            source_map: None,
            dependencies: Vec::new(),
        }
    }

    /// Attaches a source map.
    pub fn with_source_map(mut self, source_map: impl Into<String>) -> Self {
        self.source_map = Some(source_map.into());
        self
    }

    /// Attaches reported dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

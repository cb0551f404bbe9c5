//! Compiler that serves already browser-ready files unchanged.

use serde_json::Value;
use xcompile_common::MimeType;
use xcompile_source::CompilationUnit;

use crate::artifact::CompiledArtifact;
use crate::compiler::Compiler;
use crate::error::CompileError;

/// Serves already-consumable formats unchanged.
///
/// Output MIME type is the unit's own type, falling back to `text/plain`
/// for unknown extensions.
pub struct PassthroughCompiler {
    inputs: Vec<MimeType>,
}

impl PassthroughCompiler {
    /// Handles JavaScript, CSS, and plain text.
    pub fn new() -> Self {
        Self::for_types([MimeType::JAVASCRIPT, MimeType::CSS, MimeType::PLAIN])
    }

    /// Handles exactly the given types.
    pub fn for_types<I, M>(inputs: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MimeType>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PassthroughCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for PassthroughCompiler {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn input_mime_types(&self) -> Vec<MimeType> {
        self.inputs.clone()
    }

    fn compile(&self, unit: &CompilationUnit, _options: &Value) -> Result<CompiledArtifact, CompileError> {
        let mime = unit
            .mime_type()
            .unwrap_or_else(|| MimeType::new(MimeType::PLAIN));
        Ok(CompiledArtifact::new(unit.text().into_owned(), mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_input_unchanged() {
        let unit = CompilationUnit::from_source("/app/site.css", "body { margin: 0 }");
        let out = PassthroughCompiler::new().compile(&unit, &Value::Null).unwrap();
        assert_eq!(out.code, "body { margin: 0 }");
        assert_eq!(out.mime_type.as_str(), MimeType::CSS);
    }

    #[test]
    fn unknown_extension_is_plain_text() {
        let unit = CompilationUnit::from_source("/app/LICENSE", "MIT");
        let out = PassthroughCompiler::new().compile(&unit, &Value::Null).unwrap();
        assert_eq!(out.mime_type.as_str(), MimeType::PLAIN);
    }

    #[test]
    fn custom_types() {
        let c = PassthroughCompiler::for_types(["text/x-custom"]);
        assert_eq!(c.input_mime_types(), vec![MimeType::new("text/x-custom")]);
    }
}

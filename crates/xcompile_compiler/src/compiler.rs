//! The capability contract every compiler implements.

use serde_json::Value;
use xcompile_common::MimeType;
use xcompile_source::CompilationUnit;

use crate::artifact::CompiledArtifact;
use crate::error::CompileError;

/// A source-to-source transformer for one or more input formats.
///
/// Implementations must be stateless with respect to compilation: the same
/// unit and options must always produce the same artifact, because results
/// are cached by fingerprint and may be replayed in another process.
pub trait Compiler: Send + Sync {
    /// Stable name, recorded in cache snapshots.
    fn name(&self) -> &str;

    /// Version string. Participates in fingerprints, so upgrading a compiler
    /// invalidates everything it produced before.
    fn version(&self) -> &str {
        "0"
    }

    /// MIME types this compiler accepts. Must not be empty.
    fn input_mime_types(&self) -> Vec<MimeType>;

    /// Compiles `unit` with the options configured for its format
    /// (`Value::Null` when none were configured).
    fn compile(&self, unit: &CompilationUnit, options: &Value) -> Result<CompiledArtifact, CompileError>;

    /// Whether output depends on the options of sibling compilers, as with
    /// compilers that delegate embedded blocks through the registry.
    fn is_composite(&self) -> bool {
        false
    }
}

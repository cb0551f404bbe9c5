//! Error types for compilation and registry assembly.

/// A compiler rejected its input.
///
/// `Clone` so one failure can be handed to every caller waiting on the same
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{compiler} failed to compile {path}: {message}")]
pub struct CompileError {
    /// Name of the compiler that failed.
    pub compiler: String,
    /// The file being compiled.
    pub path: String,
    /// Compiler-provided detail.
    pub message: String,
}

impl CompileError {
    /// Creates a compile error.
    pub fn new(
        compiler: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            compiler: compiler.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while assembling or querying a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No compiler is registered for the format.
    #[error("no compiler registered for '{0}'")]
    UnsupportedFormat(String),

    /// A composite compiler tried to reach the registry before it was built.
    #[error("compiler registry used before construction finished")]
    NotReady,

    /// Options were supplied for a format no compiler accepts.
    #[error("found compiler settings for missing compiler: {0}")]
    UnknownOptions(String),

    /// A compiler declared no input formats.
    #[error("compiler '{0}' declares no input MIME types")]
    NoInputTypes(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display() {
        let err = CompileError::new("typescript", "/app/a.ts", "unexpected token");
        assert_eq!(
            err.to_string(),
            "typescript failed to compile /app/a.ts: unexpected token"
        );
    }

    #[test]
    fn registry_error_display() {
        assert_eq!(
            RegistryError::UnknownOptions("text/less".into()).to_string(),
            "found compiler settings for missing compiler: text/less"
        );
        assert!(RegistryError::UnsupportedFormat("text/x-foo".into())
            .to_string()
            .contains("text/x-foo"));
    }
}

//! The compiler set the CLI registers.

use std::sync::Arc;

use xcompile_compiler::{InlineHtmlCompiler, PassthroughCompiler, RegistryBuilder};

/// Built-in compilers: passthrough for JavaScript, CSS and text, plus the
/// inline HTML compiler that routes embedded blocks through the others.
pub fn builtin() -> RegistryBuilder {
    RegistryBuilder::new()
        .register(Arc::new(PassthroughCompiler::new()))
        .register_composite(|handle| Arc::new(InlineHtmlCompiler::new(handle)))
}

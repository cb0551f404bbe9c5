//! The compiler host: cached, deduplicated dispatch of source files to
//! registered compilers.
//!
//! [`CompilerHost`] is the entry point for both consumers. The batch CLI
//! drives [`CompilerHost::compile_all`] and then saves the configuration
//! snapshot; request-serving code wraps a host in a [`CompileMiddleware`].
//! A production deployment rebuilds a read-only host from that snapshot with
//! [`CompilerHost::create_readonly_from_configuration`] and never compiles.

#![warn(missing_docs)]

pub mod error;
pub mod host;
pub mod middleware;
pub mod project;

pub use error::HostError;
pub use host::{BatchFailure, BatchReport, CompilerHost, HostMode};
pub use middleware::{CompileMiddleware, Handled, MiddlewareOptions, Response};
pub use project::{create_host_from_project_root, detect_production_mode, init};

pub use xcompile_cache::FlushPolicy;
pub use xcompile_compiler::{
    CompileError, CompiledArtifact, Compiler, InlineHtmlCompiler, PassthroughCompiler, Registry,
    RegistryBuilder, RegistryHandle,
};

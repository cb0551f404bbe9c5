//! The compiler capability contract and the registry that dispatches to it.
//!
//! Compilers are pluggable black boxes: each declares the MIME types it
//! accepts and turns a [`CompilationUnit`](xcompile_source::CompilationUnit)
//! into a [`CompiledArtifact`]. The [`Registry`] is assembled in two phases so
//! composite compilers can hold a handle to the finished registry.

#![warn(missing_docs)]

pub mod artifact;
pub mod builtin;
pub mod compiler;
pub mod error;
pub mod registry;

pub use artifact::CompiledArtifact;
pub use builtin::{InlineHtmlCompiler, PassthroughCompiler};
pub use compiler::Compiler;
pub use error::{CompileError, RegistryError};
pub use registry::{Registry, RegistryBuilder, RegistryHandle};

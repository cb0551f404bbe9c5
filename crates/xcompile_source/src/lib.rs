//! Source file identity, loading, and traversal.
//!
//! This crate provides the [`PathCanonicalizer`] that turns arbitrary paths into
//! platform-stable [`CanonicalPath`] keys, the [`CompilationUnit`] that pairs a
//! canonical path with the file's raw bytes, and [`for_all_files`] for walking a
//! directory tree.

#![warn(missing_docs)]

pub mod canonical;
pub mod error;
pub mod traverse;
pub mod unit;

pub use canonical::{CanonicalPath, PathCanonicalizer};
pub use error::SourceError;
pub use traverse::{collect_files, for_all_files};
pub use unit::CompilationUnit;

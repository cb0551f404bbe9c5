//! Shared foundational types used across the xcompile crates.
//!
//! This crate provides content hashing, the compile-cache [`Fingerprint`],
//! and MIME type identifiers with the extension lookup table used to decide
//! which compiler handles a file.

#![warn(missing_docs)]

pub mod hash;
pub mod mime;

pub use hash::{ContentHash, Fingerprint, ParseFingerprintError};
pub use mime::{mime_for_extension, mime_for_path, MimeType};

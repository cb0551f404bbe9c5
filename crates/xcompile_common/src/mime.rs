//! MIME type identifiers and the file-extension lookup table.
//!
//! Compilers register against MIME types; files are routed to a compiler by
//! mapping their extension through [`mime_for_extension`].

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

/// A format identifier such as `application/typescript` or `text/css`.
///
/// Stored lowercased so lookups are case-insensitive.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeType(String);

impl MimeType {
    /// Plain JavaScript.
    pub const JAVASCRIPT: &'static str = "application/javascript";
    /// CSS stylesheets.
    pub const CSS: &'static str = "text/css";
    /// HTML documents.
    pub const HTML: &'static str = "text/html";
    /// Plain text.
    pub const PLAIN: &'static str = "text/plain";

    /// Creates a MIME type, normalizing to lowercase.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MimeType({})", self.0)
    }
}

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MimeType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for MimeType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MimeType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps a file extension (without the leading dot) to its MIME type.
///
/// Returns `None` for extensions no known compiler family handles.
pub fn mime_for_extension(ext: &str) -> Option<MimeType> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "js" | "mjs" | "cjs" => MimeType::JAVASCRIPT,
        "jsx" => "text/jsx",
        "ts" => "application/typescript",
        "tsx" => "text/tsx",
        "coffee" => "text/coffeescript",
        "litcoffee" => "text/coffeescript-literate",
        "css" => MimeType::CSS,
        "less" => "text/less",
        "scss" => "text/scss",
        "sass" => "text/sass",
        "styl" => "text/stylus",
        "html" | "htm" => MimeType::HTML,
        "jade" | "pug" => "text/jade",
        "vue" => "text/vue",
        "cson" => "text/cson",
        "txt" | "text" => MimeType::PLAIN,
        _ => return None,
    };
    Some(MimeType::new(mime))
}

/// Maps a path to its MIME type by extension.
pub fn mime_for_path(path: &Path) -> Option<MimeType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
}

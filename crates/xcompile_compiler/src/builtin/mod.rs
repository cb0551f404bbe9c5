//! Compilers shipped with the host itself.
//!
//! Format-specific compilers (TypeScript, LESS, ...) are supplied by the
//! embedding application. These two cover plain assets and HTML pages that
//! embed other formats.

mod inline_html;
mod passthrough;

pub use inline_html::InlineHtmlCompiler;
pub use passthrough::PassthroughCompiler;

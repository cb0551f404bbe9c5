//! Compiler for HTML pages with embedded `<script>` and `<style>` blocks.

use std::ops::Range;

use serde_json::Value;
use xcompile_common::MimeType;
use xcompile_source::CompilationUnit;

use crate::artifact::CompiledArtifact;
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::registry::{Registry, RegistryHandle};

/// Compiles `<script type=...>` and `<style type=...>` blocks embedded in an
/// HTML page by dispatching each block to the compiler registered for its
/// declared type, then rewrites the `type` attribute to the output type.
///
/// Blocks without a `type`, or with a type no compiler handles, are left
/// as written.
pub struct InlineHtmlCompiler {
    registry: RegistryHandle,
}

impl InlineHtmlCompiler {
    /// Creates the compiler from a registry handle obtained through
    /// [`RegistryBuilder::register_composite`](crate::RegistryBuilder::register_composite).
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    fn rewrite_blocks(
        &self,
        registry: &Registry,
        unit: &CompilationUnit,
        source: &str,
        tag: &str,
    ) -> Result<String, CompileError> {
        let lower = source.to_ascii_lowercase();
        let open_pat = format!("<{tag}");
        let close_pat = format!("</{tag}");
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;

        while let Some(rel) = lower[cursor..].find(&open_pat) {
            let start = cursor + rel;
            let after_name = start + open_pat.len();
            match lower.as_bytes().get(after_name) {
                Some(b) if b.is_ascii_whitespace() || *b == b'>' => {}
                _ => {
                    // `<scripts>` and friends.
                    out.push_str(&source[cursor..after_name]);
                    cursor = after_name;
                    continue;
                }
            }
            let Some(tag_end) = lower[after_name..].find('>') else { break };
            let body_start = after_name + tag_end + 1;
            let Some(close) = lower[body_start..].find(&close_pat) else { break };
            let body_end = body_start + close;

            let open_tag = &source[start..body_start];
            let body = &source[body_start..body_end];
            out.push_str(&source[cursor..start]);

            match type_attribute(open_tag).filter(|(mime, _)| registry.resolve(mime.as_str()).is_ok()) {
                Some((mime, range)) => {
                    let block = CompilationUnit {
                        path: unit.path.clone(),
                        bytes: body.as_bytes().to_vec(),
                    };
                    let compiled = registry.compile(mime.as_str(), &block).map_err(|e| {
                        CompileError::new(self.name(), unit.path.to_string(), format!("inline <{tag}>: {e}"))
                    })?;
                    out.push_str(&open_tag[..range.start]);
                    out.push_str(compiled.mime_type.as_str());
                    out.push_str(&open_tag[range.end..]);
                    out.push_str(&compiled.code);
                }
                None => {
                    out.push_str(open_tag);
                    out.push_str(body);
                }
            }
            cursor = body_end;
        }

        out.push_str(&source[cursor..]);
        Ok(out)
    }
}

impl Compiler for InlineHtmlCompiler {
    fn name(&self) -> &str {
        "inline-html"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn input_mime_types(&self) -> Vec<MimeType> {
        vec![MimeType::new(MimeType::HTML)]
    }

    fn compile(&self, unit: &CompilationUnit, _options: &Value) -> Result<CompiledArtifact, CompileError> {
        let registry = self
            .registry
            .get()
            .map_err(|e| CompileError::new(self.name(), unit.path.to_string(), e.to_string()))?;
        let text = unit.text();
        let with_scripts = self.rewrite_blocks(&registry, unit, &text, "script")?;
        let with_styles = self.rewrite_blocks(&registry, unit, &with_scripts, "style")?;
        Ok(CompiledArtifact::new(with_styles, MimeType::HTML))
    }

    fn is_composite(&self) -> bool {
        true
    }
}

/// Finds a quoted `type="..."` attribute in an opening tag, returning the
/// value and its byte range within the tag.
fn type_attribute(open_tag: &str) -> Option<(MimeType, Range<usize>)> {
    let lower = open_tag.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("type") {
        let at = from + rel;
        from = at + 4;
        if at == 0 || !bytes[at - 1].is_ascii_whitespace() {
            continue;
        }
        let mut i = at + 4;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let quote = match bytes.get(i) {
            Some(q @ (b'"' | b'\'')) => *q as char,
            _ => continue,
        };
        let value_start = i + 1;
        let len = lower[value_start..].find(quote)?;
        let range = value_start..value_start + len;
        return Some((MimeType::new(&open_tag[range.clone()]), range));
    }
    None
}

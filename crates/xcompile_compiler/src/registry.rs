//! MIME type → compiler dispatch.
//!
//! Construction happens in two phases. During the first, compilers are
//! registered with a [`RegistryBuilder`]; composite compilers receive a
//! [`RegistryHandle`] that does not resolve yet. [`RegistryBuilder::build`]
//! then freezes the bindings and wires the handle, after which compile calls
//! are allowed. A handle used too early fails with [`RegistryError::NotReady`].
//!
//! When two compilers claim the same MIME type the one registered last wins.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use serde_json::{json, Value};
use xcompile_common::{mime_for_path, MimeType};
use xcompile_source::CompilationUnit;

use crate::artifact::CompiledArtifact;
use crate::compiler::Compiler;
use crate::error::{CompileError, RegistryError};

/// Forward reference to a registry that may not be built yet.
///
/// Holds a weak pointer so a composite compiler stored inside the registry
/// does not keep the registry alive.
#[derive(Clone, Default)]
pub struct RegistryHandle {
    slot: Arc<OnceLock<Weak<Registry>>>,
}

impl RegistryHandle {
    /// Returns the finished registry.
    pub fn get(&self) -> Result<Arc<Registry>, RegistryError> {
        self.slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or(RegistryError::NotReady)
    }
}

/// Collects compilers before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    compilers: Vec<Arc<dyn Compiler>>,
    handle: RegistryHandle,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiler for every MIME type it declares.
    pub fn register(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compilers.push(compiler);
        self
    }

    /// Registers a compiler that needs to call back into the registry.
    ///
    /// `make` receives a handle that resolves once [`build`](Self::build)
    /// has completed.
    pub fn register_composite<F>(self, make: F) -> Self
    where
        F: FnOnce(RegistryHandle) -> Arc<dyn Compiler>,
    {
        let compiler = make(self.handle.clone());
        self.register(compiler)
    }

    /// Number of compilers registered so far.
    pub fn len(&self) -> usize {
        self.compilers.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.compilers.is_empty()
    }

    /// Freezes the registry with the given per-MIME-type options.
    ///
    /// Fails if a compiler declares no input types, or if options name a
    /// MIME type no compiler accepts.
    pub fn build(self, options: BTreeMap<String, Value>) -> Result<Arc<Registry>, RegistryError> {
        let mut by_mime: HashMap<MimeType, Arc<dyn Compiler>> = HashMap::new();
        for compiler in self.compilers {
            let inputs = compiler.input_mime_types();
            if inputs.is_empty() {
                return Err(RegistryError::NoInputTypes(compiler.name().to_string()));
            }
            for mime in inputs {
                if let Some(previous) = by_mime.insert(mime.clone(), Arc::clone(&compiler)) {
                    tracing::debug!(
                        mime = %mime,
                        replaced = previous.name(),
                        by = compiler.name(),
                        "duplicate registration, last one wins"
                    );
                }
            }
        }

        let mut resolved_options = BTreeMap::new();
        for (mime, value) in options {
            let mime = MimeType::new(mime);
            if !by_mime.contains_key(&mime) {
                return Err(RegistryError::UnknownOptions(mime.to_string()));
            }
            resolved_options.insert(mime, value);
        }

        let fragments = compute_fragments(&by_mime, &resolved_options);
        let registry = Arc::new(Registry {
            compilers: by_mime,
            options: resolved_options,
            fragments,
        });
        // The slot is private to this builder and only ever set here.
        let _ = self.handle.slot.set(Arc::downgrade(&registry));
        Ok(registry)
    }
}

/// A frozen mapping from MIME type to compiler and options.
pub struct Registry {
    compilers: HashMap<MimeType, Arc<dyn Compiler>>,
    options: BTreeMap<MimeType, Value>,
    fragments: HashMap<MimeType, Vec<u8>>,
}

impl Registry {
    /// Determines the format of `path` from its extension.
    pub fn identify(&self, path: &Path) -> Option<MimeType> {
        mime_for_path(path)
    }

    /// Returns the compiler responsible for `mime`.
    pub fn resolve(&self, mime: &str) -> Result<Arc<dyn Compiler>, RegistryError> {
        self.compilers
            .get(mime)
            .cloned()
            .ok_or_else(|| RegistryError::UnsupportedFormat(mime.to_string()))
    }

    /// Identifies and resolves in one step.
    pub fn resolve_path(&self, path: &Path) -> Result<(MimeType, Arc<dyn Compiler>), RegistryError> {
        let mime = self
            .identify(path)
            .ok_or_else(|| RegistryError::UnsupportedFormat(path.display().to_string()))?;
        let compiler = self.resolve(mime.as_str())?;
        Ok((mime, compiler))
    }

    /// Options configured for `mime`, or `Value::Null`.
    pub fn options_for(&self, mime: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.options.get(mime).unwrap_or(&NULL)
    }

    /// All configured options, keyed by MIME type.
    pub fn options(&self) -> &BTreeMap<MimeType, Value> {
        &self.options
    }

    /// The serialized configuration folded into fingerprints for `mime`.
    ///
    /// Covers the compiler's name and version and its options; for composite
    /// compilers it also covers every other format's options.
    pub fn config_fragment(&self, mime: &str) -> &[u8] {
        self.fragments.get(mime).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Compiles `unit` as `mime` with the registered compiler and options.
    pub fn compile(&self, mime: &str, unit: &CompilationUnit) -> Result<CompiledArtifact, CompileError> {
        let compiler = self
            .resolve(mime)
            .map_err(|e| CompileError::new("registry", unit.path.to_string(), e.to_string()))?;
        compiler.compile(unit, self.options_for(mime))
    }

    /// MIME type → `name@version` of the bound compiler, sorted.
    pub fn bindings(&self) -> BTreeMap<String, String> {
        self.compilers
            .iter()
            .map(|(mime, c)| (mime.to_string(), format!("{}@{}", c.name(), c.version())))
            .collect()
    }

    /// Registered MIME types, sorted.
    pub fn mime_types(&self) -> Vec<MimeType> {
        let mut mimes: Vec<MimeType> = self.compilers.keys().cloned().collect();
        mimes.sort();
        mimes
    }
}

fn compute_fragments(
    compilers: &HashMap<MimeType, Arc<dyn Compiler>>,
    options: &BTreeMap<MimeType, Value>,
) -> HashMap<MimeType, Vec<u8>> {
    compilers
        .iter()
        .map(|(mime, compiler)| {
            let mut fragment = json!({
                "compiler": compiler.name(),
                "version": compiler.version(),
                "options": options.get(mime).cloned().unwrap_or(Value::Null),
            });
            if compiler.is_composite() {
                let siblings: BTreeMap<String, String> = compilers
                    .iter()
                    .filter(|(other, _)| *other != mime)
                    .map(|(other, c)| {
                        let opts = options.get(other).cloned().unwrap_or(Value::Null);
                        (other.to_string(), format!("{}@{}:{opts}", c.name(), c.version()))
                    })
                    .collect();
                fragment["siblings"] = json!(siblings);
            }
            // serde_json maps are ordered, so this encoding is canonical.
            let bytes = serde_json::to_vec(&fragment).unwrap_or_default();
            (mime.clone(), bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        inputs: Vec<&'static str>,
    }

    impl Compiler for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn input_mime_types(&self) -> Vec<MimeType> {
            self.inputs.iter().map(|m| MimeType::new(m)).collect()
        }

        fn compile(&self, unit: &CompilationUnit, _options: &Value) -> Result<CompiledArtifact, CompileError> {
            Ok(CompiledArtifact::new(
                format!("{}:{}", self.name, unit.text()),
                MimeType::JAVASCRIPT,
            ))
        }
    }

    fn named(name: &'static str, inputs: &[&'static str]) -> Arc<dyn Compiler> {
        Arc::new(Named {
            name,
            inputs: inputs.to_vec(),
        })
    }

    #[test]
    fn resolve_registered_type() {
        let registry = RegistryBuilder::new()
            .register(named("ts", &["application/typescript", "text/tsx"]))
            .build(BTreeMap::new())
            .unwrap();
        assert_eq!(registry.resolve("application/typescript").unwrap().name(), "ts");
        assert_eq!(registry.resolve("text/tsx").unwrap().name(), "ts");
    }

    #[test]
    fn resolve_unknown_type() {
        let registry = RegistryBuilder::new()
            .register(named("ts", &["application/typescript"]))
            .build(BTreeMap::new())
            .unwrap();
        let err = registry.resolve("text/less").err().unwrap();
        assert_eq!(err, RegistryError::UnsupportedFormat("text/less".into()));
    }

    #[test]
    fn last_registration_wins() {
        let registry = RegistryBuilder::new()
            .register(named("first", &["text/less"]))
            .register(named("second", &["text/less", "text/scss"]))
            .build(BTreeMap::new())
            .unwrap();
        assert_eq!(registry.resolve("text/less").unwrap().name(), "second");
    }

    #[test]
    fn options_for_unknown_compiler_rejected() {
        let mut options = BTreeMap::new();
        options.insert("text/stylus".to_string(), json!({}));
        let err = RegistryBuilder::new()
            .register(named("less", &["text/less"]))
            .build(options)
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::UnknownOptions("text/stylus".into()));
    }

    #[test]
    fn compiler_without_inputs_rejected() {
        let err = RegistryBuilder::new()
            .register(named("empty", &[]))
            .build(BTreeMap::new())
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::NoInputTypes("empty".into()));
    }

    #[test]
    fn options_are_exposed() {
        let mut options = BTreeMap::new();
        options.insert("Text/Less".to_string(), json!({"compress": true}));
        let registry = RegistryBuilder::new()
            .register(named("less", &["text/less"]))
            .build(options)
            .unwrap();
        assert_eq!(registry.options_for("text/less")["compress"], true);
        assert!(registry.options_for("text/scss").is_null());
    }

    #[test]
    fn fragment_tracks_options() {
        let build = |target: &str| {
            let mut options = BTreeMap::new();
            options.insert("application/typescript".to_string(), json!({"target": target}));
            RegistryBuilder::new()
                .register(named("ts", &["application/typescript"]))
                .build(options)
                .unwrap()
        };
        let a = build("es5");
        let b = build("es5");
        let c = build("es2017");
        assert_eq!(
            a.config_fragment("application/typescript"),
            b.config_fragment("application/typescript")
        );
        assert_ne!(
            a.config_fragment("application/typescript"),
            c.config_fragment("application/typescript")
        );
    }

    #[test]
    fn handle_not_ready_before_build() {
        let mut captured = None;
        let builder = RegistryBuilder::new().register_composite(|handle| {
            captured = Some(handle.clone());
            named("html", &["text/html"])
        });
        let handle = captured.unwrap();
        assert_eq!(handle.get().err(), Some(RegistryError::NotReady));

        let registry = builder.build(BTreeMap::new()).unwrap();
        assert!(Arc::ptr_eq(&handle.get().unwrap(), &registry));
    }

    #[test]
    fn handle_does_not_keep_registry_alive() {
        let mut captured = None;
        let registry = RegistryBuilder::new()
            .register_composite(|handle| {
                captured = Some(handle);
                named("html", &["text/html"])
            })
            .build(BTreeMap::new())
            .unwrap();
        let handle = captured.unwrap();
        drop(registry);
        assert_eq!(handle.get().err(), Some(RegistryError::NotReady));
    }

    #[test]
    fn compile_through_registry() {
        let registry = RegistryBuilder::new()
            .register(named("ts", &["application/typescript"]))
            .build(BTreeMap::new())
            .unwrap();
        let unit = CompilationUnit::from_source("/a.ts", "x");
        let out = registry.compile("application/typescript", &unit).unwrap();
        assert_eq!(out.code, "ts:x");
    }

    #[test]
    fn bindings_name_compilers() {
        let registry = RegistryBuilder::new()
            .register(named("less", &["text/less"]))
            .build(BTreeMap::new())
            .unwrap();
        assert_eq!(registry.bindings()["text/less"], "less@0");
    }
}

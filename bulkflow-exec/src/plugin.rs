//! Plugin lookup
//!
//! A [`PluginRegistry`] asks an ordered list of [`PluginSource`]s for a
//! plugin; the first source that knows the identifier wins. Sources are
//! assembled at startup, so lookup never depends on how plugins were found.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use bulkflow_format::{FlowError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Role a plugin plays in a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// Reads records from a source system
    Input,
    /// Turns raw bytes into records
    Parser,
    /// Unwraps a byte stream (decompression)
    Decoder,
    /// Transforms records
    Filter,
    /// Turns records into raw bytes
    Formatter,
    /// Wraps a byte stream (compression)
    Encoder,
    /// Writes records to a destination
    Output,
}

impl PluginKind {
    /// Lowercase name used in identifiers and configuration.
    pub fn name(self) -> &'static str {
        match self {
            PluginKind::Input => "input",
            PluginKind::Parser => "parser",
            PluginKind::Decoder => "decoder",
            PluginKind::Filter => "filter",
            PluginKind::Formatter => "formatter",
            PluginKind::Encoder => "encoder",
            PluginKind::Output => "output",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of one plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginId {
    /// Role of the plugin
    pub kind: PluginKind,
    /// Name the plugin is configured by
    pub name: String,
}

impl PluginId {
    /// Build an identifier.
    pub fn new(kind: PluginKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Something that can produce plugins of type `F`
pub trait PluginSource<F: ?Sized>: Send + Sync {
    /// The plugin registered under `id`, if this source has one.
    fn find(&self, id: &PluginId) -> Option<Arc<F>>;
}

/// Source backed by plugins registered in code at startup
pub struct StaticPluginSource<F: ?Sized> {
    plugins: AHashMap<PluginId, Arc<F>>,
}

impl<F: ?Sized> Default for StaticPluginSource<F> {
    fn default() -> Self {
        Self {
            plugins: AHashMap::new(),
        }
    }
}

impl<F: ?Sized> StaticPluginSource<F> {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `id`, returning any plugin it replaces.
    pub fn register(&mut self, id: PluginId, plugin: Arc<F>) -> Option<Arc<F>> {
        self.plugins.insert(id, plugin)
    }

    /// Builder form of [`StaticPluginSource::register`].
    pub fn with(mut self, kind: PluginKind, name: &str, plugin: Arc<F>) -> Self {
        self.register(PluginId::new(kind, name), plugin);
        self
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&PluginId> {
        let mut ids: Vec<&PluginId> = self.plugins.keys().collect();
        ids.sort_by(|a, b| (a.kind.name(), &a.name).cmp(&(b.kind.name(), &b.name)));
        ids
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<F: ?Sized + Send + Sync> PluginSource<F> for StaticPluginSource<F> {
    fn find(&self, id: &PluginId) -> Option<Arc<F>> {
        self.plugins.get(id).cloned()
    }
}

/// Ordered list of plugin sources
pub struct PluginRegistry<F: ?Sized> {
    sources: Vec<Box<dyn PluginSource<F>>>,
}

impl<F: ?Sized> Default for PluginRegistry<F> {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
        }
    }
}

impl<F: ?Sized> PluginRegistry<F> {
    /// Registry with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; earlier sources take precedence.
    pub fn add_source(&mut self, source: impl PluginSource<F> + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Builder form of [`PluginRegistry::add_source`].
    pub fn with_source(mut self, source: impl PluginSource<F> + 'static) -> Self {
        self.add_source(source);
        self
    }

    /// First plugin any source has for `id`.
    pub fn find(&self, id: &PluginId) -> Option<Arc<F>> {
        self.sources.iter().find_map(|source| source.find(id))
    }

    /// Look up a plugin, failing with `PluginNotFound` if no source has it.
    pub fn lookup(&self, kind: PluginKind, name: &str) -> Result<Arc<F>> {
        let id = PluginId::new(kind, name);
        trace!(plugin = %id, sources = self.sources.len(), "looking up plugin");
        self.find(&id)
            .ok_or_else(|| FlowError::PluginNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    fn source(text: &'static str) -> StaticPluginSource<dyn Greeter> {
        let plugin: Arc<dyn Greeter> = Arc::new(Fixed(text));
        StaticPluginSource::new().with(PluginKind::Formatter, "hello", plugin)
    }

    #[test]
    fn test_first_source_wins() {
        let registry = PluginRegistry::new()
            .with_source(source("first"))
            .with_source(source("second"));
        let plugin = registry.lookup(PluginKind::Formatter, "hello").unwrap();
        assert_eq!(plugin.greet(), "first");
    }

    #[test]
    fn test_later_source_fills_gaps() {
        let mut extra: StaticPluginSource<dyn Greeter> = StaticPluginSource::new();
        extra.register(PluginId::new(PluginKind::Output, "stdout"), Arc::new(Fixed("out")));
        let registry = PluginRegistry::new()
            .with_source(source("first"))
            .with_source(extra);
        assert_eq!(
            registry.lookup(PluginKind::Output, "stdout").unwrap().greet(),
            "out"
        );
    }

    #[test]
    fn test_missing_plugin() {
        let registry = PluginRegistry::new().with_source(source("first"));
        match registry.lookup(PluginKind::Parser, "hello") {
            Err(FlowError::PluginNotFound(id)) => assert_eq!(id, "parser:hello"),
            Err(other) => panic!("expected plugin not found, got {other:?}"),
            Ok(_) => panic!("expected plugin not found"),
        }
        let empty: PluginRegistry<dyn Greeter> = PluginRegistry::new();
        assert!(empty.lookup(PluginKind::Formatter, "hello").is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut source = source("old");
        let replaced = source.register(
            PluginId::new(PluginKind::Formatter, "hello"),
            Arc::new(Fixed("new")),
        );
        assert_eq!(replaced.unwrap().greet(), "old");
        assert_eq!(source.len(), 1);
        assert_eq!(source.ids()[0].to_string(), "formatter:hello");
    }

    #[test]
    fn test_kind_config_name() {
        #[derive(Deserialize)]
        struct Entry {
            kind: PluginKind,
        }

        let entry: Entry = toml::from_str("kind = \"filter\"").unwrap();
        assert_eq!(entry.kind, PluginKind::Filter);
        assert_eq!(entry.kind.to_string(), "filter");
    }
}

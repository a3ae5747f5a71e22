//! Analysis engine interfaces
//!
//! The coordinator never processes specification documents itself. It drives
//! an [`AnalysisEngine`], which classifies documents, discovers configuration
//! files and hands out one [`EngineSession`] per configuration context.
//! Sessions report their findings as [`EngineMessage`]s on a channel owned by
//! the coordinator.

pub mod literate;
pub mod local;
pub mod rules;
pub mod source_map;

use crate::errors::{EngineError, ReadError};
use lsp_types::Url;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

pub use source_map::{locate_path, JsonPath, PathSegment};

/// Configuration entry listing the inputs of a context.
pub const INPUT_FILE_ENTRY: &str = "input-file";

/// Plugin whose messages link to the published rule documentation.
pub const VALIDATOR_PLUGIN: &str = "azure-validator";

pub type MessageSender = mpsc::UnboundedSender<EngineMessage>;
pub type MessageReceiver = mpsc::UnboundedReceiver<EngineMessage>;

/// Severity class of an engine message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Information,
    Warning,
    Error,
    Debug,
    Verbose,
    Fatal,
}

/// Position inside a source document: the line is 1-based, the column is
/// 0-based and reaches the editor unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    /// URI of the document, as the engine spells it
    pub document: String,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

/// One finding or log line produced by an engine session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMessage {
    pub channel: Channel,
    pub text: String,
    pub plugin: Option<String>,
    pub key: Vec<String>,
    pub ranges: Vec<SourceRange>,
}

impl EngineMessage {
    pub fn new(channel: Channel, text: impl Into<String>) -> Self {
        Self { channel, text: text.into(), plugin: None, key: vec![], ranges: vec![] }
    }

    pub fn with_plugin(mut self, plugin: &str) -> Self {
        self.plugin = Some(plugin.to_string());
        self
    }

    pub fn with_key<I, S>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = key.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.ranges.push(range);
        self
    }
}

/// Read access to documents, whether open in the editor or only on disk.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    /// `Ok(None)` when no such document exists.
    async fn read_document(&self, uri: &Url) -> Result<Option<String>, ReadError>;
}

/// Effective configuration of one context.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationView {
    folder: Url,
    entries: Map<String, Value>,
}

impl ConfigurationView {
    pub fn new(folder: Url, entries: Map<String, Value>) -> Self {
        Self { folder, entries }
    }

    pub fn folder(&self) -> &Url {
        &self.folder
    }

    pub fn get_entry(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Declared inputs resolved against the configuration folder, deduplicated
    /// in declaration order.
    pub fn input_file_uris(&self) -> Vec<Url> {
        let declared: Vec<&str> = match self.entries.get(INPUT_FILE_ENTRY) {
            Some(Value::String(single)) => vec![single.as_str()],
            Some(Value::Array(many)) => many.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        };
        let mut inputs: Vec<Url> = Vec::new();
        for raw in declared {
            let Ok(resolved) = self.folder.join(raw.trim()) else {
                continue;
            };
            let resolved = crate::utils::normalize_uri(&resolved);
            if !inputs.contains(&resolved) {
                inputs.push(resolved);
            }
        }
        inputs
    }

    /// Whether a boolean plugin switch such as `azure-validator` is on.
    pub fn is_enabled(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Bool(true)))
    }
}

/// Output of a processing pass: the deep merge of every input, plus the input
/// each merged node came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedDefinition {
    pub document: Value,
    pub source_map: BTreeMap<JsonPath, Url>,
}

impl MergedDefinition {
    /// Source document of the node at `path`, falling back to the closest
    /// mapped ancestor.
    pub fn source_of(&self, path: &JsonPath) -> Option<&Url> {
        let mut probe = path.clone();
        loop {
            if let Some(uri) = self.source_map.get(&probe) {
                return Some(uri);
            }
            if probe.pop().is_none() {
                return None;
            }
        }
    }
}

/// The engine shared by all contexts of a coordinator.
#[allow(async_fn_in_trait)]
pub trait AnalysisEngine {
    type Session: EngineSession;

    /// Acquires the engine runtime at the requested version.
    async fn initialize(&mut self, requested_version: &str) -> Result<(), EngineError>;

    fn is_configuration_extension(&self, language_id: &str) -> bool;

    fn is_specification_extension(&self, language_id: &str) -> bool;

    /// Searches from `folder` upward for the configuration document governing
    /// it.
    async fn detect_configuration_file<S: DocumentSource>(
        &self,
        source: &S,
        folder: &Url,
    ) -> Result<Option<Url>, EngineError>;

    /// Converts a literate (or plain) specification into JSON text.
    fn literate_to_json(&self, content: &str) -> Option<String>;

    fn is_specification_file(&self, content: &str) -> bool;

    fn create_session(&self, configuration: &Url, messages: MessageSender) -> Self::Session;
}

/// Processing state of one configuration context.
#[allow(async_fn_in_trait)]
pub trait EngineSession {
    /// Reloads the configuration document and returns the effective view.
    async fn load_view<S: DocumentSource>(
        &mut self,
        source: &S,
    ) -> Result<ConfigurationView, EngineError>;

    /// The view produced by the last successful load.
    fn view(&self) -> Option<&ConfigurationView>;

    /// Layers programmatic configuration over the configuration document.
    fn add_configuration(&mut self, configuration: Value);

    /// Makes `uri` known to the session as an input.
    fn read_file(&mut self, uri: &Url);

    /// Runs one processing pass over every input, emitting messages.
    async fn process<S: DocumentSource>(&mut self, source: &S) -> Result<(), EngineError>;

    fn merged_definition(&self) -> Option<&MergedDefinition>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(entries: Value) -> ConfigurationView {
        let Value::Object(entries) = entries else { panic!("expected an object") };
        ConfigurationView::new(Url::parse("file:///work/api/").unwrap(), entries)
    }

    #[test]
    fn test_input_file_uris_resolve_against_folder() {
        let view = view(json!({
            "input-file": ["pets.json", "./store/orders.yaml", "file:///elsewhere/x.json", "pets.json"]
        }));
        let inputs: Vec<String> = view.input_file_uris().iter().map(|u| u.to_string()).collect();
        assert_eq!(
            inputs,
            vec![
                "file:///work/api/pets.json",
                "file:///work/api/store/orders.yaml",
                "file:///elsewhere/x.json",
            ]
        );
    }

    #[test]
    fn test_single_input_file_string() {
        let view = view(json!({ "input-file": "pets.json", "azure-validator": true }));
        assert_eq!(view.input_file_uris().len(), 1);
        assert!(view.is_enabled(VALIDATOR_PLUGIN));
        assert!(!view.is_enabled("missing"));
    }

    #[test]
    fn test_source_of_falls_back_to_ancestor() {
        let pets = Url::parse("file:///work/pets.json").unwrap();
        let mut merged = MergedDefinition::default();
        merged.source_map.insert(JsonPath::from_keys(&["definitions"]), pets.clone());

        let nested = JsonPath::from_keys(&["definitions", "Pet", "properties"]);
        assert_eq!(merged.source_of(&nested), Some(&pets));
        assert_eq!(merged.source_of(&JsonPath::from_keys(&["paths"])), None);
    }
}

//! Built-in analysis engine
//!
//! Processes JSON, YAML and literate specifications in-process so the server
//! is usable without an external toolchain.

use super::literate::{self, LiterateError};
use super::rules::run_rules;
use super::source_map::{locate_path, JsonPath};
use super::{
    AnalysisEngine, Channel, ConfigurationView, DocumentSource, EngineMessage, EngineSession,
    MergedDefinition, MessageSender, SourcePosition, SourceRange, VALIDATOR_PLUGIN,
};
use crate::errors::EngineError;
use crate::settings::DEFAULT_ENGINE_VERSION;
use crate::utils::{extension_of, folder_of, normalize_uri};
use lsp_types::Url;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Version of the built-in runtime.
pub const ENGINE_VERSION: &str = "3.0.0";

/// File names probed in every folder during configuration discovery.
pub const CONFIGURATION_FILE_NAMES: [&str; 2] = ["readme.md", "README.md"];

const CONFIGURATION_EXTENSIONS: [&str; 2] = ["markdown", "md"];
const SPECIFICATION_EXTENSIONS: [&str; 5] = ["json", "yaml", "yml", "markdown", "md"];

#[derive(Debug, Default)]
pub struct LocalEngine {
    runtime: Option<String>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version acquired by the last successful [`AnalysisEngine::initialize`].
    pub fn runtime_version(&self) -> Option<&str> {
        self.runtime.as_deref()
    }
}

impl AnalysisEngine for LocalEngine {
    type Session = LocalSession;

    async fn initialize(&mut self, requested_version: &str) -> Result<(), EngineError> {
        if requested_version != DEFAULT_ENGINE_VERSION
            && !version_satisfied(requested_version, ENGINE_VERSION)
        {
            return Err(EngineError::Initialization {
                requested: requested_version.to_string(),
                message: format!("the built-in runtime is version {ENGINE_VERSION}"),
            });
        }
        self.runtime = Some(ENGINE_VERSION.to_string());
        Ok(())
    }

    fn is_configuration_extension(&self, language_id: &str) -> bool {
        CONFIGURATION_EXTENSIONS.contains(&language_id.to_ascii_lowercase().as_str())
    }

    fn is_specification_extension(&self, language_id: &str) -> bool {
        SPECIFICATION_EXTENSIONS.contains(&language_id.to_ascii_lowercase().as_str())
    }

    async fn detect_configuration_file<S: DocumentSource>(
        &self,
        source: &S,
        folder: &Url,
    ) -> Result<Option<Url>, EngineError> {
        if folder.cannot_be_a_base() {
            return Ok(None);
        }
        let discovery_error =
            |message: String| EngineError::Discovery { folder: folder.clone(), message };

        let mut current = folder.clone();
        loop {
            for name in CONFIGURATION_FILE_NAMES {
                let candidate = current.join(name).map_err(|e| discovery_error(e.to_string()))?;
                let candidate = normalize_uri(&candidate);
                if let Some(content) = source.read_document(&candidate).await? {
                    if literate::is_configuration(&content) {
                        return Ok(Some(candidate));
                    }
                }
            }
            let parent = current.join("..").map_err(|e| discovery_error(e.to_string()))?;
            if parent == current {
                return Ok(None);
            }
            current = parent;
        }
    }

    fn literate_to_json(&self, content: &str) -> Option<String> {
        literate::literate_to_json(content)
    }

    fn is_specification_file(&self, content: &str) -> bool {
        serde_json::from_str::<Value>(content)
            .ok()
            .or_else(|| literate::parse_literate(content).ok())
            .is_some_and(|value| is_specification(&value))
    }

    fn create_session(&self, configuration: &Url, messages: MessageSender) -> LocalSession {
        LocalSession {
            configuration: configuration.clone(),
            additions: vec![],
            known_inputs: vec![],
            view: None,
            merged: None,
            messages,
        }
    }
}

/// Processing state of one configuration context.
#[derive(Debug)]
pub struct LocalSession {
    configuration: Url,
    additions: Vec<Value>,
    known_inputs: Vec<Url>,
    view: Option<ConfigurationView>,
    merged: Option<MergedDefinition>,
    messages: MessageSender,
}

impl EngineSession for LocalSession {
    async fn load_view<S: DocumentSource>(
        &mut self,
        source: &S,
    ) -> Result<ConfigurationView, EngineError> {
        let content = source.read_document(&self.configuration).await?.ok_or_else(|| {
            EngineError::Configuration {
                uri: self.configuration.clone(),
                message: "configuration document not found".to_string(),
            }
        })?;
        let mut merged = literate::parse_literate(&content).map_err(|e| EngineError::Parse {
            uri: self.configuration.clone(),
            message: e.message,
        })?;
        if merged.is_null() {
            merged = Value::Object(Map::new());
        }
        for addition in &self.additions {
            literate::merge_configuration(&mut merged, addition.clone());
        }
        let Value::Object(entries) = merged else {
            return Err(EngineError::Configuration {
                uri: self.configuration.clone(),
                message: "configuration is not a mapping".to_string(),
            });
        };
        let view = ConfigurationView::new(folder_of(&self.configuration), entries);
        self.view = Some(view.clone());
        Ok(view)
    }

    fn view(&self) -> Option<&ConfigurationView> {
        self.view.as_ref()
    }

    fn add_configuration(&mut self, configuration: Value) {
        self.additions.push(configuration);
    }

    fn read_file(&mut self, uri: &Url) {
        let uri = normalize_uri(uri);
        if !self.known_inputs.contains(&uri) {
            self.known_inputs.push(uri);
        }
    }

    async fn process<S: DocumentSource>(&mut self, source: &S) -> Result<(), EngineError> {
        let view = self.load_view(source).await?;
        let mut inputs = view.input_file_uris();
        for known in &self.known_inputs {
            if !inputs.contains(known) {
                inputs.push(known.clone());
            }
        }
        let validate = view.is_enabled(VALIDATOR_PLUGIN);

        let mut merged_document = Map::new();
        let mut source_map = BTreeMap::new();
        let mut externals = HashMap::new();
        let mut findings = 0;

        for input in &inputs {
            let text = match source.read_document(input).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    self.emit(EngineMessage::new(
                        Channel::Fatal,
                        format!("Unable to read input file '{input}'"),
                    ));
                    continue;
                }
                Err(e) => {
                    self.emit(EngineMessage::new(Channel::Fatal, e.to_string()));
                    continue;
                }
            };
            let document = match parse_input(input, &text) {
                Ok(document) => document,
                Err(e) => {
                    let column = e.column.saturating_sub(1);
                    self.emit(EngineMessage::new(Channel::Error, e.message).with_range(SourceRange {
                        document: input.to_string(),
                        start: SourcePosition::new(e.line, column),
                        end: SourcePosition::new(e.line, column + 1),
                    }));
                    findings += 1;
                    continue;
                }
            };

            let mut messages = check_document(input, &text, &document, validate);
            messages.extend(check_references(source, input, &text, &document, &mut externals).await);
            findings += messages.len();
            for message in messages {
                self.emit(message);
            }
            if let Value::Object(entries) = document {
                let root = JsonPath::root();
                merge_definition(&mut merged_document, &mut source_map, entries, input, &root);
            }
        }

        self.merged = Some(MergedDefinition { document: Value::Object(merged_document), source_map });
        self.emit(EngineMessage::new(
            Channel::Verbose,
            format!(
                "Processed {} input file(s) for {}: {} finding(s)",
                inputs.len(),
                self.configuration,
                findings
            ),
        ));
        Ok(())
    }

    fn merged_definition(&self) -> Option<&MergedDefinition> {
        self.merged.as_ref()
    }
}

impl LocalSession {
    fn emit(&self, message: EngineMessage) {
        // nobody listens anymore once the coordinator is gone
        let _ = self.messages.send(message);
    }
}

fn is_specification(value: &Value) -> bool {
    value.get("swagger").is_some() || value.get("openapi").is_some()
}

/// Parses an input according to its extension.
fn parse_input(uri: &Url, text: &str) -> Result<Value, LiterateError> {
    match extension_of(uri).as_deref() {
        Some("json") => serde_json::from_str(text).map_err(|e| LiterateError {
            message: e.to_string(),
            line: e.line() as u32,
            column: e.column() as u32,
        }),
        Some("md") | Some("markdown") => literate::parse_literate(text),
        _ => literate::parse_structured(text, 0),
    }
}

/// Range covering the key of the node at `path`, or the document start.
fn range_of(input: &Url, text: &str, path: &JsonPath) -> SourceRange {
    let position = locate_path(text, path).unwrap_or_default();
    let width = path.last_key().map_or(1, |key| key.chars().count() as u32);
    SourceRange {
        document: input.to_string(),
        start: SourcePosition::new(position.line + 1, position.character),
        end: SourcePosition::new(position.line + 1, position.character + width),
    }
}

fn check_document(input: &Url, text: &str, document: &Value, validate: bool) -> Vec<EngineMessage> {
    let mut messages = vec![];
    if !is_specification(document) {
        messages.push(
            EngineMessage::new(
                Channel::Warning,
                "Document has neither a 'swagger' nor an 'openapi' field",
            )
            .with_range(range_of(input, text, &JsonPath::root())),
        );
    }
    if validate {
        for violation in run_rules(document) {
            messages.push(
                EngineMessage::new(Channel::Warning, violation.message.clone())
                    .with_plugin(VALIDATOR_PLUGIN)
                    .with_key(violation.key())
                    .with_range(range_of(input, text, &violation.path)),
            );
        }
    }
    messages
}

/// Reports `$ref` values that point nowhere. External targets are parsed once
/// per pass and kept in `externals`.
async fn check_references<S: DocumentSource>(
    source: &S,
    input: &Url,
    text: &str,
    document: &Value,
    externals: &mut HashMap<Url, Option<Value>>,
) -> Vec<EngineMessage> {
    let mut references = vec![];
    collect_references(document, JsonPath::root(), &mut references);

    let mut messages = vec![];
    for (path, reference) in references {
        let (target, pointer) = reference.split_once('#').unwrap_or((reference.as_str(), ""));
        let resolved = match JsonPath::from_pointer(pointer) {
            None => false,
            Some(pointer) if target.is_empty() => pointer.resolve(document).is_some(),
            Some(pointer) => match input.join(target) {
                Err(_) => false,
                Ok(target) => {
                    let target = normalize_uri(&target);
                    if !externals.contains_key(&target) {
                        let parsed = match source.read_document(&target).await {
                            Ok(Some(text)) => parse_input(&target, &text).ok(),
                            _ => None,
                        };
                        externals.insert(target.clone(), parsed);
                    }
                    externals
                        .get(&target)
                        .and_then(Option::as_ref)
                        .is_some_and(|external| pointer.resolve(external).is_some())
                }
            },
        };
        if !resolved {
            messages.push(
                EngineMessage::new(Channel::Error, format!("Unresolved reference '{reference}'"))
                    .with_range(range_of(input, text, &path)),
            );
        }
    }
    messages
}

fn collect_references(value: &Value, path: JsonPath, out: &mut Vec<(JsonPath, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = path.child_key(key);
                match (key.as_str(), child) {
                    ("$ref", Value::String(reference)) => out.push((child_path, reference.clone())),
                    _ => collect_references(child, child_path, out),
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_references(child, path.child_index(index), out);
            }
        }
        _ => {}
    }
}

/// Deep merges `document` into the merged definition. The first input to
/// define a node wins and is recorded as its source.
fn merge_definition(
    target: &mut Map<String, Value>,
    source_map: &mut BTreeMap<JsonPath, Url>,
    document: Map<String, Value>,
    input: &Url,
    path: &JsonPath,
) {
    for (key, value) in document {
        let child_path = path.child_key(&key);
        match target.get_mut(&key) {
            None => {
                target.insert(key, value);
                source_map.insert(child_path, input.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(value) = value {
                    merge_definition(existing, source_map, value, input, &child_path);
                }
            }
            Some(_) => {}
        }
    }
}

/// Whether `requested` names a version the built-in runtime satisfies.
///
/// Range prefixes (`^`, `~`, `>=`, `v`) are ignored and missing components
/// count as zero.
fn version_satisfied(requested: &str, available: &str) -> bool {
    let Some(requested) = parse_version(requested) else {
        return false;
    };
    let Some(available) = parse_version(available) else {
        return false;
    };
    requested <= available
}

fn parse_version(raw: &str) -> Option<[u64; 3]> {
    let trimmed = raw.trim().trim_start_matches(['^', '~', '>', '=', 'v']);
    let mut version = [0; 3];
    let mut components = trimmed.split('.');
    for slot in version.iter_mut() {
        match components.next() {
            Some(component) => *slot = component.parse().ok()?,
            None => break,
        }
    }
    if components.next().is_some() {
        return None;
    }
    Some(version)
}

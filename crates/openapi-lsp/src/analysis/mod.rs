//! Hover and definition support over a context's merged definition
//!
//! Two strategies look at the text under the cursor. The reference strategy
//! reads a `$ref` value and turns it into a path; the query strategy
//! evaluates a quoted JSONPath expression. Results of both are concatenated.

pub mod json_path;

use crate::client::LanguageClient;
use crate::coordinator::DocumentCoordinator;
use crate::engine::{AnalysisEngine, JsonPath, MergedDefinition};
use crate::utils::{line_at, normalize_uri};
use lsp_types::{Hover, HoverContents, LanguageString, MarkedString, Position, Url};
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref REFERENCE: Regex =
        Regex::new(r#"["']?\$ref["']?\s*:\s*["']([^"']*)["']"#).unwrap();
    static ref QUOTED: Regex = Regex::new(r#""([^"\\]*)"|'([^']*)'"#).unwrap();
}

/// One node found by a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    pub path: JsonPath,
    pub value: Value,
}

/// A document together with the merged definition of its context.
pub struct DocumentAnalysis<'a> {
    uri: Url,
    text: String,
    merged: &'a MergedDefinition,
}

impl<'a> DocumentAnalysis<'a> {
    pub fn new(uri: Url, text: String, merged: &'a MergedDefinition) -> Self {
        Self { uri, text, merged }
    }

    /// Pairs the current text of `uri` with its context's merged definition.
    /// `None` when no context owns the document or nothing was merged yet.
    pub async fn create<E: AnalysisEngine, C: LanguageClient>(
        coordinator: &'a DocumentCoordinator<E, C>,
        uri: &Url,
    ) -> Option<DocumentAnalysis<'a>> {
        let uri = normalize_uri(uri);
        let merged = coordinator.fully_resolved_and_merged_definition_of(&uri)?;
        let text = coordinator.get_file_content(&uri).await?;
        Some(Self::new(uri, text, merged))
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn merged(&self) -> &MergedDefinition {
        self.merged
    }

    /// Target of the `$ref` under the cursor. Only the fragment matters: the
    /// merged definition already holds every input.
    pub fn reference_at(&self, position: Position) -> Option<JsonPath> {
        let line = line_at(&self.text, position.line)?;
        let column = char_to_byte(line, position.character);
        let captures = REFERENCE
            .captures_iter(line)
            .find(|c| c.get(0).is_some_and(|m| m.start() <= column && column <= m.end()))?;
        let reference = captures.get(1)?.as_str();
        let fragment = reference.split_once('#').map_or("", |(_, fragment)| fragment);
        JsonPath::from_pointer(fragment)
    }

    /// Quoted JSONPath expression under the cursor.
    pub fn query_at(&self, position: Position) -> Option<String> {
        let line = line_at(&self.text, position.line)?;
        let column = char_to_byte(line, position.character);
        QUOTED.captures_iter(line).find_map(|c| {
            let whole = c.get(0)?;
            if column < whole.start() || column > whole.end() {
                return None;
            }
            let inner = c.get(1).or_else(|| c.get(2))?.as_str();
            inner.starts_with('$').then(|| inner.to_string())
        })
    }

    pub fn reference_matches(&self, position: Position) -> Vec<PathMatch> {
        let Some(path) = self.reference_at(position) else {
            return vec![];
        };
        match path.resolve(&self.merged.document) {
            Some(value) => vec![PathMatch { path, value: value.clone() }],
            None => vec![],
        }
    }

    pub fn query_matches(&self, position: Position) -> Vec<PathMatch> {
        let Some(expression) = self.query_at(position) else {
            return vec![];
        };
        json_path::query(&self.merged.document, &expression)
            .unwrap_or_default()
            .into_iter()
            .map(|(path, value)| PathMatch { path, value: value.clone() })
            .collect()
    }

    pub fn hover(&self, position: Position) -> Option<Hover> {
        let mut contents = vec![];
        for found in self.reference_matches(position) {
            contents.push(MarkedString::LanguageString(LanguageString {
                language: "yaml".to_string(),
                value: serde_yml::to_string(&found.value).unwrap_or_default(),
            }));
        }
        let queried = self.query_matches(position);
        if !queried.is_empty() {
            let paths: Vec<String> = queried.iter().map(|m| m.path.to_string()).collect();
            contents.push(MarkedString::String(format!(
                "{} matches\n{}",
                queried.len(),
                paths.join("\n")
            )));
        }
        if contents.is_empty() {
            return None;
        }
        Some(Hover { contents: HoverContents::Array(contents), range: None })
    }

    /// Paths whose definitions the cursor points at, with their source
    /// document.
    pub fn definition_targets(&self, position: Position) -> Vec<(Url, JsonPath)> {
        let mut found = self.reference_matches(position);
        found.extend(self.query_matches(position));
        found
            .into_iter()
            .filter_map(|m| Some((self.merged.source_of(&m.path)?.clone(), m.path)))
            .collect()
    }
}

fn char_to_byte(line: &str, character: u32) -> usize {
    line.char_indices().nth(character as usize).map_or(line.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::url;
    use serde_json::json;

    fn merged() -> MergedDefinition {
        let mut merged = MergedDefinition {
            document: json!({
                "definitions": {
                    "Pet": { "type": "object" },
                    "Store": { "type": "object" }
                }
            }),
            ..Default::default()
        };
        merged.source_map.insert(JsonPath::from_keys(&["definitions"]), url("work/pets.json"));
        merged
    }

    const TEXT: &str = "{\n  \"schema\": { \"$ref\": \"#/definitions/Pet\" },\n  \"x-query\": \"$.definitions.*\"\n}";

    #[test]
    fn test_reference_under_cursor() {
        let merged = merged();
        let analysis = DocumentAnalysis::new(url("work/pets.json"), TEXT.to_string(), &merged);

        let path = analysis.reference_at(Position::new(1, 30)).unwrap();
        assert_eq!(path, JsonPath::from_keys(&["definitions", "Pet"]));
        assert!(analysis.reference_at(Position::new(0, 0)).is_none());
    }

    #[test]
    fn test_hover_concatenates_strategies() {
        let merged = merged();
        let analysis = DocumentAnalysis::new(url("work/pets.json"), TEXT.to_string(), &merged);

        let Some(Hover { contents: HoverContents::Array(contents), .. }) =
            analysis.hover(Position::new(1, 30))
        else {
            panic!("expected hover contents");
        };
        assert_eq!(contents.len(), 1);
        assert!(matches!(&contents[0], MarkedString::LanguageString(s) if s.value.contains("object")));

        let Some(Hover { contents: HoverContents::Array(contents), .. }) =
            analysis.hover(Position::new(2, 20))
        else {
            panic!("expected hover contents");
        };
        assert_eq!(
            contents,
            vec![MarkedString::String("2 matches\n$.definitions.Pet\n$.definitions.Store".into())]
        );
    }

    #[test]
    fn test_definition_targets_use_source_map() {
        let merged = merged();
        let analysis = DocumentAnalysis::new(url("work/pets.json"), TEXT.to_string(), &merged);

        let targets = analysis.definition_targets(Position::new(1, 30));
        assert_eq!(targets, vec![(url("work/pets.json"), JsonPath::from_keys(&["definitions", "Pet"]))]);
    }
}

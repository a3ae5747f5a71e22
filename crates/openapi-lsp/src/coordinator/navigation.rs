use super::DocumentCoordinator;
use crate::analysis::DocumentAnalysis;
use crate::client::LanguageClient;
use crate::engine::{locate_path, AnalysisEngine, DocumentSource};
use crate::utils::editor_uri;
use lsp_types::{
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverParams, Location, Range, Url,
};
use serde_json::{json, Map, Value};

impl<E: AnalysisEngine, C: LanguageClient> DocumentCoordinator<E, C> {
    pub async fn hover(&self, params: HoverParams) -> Option<Hover> {
        let position = params.text_document_position_params;
        let analysis = DocumentAnalysis::create(self, &position.text_document.uri).await?;
        analysis.hover(position.position)
    }

    pub async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Option<GotoDefinitionResponse> {
        let position = params.text_document_position_params;
        let analysis = DocumentAnalysis::create(self, &position.text_document.uri).await?;

        let mut locations = vec![];
        for (source, path) in analysis.definition_targets(position.position) {
            let text = match self.files.read_document(&source).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    self.debug(&e.to_string());
                    continue;
                }
            };
            let start = locate_path(&text, &path).unwrap_or_default();
            locations.push(Location { uri: editor_uri(&source), range: Range::new(start, start) });
        }

        match locations.len() {
            0 => None,
            1 => locations.pop().map(GotoDefinitionResponse::Scalar),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        }
    }

    /// Payload of the `openapi/mergedDefinition` request.
    pub fn merged_definition_payload(&self, uri: &Url) -> Option<Value> {
        let merged = self.fully_resolved_and_merged_definition_of(uri)?;
        let map: Map<String, Value> = merged
            .source_map
            .iter()
            .map(|(path, source)| (path.to_string(), Value::String(editor_uri(source).to_string())))
            .collect();
        Some(json!({
            "openapiDefinition": merged.document,
            "openapiDefinitionMap": map,
        }))
    }
}

use super::{DocumentCoordinator, EngineState};
use crate::client::LanguageClient;
use crate::engine::AnalysisEngine;
use crate::errors::CoordinatorError;
use crate::settings::Settings;
use crate::utils::{normalize_uri, parse_uri};
use lsp_types::Url;

impl<E: AnalysisEngine, C: LanguageClient> DocumentCoordinator<E, C> {
    /// Handles `workspace/didChangeConfiguration`.
    ///
    /// The settings snapshot is swapped on every call. The first call also
    /// acquires the engine runtime; that attempt is never repeated, and a
    /// failure is only logged.
    pub async fn configuration_changed(&mut self, settings: serde_json::Value) {
        let settings = match Settings::from_value(settings) {
            Ok(settings) => settings,
            Err(e) => {
                self.warn(&format!("Ignoring malformed settings ({e}), using defaults"));
                Settings::default()
            }
        };
        self.settings.replace(settings);

        if self.engine_state != EngineState::Pending {
            return;
        }
        let requested = self.settings.current().minimum_engine_version().to_string();
        match self.engine.initialize(&requested).await {
            Ok(()) => {
                self.engine_state = EngineState::Ready;
                self.information("Analysis engine runtime acquired.");
            }
            Err(e) => {
                self.engine_state = EngineState::Failed(e.to_string());
                self.warn(&format!("Unable to get analysis engine runtime -- \n\n INFO: {e}"));
            }
        }
    }

    /// Records the workspace root. Only one root is accepted per session.
    pub fn set_root_uri(&mut self, uri: Option<&str>) -> Result<(), CoordinatorError> {
        let Some(raw) = uri.filter(|raw| !raw.is_empty()) else {
            self.warn("No workspace uri.");
            return Ok(());
        };
        let requested = parse_uri(raw).or_else(|e| {
            // editors may hand over a plain path
            Url::from_directory_path(raw).map(|url| normalize_uri(&url)).map_err(|_| e)
        })?;

        if let Some(current) = &self.root_uri {
            return Err(CoordinatorError::RootAlreadySet {
                current: current.clone(),
                requested,
            });
        }
        self.debug(&format!("Workspace root: {requested}"));
        self.root_uri = Some(requested);
        Ok(())
    }
}

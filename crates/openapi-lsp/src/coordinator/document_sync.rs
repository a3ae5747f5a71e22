//! Editor lifecycle events: open, change, close, save and disk changes

use super::DocumentCoordinator;
use crate::client::LanguageClient;
use crate::engine::AnalysisEngine;
use crate::errors::CoordinatorError;
use crate::utils::{extension_of, is_literate_extension, normalize_uri, shadow_file_path};
use crate::workspace::ContextKey;
use lsp_types::{FileEvent, Url};
use serde_json::Value;

/// Configuration entry holding editor specific switches.
pub const EDITOR_ENTRY: &str = "vscode";

/// Whether saving a literate specification should refresh its `.json` twin.
///
/// An explicit `sync: true` always writes; otherwise an existing twin is kept
/// up to date unless `sync: false` opts out.
pub fn should_write_shadow(sync: Option<bool>, shadow_exists: bool) -> bool {
    sync == Some(true) || (shadow_exists && sync != Some(false))
}

impl<E: AnalysisEngine, C: LanguageClient> DocumentCoordinator<E, C> {
    /// Handles both `didOpen` and `didChange`; running it twice with the same
    /// input leaves the same state behind.
    pub async fn open_or_changed_file(
        &mut self,
        uri: &Url,
        language_id: &str,
        text: String,
    ) -> Result<(), CoordinatorError> {
        let uri = normalize_uri(uri);

        if !self.engine.is_configuration_extension(language_id)
            && !self.engine.is_specification_extension(language_id)
        {
            // no longer something we analyze, hide whatever we reported
            if let Some(file) = self.files.get(&uri) {
                file.set_content(Some(text));
                file.clear_diagnostics();
                file.flush_diagnostics(true);
                self.forward_diagnostics();
            }
            return Ok(());
        }

        let file = self.acquire_tracked_file(&uri, None);
        file.set_active(true);
        // discovery reads through the store, so it has to see the editor buffer
        file.set_content(Some(text));

        let id = self.resolve_context(&uri).await?;
        if let Some(context) = self.contexts.get_mut(id) {
            context.track(file);
            if context.activate() {
                let configuration = context.configuration().clone();
                self.debug(&format!("Activated context for {configuration}"));
            }
        }

        let mut affected = self.contexts_concerning(&uri);
        if !affected.contains(&id) {
            affected.push(id);
        }
        for id in affected {
            if let Err(e) = self.revalidate(id).await {
                self.error(&e.to_string());
            }
        }
        Ok(())
    }

    /// Handles `didClose`.
    pub async fn closed(&mut self, uri: &Url) -> Result<(), CoordinatorError> {
        let uri = normalize_uri(uri);
        let Some(file) = self.files.get(&uri) else {
            return Ok(());
        };

        let Some(id) = self.contexts.owner_of(&uri) else {
            file.set_active(false);
            file.clear_diagnostics();
            file.flush_diagnostics(true);
            self.forward_diagnostics();
            return Ok(());
        };
        let (configuration, synthesized, inputs) = match self.contexts.get(id) {
            Some(context) => (
                context.configuration().clone(),
                context.is_synthesized(),
                context.view().map(|view| view.input_file_uris()).unwrap_or_default(),
            ),
            None => return Ok(()),
        };

        // inputs only shown because their configuration was open go with it
        if !synthesized && configuration == uri {
            for input in inputs {
                let Some(input_file) = self.files.get(&input) else {
                    continue;
                };
                if input_file.is_active() {
                    continue;
                }
                self.contexts.remove_key(&ContextKey::Input(input));
                self.untrack_and_clear(id, &input_file);
            }
        }

        file.set_active(false);

        if synthesized {
            self.contexts.remove_key(&ContextKey::Synthesized(configuration));
        } else if configuration == uri {
            self.contexts.remove_key(&ContextKey::Config(uri.clone()));
        }
        self.contexts.remove_key(&ContextKey::Input(uri.clone()));
        self.untrack_and_clear(id, &file);

        self.prune_contexts();
        self.forward_diagnostics();
        Ok(())
    }

    /// Handles `workspace/didChangeWatchedFiles`.
    pub async fn changed_on_disk(&mut self, changes: Vec<FileEvent>) -> Result<(), CoordinatorError> {
        let mut affected = vec![];
        for change in changes {
            let uri = normalize_uri(&change.uri);
            if uri.scheme() != "file" {
                continue;
            }
            self.debug(&format!("Changed On Disk: {uri}"));

            let Some(file) = self.files.get(&uri) else {
                continue;
            };
            // the editor owns open documents, not the disk
            if file.is_active() {
                continue;
            }
            file.set_content(None);
            for id in self.contexts_concerning(&uri) {
                if !affected.contains(&id) {
                    affected.push(id);
                }
            }
        }

        for id in affected {
            if let Err(e) = self.revalidate(id).await {
                self.error(&e.to_string());
            }
        }
        Ok(())
    }

    /// Handles `didSave`: refreshes the `.json` twin of a literate
    /// specification when its configuration asks for it.
    pub async fn on_saved(&mut self, uri: &Url, text: &str) -> Result<(), CoordinatorError> {
        let uri = normalize_uri(uri);
        let Some(extension) = extension_of(&uri) else {
            return Ok(());
        };
        if !is_literate_extension(&extension) || !self.engine.is_specification_extension(&extension)
        {
            return Ok(());
        }
        let Some(content) = self.engine.literate_to_json(text) else {
            return Ok(());
        };
        if !self.engine.is_specification_file(&content) {
            return Ok(());
        }

        let id = self.resolve_context(&uri).await?;
        let sync = self
            .contexts
            .get(id)
            .and_then(|context| context.view())
            .and_then(|view| view.get_entry(EDITOR_ENTRY))
            .and_then(|entry| entry.get("sync"))
            .and_then(Value::as_bool);

        let Some(shadow) = shadow_file_path(&uri) else {
            return Ok(());
        };
        let exists = tokio::fs::try_exists(&shadow).await.unwrap_or(false);
        if should_write_shadow(sync, exists) {
            tokio::fs::write(&shadow, content).await?;
            self.verbose(&format!("Updated {}", shadow.display()));
        }
        Ok(())
    }
}

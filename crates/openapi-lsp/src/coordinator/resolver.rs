//! Finding (or creating) the context that owns a document

use super::DocumentCoordinator;
use crate::client::LanguageClient;
use crate::engine::{AnalysisEngine, EngineSession, INPUT_FILE_ENTRY, VALIDATOR_PLUGIN};
use crate::errors::CoordinatorError;
use crate::utils::{folder_of, normalize_uri, synthesized_config_uri};
use crate::workspace::{ContextId, ContextKey, DocumentContext};
use lsp_types::Url;
use serde_json::json;

/// Content of the configuration generated for a document without one.
pub fn placeholder_configuration(document: &Url) -> String {
    format!("#Fake config file \n > see https://aka.ms/autorest \n``` yaml \ninput-file: \n - {document}")
}

/// A real context found in the registry, or freshly built and not yet stored.
enum Candidate<S> {
    Existing(ContextId),
    New(DocumentContext<S>),
}

impl<E: AnalysisEngine, C: LanguageClient> DocumentCoordinator<E, C> {
    /// Finds the context owning `document`, creating one when needed.
    ///
    /// A discovered configuration that declares the document (or is the
    /// document) yields a real context; anything else gets a synthesized
    /// context of its own. New contexts are only stored once their
    /// configuration view loaded, so a failure leaves the registry as it was.
    ///
    /// When the document used to belong to another context, that context
    /// lets go of it and is disposed if nothing else keeps it alive.
    pub async fn resolve_context(&mut self, document: &Url) -> Result<ContextId, CoordinatorError> {
        let document = normalize_uri(document);
        let folder = folder_of(&document);
        let previous = self.contexts.lookup(&ContextKey::Input(document.clone()));

        let resolved = match self.engine.detect_configuration_file(&self.files, &folder).await? {
            Some(configuration) => {
                self.debug(&format!("Configuration File Selected: {configuration}"));
                self.resolve_real_context(&document, &configuration).await?
            }
            None => None,
        };
        let id = match resolved {
            Some(id) => id,
            None => self.resolve_synthesized_context(&document).await?,
        };

        if let Some(previous) = previous.filter(|previous| *previous != id) {
            self.release_document(previous, &document, id);
        }
        Ok(id)
    }

    /// Moves `document` from `previous` over to `successor`, then prunes.
    fn release_document(&mut self, previous: ContextId, document: &Url, successor: ContextId) {
        if let Some(context) = self.contexts.get_mut(previous) {
            context.untrack(document);
            if context.is_synthesized() {
                let configuration = context.configuration().clone();
                self.contexts.remove_key(&ContextKey::Synthesized(configuration));
            }
        }
        if self.contexts.lookup(&ContextKey::Input(document.clone())) == Some(previous) {
            self.contexts.remove_key(&ContextKey::Input(document.clone()));
        }
        // the successor has to hold the document before idle contexts are pruned
        if let (Some(file), Some(context)) =
            (self.files.get(document), self.contexts.get_mut(successor))
        {
            context.track(file);
        }
        self.debug(&format!("Moved {document} to another context"));
        self.prune_contexts();
    }

    async fn resolve_real_context(
        &mut self,
        document: &Url,
        configuration: &Url,
    ) -> Result<Option<ContextId>, CoordinatorError> {
        let folder = folder_of(configuration);
        // the view is reloaded so edits to the configuration are honored
        let (candidate, inputs) = match self.contexts.lookup(&ContextKey::Folder(folder.clone())) {
            Some(id) => {
                let view = match self.contexts.get_mut(id) {
                    Some(context) => Some(context.session_mut().load_view(&self.files).await?),
                    None => None,
                };
                let inputs = view.map(|view| view.input_file_uris()).unwrap_or_default();
                (Candidate::Existing(id), inputs)
            }
            None => {
                let mut session =
                    self.engine.create_session(configuration, self.messages_tx.clone());
                let view = session.load_view(&self.files).await?;
                let context = DocumentContext::real(configuration.clone(), session);
                (Candidate::New(context), view.input_file_uris())
            }
        };

        if configuration == document {
            let id = self.store(candidate);
            for input in inputs {
                let file = self.acquire_tracked_file(&input, None);
                if let Some(context) = self.contexts.get_mut(id) {
                    context.read_file(&input);
                    context.track(file);
                }
                self.contexts.index(ContextKey::Input(input), id);
            }
            self.contexts.index(ContextKey::Folder(folder), id);
            self.contexts.index(ContextKey::Config(configuration.clone()), id);
            return Ok(Some(id));
        }

        if inputs.contains(document) {
            let id = self.store(candidate);
            self.contexts.index(ContextKey::Folder(folder), id);
            self.contexts.index(ContextKey::Input(document.clone()), id);
            let file = self.acquire_tracked_file(configuration, None);
            if let Some(context) = self.contexts.get_mut(id) {
                context.track(file);
            }
            return Ok(Some(id));
        }

        // the configuration doesn't list this document, a new context is dropped
        Ok(None)
    }

    async fn resolve_synthesized_context(
        &mut self,
        document: &Url,
    ) -> Result<ContextId, CoordinatorError> {
        let configuration = synthesized_config_uri(document)?;

        if let Some(id) = self.contexts.lookup(&ContextKey::Synthesized(configuration.clone())) {
            let file = self.acquire_tracked_file(&configuration, None);
            if let Some(context) = self.contexts.get_mut(id) {
                context.track(file);
            }
            return Ok(id);
        }

        let placeholder = self
            .acquire_tracked_file(&configuration, Some(placeholder_configuration(document)));
        // owned by us, never by the disk
        placeholder.set_active(true);

        let mut session = self.engine.create_session(&configuration, self.messages_tx.clone());
        session.add_configuration(json!({
            INPUT_FILE_ENTRY: document.as_str(),
            VALIDATOR_PLUGIN: true,
        }));
        session.load_view(&self.files).await?;

        let mut context = DocumentContext::synthesized(configuration.clone(), session);
        context.track(placeholder);
        let id = self.contexts.insert(context);
        self.contexts.index(ContextKey::Synthesized(configuration), id);
        self.contexts.index(ContextKey::Input(document.clone()), id);
        self.debug(&format!("Synthesized configuration for {document}"));
        Ok(id)
    }

    fn store(&mut self, candidate: Candidate<E::Session>) -> ContextId {
        match candidate {
            Candidate::Existing(id) => id,
            Candidate::New(context) => self.contexts.insert(context),
        }
    }
}

//! Configuration contexts

use super::tracked_file::TrackedFile;
use super::tracked_files::TrackedFiles;
use crate::engine::{ConfigurationView, EngineSession, MergedDefinition};
use crate::errors::DefinitionNotReady;
use lsp_types::Url;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Driven by a configuration document found on disk or in the editor
    Real,
    /// Driven by a generated single-input configuration
    Synthesized,
}

/// One project grouping: a configuration document, the engine session
/// processing it and the files it governs.
#[derive(Debug)]
pub struct DocumentContext<S> {
    configuration: Url,
    kind: ContextKind,
    session: S,
    tracked: Vec<Arc<TrackedFile>>,
    activated: bool,
    /// Content generations seen by the last successful pass
    processed: Option<Vec<(Url, u64)>>,
}

impl<S: EngineSession> DocumentContext<S> {
    pub fn real(configuration: Url, session: S) -> Self {
        Self::new(configuration, ContextKind::Real, session)
    }

    pub fn synthesized(configuration: Url, session: S) -> Self {
        Self::new(configuration, ContextKind::Synthesized, session)
    }

    fn new(configuration: Url, kind: ContextKind, session: S) -> Self {
        Self {
            configuration,
            kind,
            session,
            tracked: vec![],
            activated: false,
            processed: None,
        }
    }

    pub fn configuration(&self) -> &Url {
        &self.configuration
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn is_synthesized(&self) -> bool {
        self.kind == ContextKind::Synthesized
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Marks the context as running. Returns whether this call did it.
    pub fn activate(&mut self) -> bool {
        !std::mem::replace(&mut self.activated, true)
    }

    /// Returns false when the file was already tracked.
    pub fn track(&mut self, file: Arc<TrackedFile>) -> bool {
        if self.is_tracking(file.uri()) {
            return false;
        }
        self.tracked.push(file);
        true
    }

    pub fn untrack(&mut self, uri: &Url) -> Option<Arc<TrackedFile>> {
        let index = self.tracked.iter().position(|f| f.uri() == uri)?;
        Some(self.tracked.remove(index))
    }

    pub fn is_tracking(&self, uri: &Url) -> bool {
        self.tracked.iter().any(|f| f.uri() == uri)
    }

    pub fn tracked_files(&self) -> &[Arc<TrackedFile>] {
        &self.tracked
    }

    pub fn has_active_files(&self) -> bool {
        self.tracked.iter().any(|f| f.is_active())
    }

    pub fn read_file(&mut self, uri: &Url) {
        self.session.read_file(uri);
    }

    pub fn view(&self) -> Option<&ConfigurationView> {
        self.session.view()
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn merged_definition(&self) -> Result<&MergedDefinition, DefinitionNotReady> {
        self.session
            .merged_definition()
            .ok_or_else(|| DefinitionNotReady { configuration: self.configuration.clone() })
    }

    /// Content generation of every tracked file, followed by the declared
    /// inputs the store knows about but the context doesn't track.
    pub fn generations(&self, files: &TrackedFiles) -> Vec<(Url, u64)> {
        let mut generations: Vec<(Url, u64)> =
            self.tracked.iter().map(|f| (f.uri().clone(), f.generation())).collect();
        for input in self.view().map(|view| view.input_file_uris()).unwrap_or_default() {
            if generations.iter().any(|(uri, _)| *uri == input) {
                continue;
            }
            if let Some(file) = files.get(&input) {
                generations.push((input, file.generation()));
            }
        }
        generations
    }

    /// Whether the last successful pass saw exactly these generations.
    pub fn is_up_to_date(&self, generations: &[(Url, u64)]) -> bool {
        self.processed.as_deref() == Some(generations)
    }

    pub fn set_processed(&mut self, generations: Vec<(Url, u64)>) {
        self.processed = Some(generations);
    }

    /// Stops tracking every file, clearing what the editor shows for them.
    pub fn teardown(&mut self) {
        for file in self.tracked.drain(..) {
            file.clear_diagnostics();
            file.flush_diagnostics(true);
        }
    }
}

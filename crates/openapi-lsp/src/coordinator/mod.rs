//! The document coordinator
//!
//! [`DocumentCoordinator`] reacts to editor lifecycle events. It owns the
//! tracked-file store and the context registry, drives the analysis engine
//! and relays diagnostics and log lines to the editor. Every handler runs to
//! completion before the next event is looked at, so the store and registry
//! only ever see one writer.

mod configuration;
mod document_sync;
mod navigation;
mod resolver;

pub use document_sync::should_write_shadow;

use crate::client::LanguageClient;
use crate::diagnostics::{route, LogLevel, ProblemBudget, RoutedMessage};
use crate::engine::{AnalysisEngine, EngineMessage, EngineSession, MergedDefinition};
use crate::engine::{MessageReceiver, MessageSender};
use crate::errors::CoordinatorError;
use crate::settings::{Settings, SharedSettings};
use crate::utils::normalize_uri;
use crate::workspace::{
    ContextId, ContextRegistry, DiagnosticsReceiver, TrackedFile, TrackedFiles,
};
use crate::Context;
use chrono::Timelike;
use lsp_types::{MessageType, Url};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Progress of the one-time engine runtime acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Pending,
    Ready,
    Failed(String),
}

pub struct DocumentCoordinator<E: AnalysisEngine, C: LanguageClient> {
    ctx: Context,
    engine: E,
    engine_state: EngineState,
    client: C,
    settings: SharedSettings,
    files: TrackedFiles,
    contexts: ContextRegistry<E::Session>,
    root_uri: Option<Url>,
    messages_tx: MessageSender,
    messages_rx: MessageReceiver,
    diagnostics_rx: DiagnosticsReceiver,
}

impl<E: AnalysisEngine, C: LanguageClient> DocumentCoordinator<E, C> {
    pub fn new(engine: E, client: C, ctx: Context) -> Self {
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (diagnostics_tx, diagnostics_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            engine,
            engine_state: EngineState::Pending,
            client,
            settings: SharedSettings::default(),
            files: TrackedFiles::new(diagnostics_tx),
            contexts: ContextRegistry::new(),
            root_uri: None,
            messages_tx,
            messages_rx,
            diagnostics_rx,
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.current()
    }

    pub fn root_uri(&self) -> Option<&Url> {
        self.root_uri.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_state(&self) -> &EngineState {
        &self.engine_state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn files(&self) -> &TrackedFiles {
        &self.files
    }

    pub fn contexts(&self) -> &ContextRegistry<E::Session> {
        &self.contexts
    }

    /// Returns the tracked file for `uri`, creating it (seeded with `content`)
    /// on first use.
    pub fn acquire_tracked_file(&mut self, uri: &Url, content: Option<String>) -> Arc<TrackedFile> {
        let uri = normalize_uri(uri);
        if !self.files.contains(&uri) {
            self.information(&format!("Tracking file: {uri}"));
        }
        self.files.acquire(&uri, content)
    }

    /// Content of a tracked document, `None` when untracked or unreadable.
    pub async fn get_file_content(&self, uri: &Url) -> Option<String> {
        let content = match self.files.get(uri) {
            Some(file) => file.content().await.ok(),
            None => None,
        };
        if content.is_none() {
            self.information(&format!("file '{uri}' not found"));
        }
        content
    }

    /// The merged definition of the context owning `uri`.
    pub fn fully_resolved_and_merged_definition_of(&self, uri: &Url) -> Option<&MergedDefinition> {
        let uri = normalize_uri(uri);
        let Some(id) = self.contexts.owner_of(&uri) else {
            self.debug(&format!("no context found for {uri}"));
            return None;
        };
        let context = self.contexts.get(id)?;
        match context.merged_definition() {
            Ok(merged) => Some(merged),
            Err(e) => {
                self.debug(&e.to_string());
                None
            }
        }
    }

    /// Runs one processing pass for an activated context and publishes the
    /// resulting diagnostic sets. Nothing runs when no document the context
    /// reads changed content since its last successful pass.
    pub async fn revalidate(&mut self, id: ContextId) -> Result<(), CoordinatorError> {
        let Some(context) = self.contexts.get_mut(id) else {
            return Ok(());
        };
        if !context.is_activated() || context.is_up_to_date(&context.generations(&self.files)) {
            return Ok(());
        }
        let mut pass = ValidationPass::new(self.settings.current().problem_limit());
        for file in context.tracked_files() {
            pass.touch(file);
        }

        let result = context.session_mut().process(&self.files).await;
        if result.is_ok() {
            // taken after the pass, lazily loaded documents count as seen
            let generations = context.generations(&self.files);
            context.set_processed(generations);
        }

        while let Ok(message) = self.messages_rx.try_recv() {
            self.dispatch_engine_message(&message, &mut pass);
        }
        pass.flush();
        self.forward_diagnostics();
        result.map_err(CoordinatorError::from)
    }

    fn dispatch_engine_message(&self, message: &EngineMessage, pass: &mut ValidationPass) {
        let information = self.settings.current().autorest.information_severity;
        match route(message, information) {
            RoutedMessage::Log { level: LogLevel::Debug, text } => self.debug(&text),
            RoutedMessage::Log { level: LogLevel::Verbose, text } => self.verbose(&text),
            RoutedMessage::Log { level: LogLevel::Error, text } => self.error(&text),
            RoutedMessage::Diagnostics(diagnostics) => {
                for (uri, diagnostic) in diagnostics {
                    // ranges pointing at documents we don't track are dropped
                    let Some(file) = self.files.find(&uri) else {
                        continue;
                    };
                    pass.touch(&file);
                    if pass.budget.take(file.uri()) {
                        file.push_diagnostic(diagnostic);
                    }
                }
            }
        }
    }

    /// Publishes every diagnostic set flushed since the last call.
    pub fn forward_diagnostics(&mut self) {
        while let Ok(params) = self.diagnostics_rx.try_recv() {
            self.client.publish_diagnostics(params);
        }
    }

    /// Drops contexts nothing leads to anymore, clearing their files.
    fn prune_contexts(&mut self) {
        for mut context in self.contexts.prune() {
            self.debug(&format!("Disposing context for {}", context.configuration()));
            context.teardown();
        }
        self.forward_diagnostics();
    }

    fn untrack_and_clear(&mut self, id: ContextId, file: &TrackedFile) {
        if let Some(context) = self.contexts.get_mut(id) {
            context.untrack(file.uri());
        }
        file.clear_diagnostics();
        file.flush_diagnostics(true);
    }

    /// Activated contexts affected by a change to `uri`.
    fn contexts_concerning(&self, uri: &Url) -> Vec<ContextId> {
        self.contexts
            .ids()
            .into_iter()
            .filter(|id| {
                let Some(context) = self.contexts.get(*id) else {
                    return false;
                };
                context.is_activated()
                    && (context.is_tracking(uri)
                        || context.configuration() == uri
                        || context.view().is_some_and(|v| v.input_file_uris().contains(uri)))
            })
            .collect()
    }

    pub fn information(&self, text: &str) {
        let line = format!("[INFO: {}] {}", date_stamp(), text);
        self.ctx.try_log(|logger| info!(logger, "{}", line));
        if self.settings.current().autorest.information {
            self.client.log_message(MessageType::LOG, line);
        }
    }

    pub fn verbose(&self, text: &str) {
        let line = format!("[{}] {}", date_stamp(), text);
        self.ctx.try_log(|logger| info!(logger, "{}", line));
        if self.settings.current().autorest.verbose {
            self.client.log_message(MessageType::LOG, line);
        }
    }

    pub fn debug(&self, text: &str) {
        let line = format!("[DEBUG: {}] {}", date_stamp(), text);
        self.ctx.try_log(|logger| info!(logger, "{}", line));
        if self.settings.current().autorest.debug {
            self.client.log_message(MessageType::LOG, line);
        }
    }

    pub fn warn(&self, text: &str) {
        let line = format!("[WARN: {}] {}", date_stamp(), text);
        self.ctx.try_log(|logger| info!(logger, "{}", line));
        self.client.log_message(MessageType::WARNING, line);
    }

    pub fn error(&self, text: &str) {
        let quoted = serde_json::to_string(text).unwrap_or_else(|_| text.to_string());
        let line = format!("[ERROR: {}] {}", date_stamp(), quoted);
        self.ctx.try_log(|logger| error!(logger, "{}", line));
        self.client.log_message(MessageType::ERROR, line);
    }
}

/// Diagnostic bookkeeping of one processing pass: every file that gets
/// diagnostics (or is tracked by the context) is cleared once up front and
/// flushed once at the end.
struct ValidationPass {
    budget: ProblemBudget,
    touched: HashMap<Url, Arc<TrackedFile>>,
}

impl ValidationPass {
    fn new(limit: Option<usize>) -> Self {
        Self { budget: ProblemBudget::new(limit), touched: HashMap::new() }
    }

    fn touch(&mut self, file: &Arc<TrackedFile>) {
        if self.touched.contains_key(file.uri()) {
            return;
        }
        file.clear_diagnostics();
        self.touched.insert(file.uri().clone(), file.clone());
    }

    fn flush(self) {
        for file in self.touched.values() {
            file.flush_diagnostics(true);
        }
    }
}

/// Local wall clock as `hh:mm:ss.mmmm`.
fn date_stamp() -> String {
    let now = chrono::Local::now();
    let millis = now.nanosecond() / 1_000_000 % 1000;
    format!("{:02}:{:02}:{:02}.{:04}", now.hour(), now.minute(), now.second(), millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_stamp_shape() {
        let stamp = date_stamp();
        assert_eq!(stamp.len(), 13);
        assert_eq!(&stamp[2..3], ":");
        assert_eq!(&stamp[8..9], ".");
    }
}

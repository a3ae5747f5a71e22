//! Mock editor driving a [`DocumentCoordinator`] against a scratch workspace.
//!
//! [`MockEditor`] owns a temporary folder, writes fixture files into it and
//! forwards editor events to the coordinator. Everything the coordinator
//! sends back is captured by a [`RecordingClient`] so tests can assert on it.

use crate::client::LanguageClient;
use crate::coordinator::DocumentCoordinator;
use crate::engine::local::LocalEngine;
use crate::errors::CoordinatorError;
use crate::Context;
use lsp_types::{Diagnostic, FileChangeType, FileEvent, MessageType, PublishDiagnosticsParams, Url};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct Recorded {
    published: Vec<PublishDiagnosticsParams>,
    logs: Vec<(MessageType, String)>,
}

/// Language client that keeps everything it is sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingClient {
    /// Every diagnostic set published so far, oldest first.
    pub fn published(&self) -> Vec<PublishDiagnosticsParams> {
        self.recorded.lock().unwrap().published.clone()
    }

    /// The most recent diagnostic set published for `uri`.
    pub fn last_published(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.recorded
            .lock()
            .unwrap()
            .published
            .iter()
            .rev()
            .find(|params| &params.uri == uri)
            .map(|params| params.diagnostics.clone())
    }

    pub fn logs(&self) -> Vec<(MessageType, String)> {
        self.recorded.lock().unwrap().logs.clone()
    }
}

impl LanguageClient for RecordingClient {
    fn publish_diagnostics(&self, params: PublishDiagnosticsParams) {
        self.recorded.lock().unwrap().published.push(params);
    }

    fn log_message(&self, typ: MessageType, message: String) {
        self.recorded.lock().unwrap().logs.push((typ, message));
    }
}

/// Simulated editor session over a temporary workspace folder.
pub struct MockEditor {
    workspace: TempDir,
    client: RecordingClient,
    coordinator: DocumentCoordinator<LocalEngine, RecordingClient>,
}

impl MockEditor {
    pub fn new() -> Self {
        let client = RecordingClient::default();
        Self {
            workspace: tempfile::tempdir().unwrap(),
            coordinator: DocumentCoordinator::new(LocalEngine::new(), client.clone(), Context::empty()),
            client,
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.workspace.path().join(relative)
    }

    /// URI of a workspace file, as the editor would send it.
    pub fn uri(&self, relative: &str) -> Url {
        Url::from_file_path(self.path(relative)).unwrap()
    }

    pub fn root(&self) -> &Path {
        self.workspace.path()
    }

    /// Writes a file into the workspace without telling the coordinator.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn client(&self) -> &RecordingClient {
        &self.client
    }

    pub fn coordinator(&self) -> &DocumentCoordinator<LocalEngine, RecordingClient> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut DocumentCoordinator<LocalEngine, RecordingClient> {
        &mut self.coordinator
    }

    /// Simulates `didOpen`; the language is taken from the extension.
    pub async fn open_document(&mut self, relative: &str, content: &str) {
        let uri = self.uri(relative);
        let language_id = language_of(relative);
        self.coordinator.open_or_changed_file(&uri, language_id, content.to_string()).await.unwrap();
    }

    /// Simulates `didChange` with the full new text.
    pub async fn change_document(&mut self, relative: &str, content: &str) {
        self.open_document(relative, content).await;
    }

    pub async fn close_document(&mut self, relative: &str) {
        let uri = self.uri(relative);
        self.coordinator.closed(&uri).await.unwrap();
    }

    pub async fn save_document(&mut self, relative: &str, content: &str) -> Result<(), CoordinatorError> {
        let uri = self.uri(relative);
        self.coordinator.on_saved(&uri, content).await
    }

    /// Rewrites a file on disk and reports it through `didChangeWatchedFiles`.
    pub async fn change_on_disk(&mut self, relative: &str, content: &str) {
        self.write_file(relative, content);
        let event = FileEvent { uri: self.uri(relative), typ: FileChangeType::CHANGED };
        self.coordinator.changed_on_disk(vec![event]).await.unwrap();
    }

    /// Diagnostics last published for a workspace file.
    pub fn diagnostics(&self, relative: &str) -> Option<Vec<Diagnostic>> {
        self.client.last_published(&self.uri(relative))
    }

    pub fn assert_diagnostic_count(&self, relative: &str, expected: usize) {
        let diagnostics = self
            .diagnostics(relative)
            .unwrap_or_else(|| panic!("nothing was published for {relative}"));
        assert_eq!(
            diagnostics.len(),
            expected,
            "unexpected diagnostics for {relative}: {diagnostics:#?}"
        );
    }

    pub fn assert_cleared(&self, relative: &str) {
        self.assert_diagnostic_count(relative, 0);
    }

    pub fn assert_context_count(&self, expected: usize) {
        assert_eq!(self.coordinator.contexts().len(), expected);
    }

    pub fn assert_tracked(&self, relative: &str) {
        assert!(
            self.coordinator.files().contains(&self.uri(relative)),
            "{relative} is not tracked"
        );
    }

    /// Asserts that some log line sent to the editor contains `needle`.
    pub fn assert_logged(&self, needle: &str) {
        let logs = self.client.logs();
        assert!(
            logs.iter().any(|(_, line)| line.contains(needle)),
            "no log line contains {needle:?}: {logs:#?}"
        );
    }
}

fn language_of(relative: &str) -> &'static str {
    match relative.rsplit_once('.').map(|(_, extension)| extension) {
        Some("md") => "markdown",
        Some("json") => "json",
        Some("yaml") | Some("yml") => "yaml",
        _ => "plaintext",
    }
}

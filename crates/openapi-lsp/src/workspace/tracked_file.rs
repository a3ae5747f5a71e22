//! A single document under observation

use crate::errors::ReadError;
use crate::utils::editor_uri;
use lsp_types::{Diagnostic, PublishDiagnosticsParams, Url};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Channel on which tracked files announce their diagnostic sets.
pub type DiagnosticsSender = mpsc::UnboundedSender<PublishDiagnosticsParams>;
pub type DiagnosticsReceiver = mpsc::UnboundedReceiver<PublishDiagnosticsParams>;

/// One logical document, identified by its normalized URI.
///
/// Content is either owned by the editor (`is_active`) or lazily loaded from
/// disk. A `None` content means "not loaded": the next [`content`] call reads
/// the file again.
///
/// [`content`]: TrackedFile::content
#[derive(Debug)]
pub struct TrackedFile {
    uri: Url,
    content: RwLock<Option<String>>,
    generation: AtomicU64,
    active: AtomicBool,
    diagnostics: Mutex<Vec<Diagnostic>>,
    diagnostics_changed: DiagnosticsSender,
}

impl TrackedFile {
    pub fn new(uri: Url, diagnostics_changed: DiagnosticsSender) -> Self {
        Self {
            uri,
            content: RwLock::new(None),
            generation: AtomicU64::new(0),
            active: AtomicBool::new(false),
            diagnostics: Mutex::new(Vec::new()),
            diagnostics_changed,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Replaces the content; `None` drops the cached text.
    pub fn set_content(&self, content: Option<String>) {
        *self.content.write().unwrap_or_else(PoisonError::into_inner) = content;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Content currently held in memory, without touching the disk.
    pub fn cached_content(&self) -> Option<String> {
        self.content.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of content replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the content, loading it from disk when it isn't cached.
    pub async fn content(&self) -> Result<String, ReadError> {
        if let Some(content) = self.cached_content() {
            return Ok(content);
        }
        let loaded = read_from_disk(&self.uri)
            .await?
            .ok_or_else(|| ReadError::new(&self.uri, "file not found"))?;

        let mut slot = self.content.write().unwrap_or_else(PoisonError::into_inner);
        // the editor may have pushed content while we were reading
        Ok(slot.get_or_insert(loaded).clone())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn push_diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).push(diagnostic);
    }

    /// Empties the pending set. Nothing is sent to the editor.
    pub fn clear_diagnostics(&self) {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sends the current diagnostic set once.
    ///
    /// An empty set is only sent when `force` is set, which is how previously
    /// shown diagnostics get cleared in the editor. Returns whether something
    /// was sent.
    pub fn flush_diagnostics(&self, force: bool) -> bool {
        let diagnostics = self.diagnostics();
        if diagnostics.is_empty() && !force {
            return false;
        }
        let params =
            PublishDiagnosticsParams { uri: editor_uri(&self.uri), diagnostics, version: None };
        self.diagnostics_changed.send(params).is_ok()
    }
}

/// Reads a document from disk.
///
/// Missing files and non-`file` URIs yield `Ok(None)`; any other failure is a
/// [`ReadError`].
pub async fn read_from_disk(uri: &Url) -> Result<Option<String>, ReadError> {
    if uri.scheme() != "file" {
        return Ok(None);
    }
    let Ok(path) = uri.to_file_path() else {
        return Ok(None);
    };
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(strip_bom(text))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReadError::new(uri, e.to_string())),
    }
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

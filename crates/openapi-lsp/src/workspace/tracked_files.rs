use super::tracked_file::{read_from_disk, DiagnosticsSender, TrackedFile};
use crate::engine::DocumentSource;
use crate::errors::ReadError;
use crate::utils::normalize_uri;
use lsp_types::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// Every document the coordinator has ever looked at, keyed by normalized URI.
///
/// Entries are never removed: a closed document stays here, inactive, so its
/// diagnostics channel and identity survive a later reopen.
#[derive(Debug)]
pub struct TrackedFiles {
    files: HashMap<Url, Arc<TrackedFile>>,
    diagnostics_changed: DiagnosticsSender,
}

impl TrackedFiles {
    pub fn new(diagnostics_changed: DiagnosticsSender) -> Self {
        Self { files: HashMap::new(), diagnostics_changed }
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<TrackedFile>> {
        self.files.get(&normalize_uri(uri)).cloned()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.files.contains_key(&normalize_uri(uri))
    }

    /// Exact lookup, then a scan comparing lower-cased URIs.
    pub fn find(&self, uri: &Url) -> Option<Arc<TrackedFile>> {
        if let Some(file) = self.get(uri) {
            return Some(file);
        }
        let wanted = uri.as_str().to_lowercase();
        self.files
            .iter()
            .find(|(key, _)| key.as_str().to_lowercase() == wanted)
            .map(|(_, file)| file.clone())
    }

    /// Returns the tracked file for `uri`, creating it when needed.
    ///
    /// `content` only seeds a newly created file; an existing one keeps its
    /// content.
    pub fn acquire(&mut self, uri: &Url, content: Option<String>) -> Arc<TrackedFile> {
        let uri = normalize_uri(uri);
        if let Some(file) = self.files.get(&uri) {
            return file.clone();
        }
        let file = Arc::new(TrackedFile::new(uri.clone(), self.diagnostics_changed.clone()));
        if content.is_some() {
            file.set_content(content);
        }
        self.files.insert(uri, file.clone());
        file
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl DocumentSource for TrackedFiles {
    /// Tracked documents answer from memory (loading lazily); anything else is
    /// read from disk without being tracked.
    async fn read_document(&self, uri: &Url) -> Result<Option<String>, ReadError> {
        match self.get(uri) {
            Some(file) if file.cached_content().is_some() || file.is_active() => {
                file.content().await.map(Some)
            }
            Some(file) => match read_from_disk(file.uri()).await? {
                Some(content) => {
                    file.set_content(Some(content.clone()));
                    Ok(Some(content))
                }
                None => Ok(None),
            },
            None => read_from_disk(&normalize_uri(uri)).await,
        }
    }
}

//! Error types for the document coordination layer

use lsp_types::Url;
use thiserror::Error;

/// A document's content could not be loaded.
#[derive(Debug, Clone, Error)]
#[error("Failed to load '{uri}' ({message})")]
pub struct ReadError {
    pub uri: Url,
    pub message: String,
}

impl ReadError {
    pub fn new(uri: &Url, message: impl Into<String>) -> Self {
        Self { uri: uri.clone(), message: message.into() }
    }
}

/// The engine has not produced a merged definition for a context yet.
#[derive(Debug, Clone, Error)]
#[error("No merged definition available yet for {configuration}")]
pub struct DefinitionNotReady {
    pub configuration: Url,
}

/// Errors raised by an analysis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine runtime could not be acquired
    #[error("Unable to acquire engine runtime '{requested}': {message}")]
    Initialization { requested: String, message: String },

    /// Configuration discovery failed
    #[error("Configuration discovery failed in {folder}: {message}")]
    Discovery { folder: Url, message: String },

    /// The configuration document is not usable
    #[error("Invalid configuration {uri}: {message}")]
    Configuration { uri: Url, message: String },

    #[error("Unable to parse {uri}: {message}")]
    Parse { uri: Url, message: String },

    /// The engine needed a document it could not read
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Errors surfaced by the document coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The workspace root may only be set once per session
    #[error("Workspace root is already set to {current}, refusing {requested}")]
    RootAlreadySet { current: Url, requested: Url },

    #[error("Invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification parameters that don't match the method
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),
}

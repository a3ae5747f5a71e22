//! Editor settings snapshot
//!
//! Settings arrive through `workspace/didChangeConfiguration`. The coordinator
//! owns one [`SharedSettings`] and replaces the whole snapshot on every
//! change; readers always observe either the old or the new value.

use lsp_types::DiagnosticSeverity;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Engine runtime requested when the settings don't name one.
pub const DEFAULT_ENGINE_VERSION: &str = "latest-installed";

/// The server relevant part of the editor settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub autorest: EngineSettings,
}

/// Settings contributed by the editor extension.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Cap on diagnostics per file and validation pass, `0` disables it.
    pub max_number_of_problems: usize,
    pub information: bool,
    pub verbose: bool,
    pub debug: bool,
    pub runtime_id: Option<String>,
    #[serde(rename = "minimumAutoRestVersion")]
    pub minimum_engine_version: Option<String>,
    pub configuration: serde_json::Value,
    pub information_severity: InformationSeverity,
}

/// Editor severity used for engine messages on the `Information` channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationSeverity {
    #[default]
    Warning,
    Information,
}

impl InformationSeverity {
    pub fn to_lsp(self) -> DiagnosticSeverity {
        match self {
            InformationSeverity::Warning => DiagnosticSeverity::WARNING,
            InformationSeverity::Information => DiagnosticSeverity::INFORMATION,
        }
    }
}

impl Settings {
    /// Parses the `settings` payload of a configuration change.
    ///
    /// A missing payload yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Settings, serde_json::Error> {
        if value.is_null() {
            return Ok(Settings::default());
        }
        serde_json::from_value(value)
    }

    pub fn minimum_engine_version(&self) -> &str {
        self.autorest.minimum_engine_version.as_deref().unwrap_or(DEFAULT_ENGINE_VERSION)
    }

    pub fn problem_limit(&self) -> Option<usize> {
        match self.autorest.max_number_of_problems {
            0 => None,
            limit => Some(limit),
        }
    }
}

/// Settings snapshot shared between the coordinator and its collaborators.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Arc<Settings>>>,
}

impl SharedSettings {
    /// The current snapshot.
    pub fn current(&self) -> Arc<Settings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Atomically swaps in a new snapshot.
    pub fn replace(&self, settings: Settings) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
    }
}

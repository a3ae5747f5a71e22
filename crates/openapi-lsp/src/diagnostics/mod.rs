//! Diagnostic routing and per-pass limits

pub mod router;

pub use router::{route, LogLevel, RoutedMessage, RULES_DOCUMENTATION_URL};

use lsp_types::Url;
use std::collections::HashMap;

/// Counts diagnostics pushed per file during one validation pass and enforces
/// the `maxNumberOfProblems` cap.
#[derive(Debug, Default)]
pub struct ProblemBudget {
    limit: Option<usize>,
    used: HashMap<Url, usize>,
}

impl ProblemBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit, used: HashMap::new() }
    }

    /// Takes one slot for `uri`; false once its cap is reached.
    pub fn take(&mut self, uri: &Url) -> bool {
        let used = self.used.entry(uri.clone()).or_default();
        if self.limit.is_some_and(|limit| *used >= limit) {
            return false;
        }
        *used += 1;
        true
    }
}

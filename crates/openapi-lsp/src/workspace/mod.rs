//! Documents and configuration contexts
//!
//! [`TrackedFiles`] holds one [`TrackedFile`] per normalized URI for the whole
//! session. [`ContextRegistry`] groups them into [`DocumentContext`]s, each
//! reachable through one or more [`ContextKey`]s.

mod context;
mod registry;
mod tracked_file;
mod tracked_files;

pub use context::{ContextKind, DocumentContext};
pub use registry::{ContextId, ContextKey, ContextRegistry};
pub use tracked_file::{read_from_disk, DiagnosticsReceiver, DiagnosticsSender, TrackedFile};
pub use tracked_files::TrackedFiles;

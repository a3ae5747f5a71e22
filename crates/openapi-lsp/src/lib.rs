//! Document and context coordination for an OpenAPI language server.
//!
//! The crate sits between an editor speaking the Language Server Protocol and
//! an analysis engine. It decides which configuration context owns each file
//! the editor touches, keeps that mapping consistent while files come and go,
//! and routes engine results back to the right document.

#[macro_use]
extern crate hiro_system_kit;

#[macro_use]
extern crate lazy_static;

pub mod analysis;
pub mod client;
pub mod coordinator;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod server;
pub mod settings;
pub mod utils;
pub mod workspace;

#[cfg(test)]
mod tests;

use hiro_system_kit::Logger;

pub use coordinator::DocumentCoordinator;
pub use engine::local::LocalEngine;
pub use errors::{CoordinatorError, EngineError, ReadError};
pub use settings::{Settings, SharedSettings};

#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
}

#[allow(dead_code)]
impl Context {
    pub fn empty() -> Context {
        Context { logger: None }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }
}

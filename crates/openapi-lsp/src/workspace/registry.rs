//! Index from lookup keys to configuration contexts

use super::context::{ContextKind, DocumentContext};
use crate::engine::EngineSession;
use lsp_types::Url;
use std::collections::{BTreeMap, HashMap};

/// The ways a context can be found. Several keys may lead to the same context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextKey {
    /// Folder holding a real configuration document
    Folder(Url),
    /// The configuration document itself
    Config(Url),
    /// A document declared as (or standing in for) an input
    Input(Url),
    /// Generated configuration of a single document
    Synthesized(Url),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

#[derive(Debug)]
pub struct ContextRegistry<S> {
    contexts: BTreeMap<ContextId, DocumentContext<S>>,
    keys: HashMap<ContextKey, ContextId>,
    next_id: u64,
}

impl<S> Default for ContextRegistry<S> {
    fn default() -> Self {
        Self { contexts: BTreeMap::new(), keys: HashMap::new(), next_id: 0 }
    }
}

impl<S: EngineSession> ContextRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a context. It stays unreachable by key until indexed.
    pub fn insert(&mut self, context: DocumentContext<S>) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;
        self.contexts.insert(id, context);
        id
    }

    /// Points `key` at `id`, replacing whatever it pointed at before.
    pub fn index(&mut self, key: ContextKey, id: ContextId) {
        self.keys.insert(key, id);
    }

    pub fn lookup(&self, key: &ContextKey) -> Option<ContextId> {
        self.keys.get(key).copied().filter(|id| self.contexts.contains_key(id))
    }

    pub fn remove_key(&mut self, key: &ContextKey) -> Option<ContextId> {
        self.keys.remove(key)
    }

    pub fn get(&self, id: ContextId) -> Option<&DocumentContext<S>> {
        self.contexts.get(&id)
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut DocumentContext<S>> {
        self.contexts.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<ContextId> {
        self.contexts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Context a document belongs to: through its input or configuration key
    /// first, then through any context tracking it.
    pub fn owner_of(&self, uri: &Url) -> Option<ContextId> {
        self.lookup(&ContextKey::Input(uri.clone()))
            .or_else(|| self.lookup(&ContextKey::Config(uri.clone())))
            .or_else(|| {
                self.contexts.iter().find(|(_, ctx)| ctx.is_tracking(uri)).map(|(id, _)| *id)
            })
    }

    /// Removes every context no key points at anymore, and every real context
    /// none of whose tracked files is open in the editor. Keys leading to a
    /// removed context go too. Returns the removed contexts, not yet torn down.
    pub fn prune(&mut self) -> Vec<DocumentContext<S>> {
        let doomed: Vec<ContextId> = self
            .contexts
            .iter()
            .filter(|(id, ctx)| {
                let unreachable = !self.keys.values().any(|v| v == *id);
                let idle = ctx.kind() == ContextKind::Real && !ctx.has_active_files();
                unreachable || idle
            })
            .map(|(id, _)| *id)
            .collect();

        self.keys.retain(|_, id| !doomed.contains(id));
        doomed.into_iter().filter_map(|id| self.contexts.remove(&id)).collect()
    }
}

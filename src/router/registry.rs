//! Shared handler table of one router lineage.
//!
//! Every router derived through `group` holds the same `Arc<Registry>`, so
//! all prefixes of a lineage collision-check against one table and see one
//! unknown fallback.
//!
//! Readers load an immutable snapshot through [`ArcSwap`] and never block.
//! Writers serialize on `write` and publish a new snapshot only after a
//! whole batch has passed its checks and hooks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;

use crate::error::{Result, RouterError};
use crate::handler::{Handler, Kind};
use crate::plugin::PluginContainer;

pub(crate) struct Registry {
    kind: Kind,
    handlers: ArcSwap<HashMap<String, Arc<Handler>>>,
    unknown: ArcSwapOption<Handler>,
    write: Mutex<()>,
}

impl Registry {
    pub(crate) fn new(kind: Kind) -> Self {
        Self {
            kind,
            handlers: ArcSwap::from_pointee(HashMap::new()),
            unknown: ArcSwapOption::empty(),
            write: Mutex::new(()),
        }
    }

    /// Exact match, else the unknown fallback.
    pub(crate) fn get(&self, name: &str) -> Option<Arc<Handler>> {
        if let Some(handler) = self.handlers.load().get(name) {
            return Some(Arc::clone(handler));
        }
        self.unknown.load_full()
    }

    /// Insert a batch of candidates all-or-nothing.
    ///
    /// Every name must be free in the table and unique within the batch.
    /// `post_reg` runs for each candidate before anything is published, with
    /// the write lock released so a hook may register into this registry.
    /// Names are checked again against the table current at publish time.
    pub(crate) fn commit(&self, candidates: Vec<Handler>, plugins: &PluginContainer) -> Result<Vec<String>> {
        {
            let _guard = self.write.lock();
            self.check_free(&candidates, &self.handlers.load())?;
        }

        for handler in &candidates {
            plugins.post_reg(handler)?;
        }

        let _guard = self.write.lock();
        let current = self.handlers.load_full();
        self.check_free(&candidates, &current)?;

        let mut next = HashMap::clone(&current);
        let mut names = Vec::with_capacity(candidates.len());
        for handler in candidates {
            names.push(handler.name().to_string());
            next.insert(handler.name().to_string(), Arc::new(handler));
        }
        self.handlers.store(Arc::new(next));

        Ok(names)
    }

    fn check_free(&self, candidates: &[Handler], table: &HashMap<String, Arc<Handler>>) -> Result<()> {
        let mut batch = HashSet::with_capacity(candidates.len());
        for handler in candidates {
            let name = handler.name();
            if table.contains_key(name) || !batch.insert(name) {
                return Err(RouterError::Conflict {
                    kind: self.kind,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Install the fallback, returning the one it replaces.
    pub(crate) fn set_unknown(&self, handler: Handler) -> Option<Arc<Handler>> {
        let _guard = self.write.lock();
        self.unknown.swap(Some(Arc::new(handler)))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.load().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.load().len()
    }
}

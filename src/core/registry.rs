//! # Child registry of a supervisor.
//!
//! Maps normalised names to children. Iteration always works on a snapshot,
//! so the monitor never holds the lock while it awaits a child.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::supervisor::Supervised;
use crate::error::RuntimeError;

pub(crate) type Child = Arc<dyn Supervised>;

#[derive(Default)]
pub(crate) struct Registry {
    children: RwLock<HashMap<String, Child>>,
}

impl Registry {
    /// Registers `child` under its name.
    pub(crate) fn insert(&self, child: Child) -> Result<(), RuntimeError> {
        let mut map = self.children.write();
        let name = child.name().to_string();
        if map.contains_key(&name) {
            return Err(RuntimeError::DuplicateWorker { name });
        }
        map.insert(name, child);
        Ok(())
    }

    pub(crate) fn remove(&self, name: &str) -> Result<Child, RuntimeError> {
        self.children
            .write()
            .remove(name)
            .ok_or_else(|| RuntimeError::UnknownWorker {
                name: name.to_string(),
            })
    }

    pub(crate) fn get(&self, name: &str) -> Option<Child> {
        self.children.read().get(name).cloned()
    }

    /// `child` is still the instance registered under `name`.
    pub(crate) fn holds(&self, name: &str, child: &Child) -> bool {
        self.children
            .read()
            .get(name)
            .is_some_and(|c| Arc::ptr_eq(c, child))
    }

    /// Children sorted by name.
    pub(crate) fn snapshot(&self) -> Vec<(String, Child)> {
        let mut out: Vec<(String, Child)> = self
            .children
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(n, _)| n).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.children.read().len()
    }
}

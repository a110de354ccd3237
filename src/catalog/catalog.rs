use crate::catalog::Namespace;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A snapshot of all namespaces.
///
/// The engine publishes a new catalog wholesale on every successful
/// commit. Cloning a catalog copies the namespace map while sharing the
/// namespaces themselves; a mutator deep-clones only the namespace it
/// touches and swaps the new one in, so unrelated namespaces share
/// structure across snapshots.
#[derive(Clone, Default)]
pub struct Catalog {
    pub(crate) namespaces: BTreeMap<String, Arc<Namespace>>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Catalog {
            namespaces: BTreeMap::new(),
        }
    }

    /// Returns the namespace with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.get(name)
    }

    /// Checks whether a namespace exists.
    pub fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// Iterates namespaces in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Namespace>)> {
        self.namespaces.iter()
    }

    /// Returns the number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Checks if the catalog holds no namespaces.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    // Returns a deep clone of the named namespace, or a fresh one. The
    // engine mutates the clone and swaps it in via `publish`.
    pub(crate) fn clone_namespace(&self, name: &str) -> Namespace {
        match self.namespaces.get(name) {
            Some(ns) => (**ns).clone(),
            None => Namespace::new(name),
        }
    }

    pub(crate) fn publish(&mut self, namespace: Namespace) {
        self.namespaces
            .insert(namespace.name.clone(), Arc::new(namespace));
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.namespaces.remove(name);
    }
}

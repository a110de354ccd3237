use crate::document::{doc_id, Doc};
use std::collections::HashMap;

/// An ordered set of unique document handles.
///
/// Membership is keyed by handle identity, not content: two structurally
/// equal documents behind different handles are distinct members. The
/// set maintains a list in insertion order plus an identity map to the
/// list positions, which stays consistent across every mutation.
///
/// Cloning a set copies the list and the position map while sharing the
/// document handles; since documents are never mutated in place behind a
/// handle, clones are safe independent snapshots of the membership.
#[derive(Clone, Default)]
pub struct DocSet {
    list: Vec<Doc>,
    positions: HashMap<usize, usize>,
}

impl DocSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        DocSet {
            list: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Creates a set from a list of handles, dropping duplicates.
    pub fn from_list(list: Vec<Doc>) -> Self {
        let mut set = DocSet::new();
        for doc in list {
            set.add(doc);
        }
        set
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Checks if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns the members in insertion order.
    pub fn list(&self) -> &[Doc] {
        &self.list
    }

    /// Checks membership by handle identity.
    pub fn contains(&self, doc: &Doc) -> bool {
        self.positions.contains_key(&doc_id(doc))
    }

    /// Adds the handle to the set.
    ///
    /// Returns `false` if the handle is already a member.
    pub fn add(&mut self, doc: Doc) -> bool {
        let id = doc_id(&doc);
        if self.positions.contains_key(&id) {
            return false;
        }

        self.list.push(doc);
        self.positions.insert(id, self.list.len() - 1);

        true
    }

    /// Replaces the first handle with the second, preserving its position.
    ///
    /// Returns `false` if the first handle is not a member or the second
    /// already is.
    pub fn replace(&mut self, old: &Doc, new: Doc) -> bool {
        let Some(&position) = self.positions.get(&doc_id(old)) else {
            return false;
        };

        if self.positions.contains_key(&doc_id(&new)) {
            return false;
        }

        self.positions.remove(&doc_id(old));
        self.positions.insert(doc_id(&new), position);
        self.list[position] = new;

        true
    }

    /// Removes the handle from the set.
    ///
    /// Returns `false` if the handle is not a member.
    pub fn remove(&mut self, doc: &Doc) -> bool {
        let Some(position) = self.positions.remove(&doc_id(doc)) else {
            return false;
        };

        self.list.remove(position);

        // re-index shifted members
        for (i, member) in self.list.iter().enumerate().skip(position) {
            self.positions.insert(doc_id(member), i);
        }

        true
    }
}

use crate::document::{doc_id, path, Doc, Value};
use crate::query::Column;
use std::collections::BTreeMap;

/// A unique or non-unique multi-column index.
///
/// The index maps tuples of column values to the handles of the
/// documents carrying them, ordered by the total order over values. A
/// unique index rejects a second document whose tuple compares equal to
/// an existing one; removal is idempotent.
///
/// Cloning an index copies the tree while sharing document handles.
#[derive(Clone)]
pub struct Index {
    unique: bool,
    columns: Vec<Column>,
    entries: BTreeMap<Vec<Value>, Vec<Doc>>,
}

impl Index {
    /// Creates an empty index over the given columns.
    pub fn new(unique: bool, columns: Vec<Column>) -> Self {
        Index {
            unique,
            columns,
            entries: BTreeMap::new(),
        }
    }

    /// Whether this index rejects duplicate column tuples.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// The indexed columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of distinct column tuples.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(&self, doc: &Doc) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| path::get(doc, &column.path))
            .collect()
    }

    /// Adds the document to the index.
    ///
    /// Returns `false` if the index is unique and a different document
    /// with an equal column tuple is already present. Adding the same
    /// handle twice is a no-op.
    pub fn add(&mut self, doc: &Doc) -> bool {
        let key = self.key(doc);
        match self.entries.get_mut(&key) {
            Some(bucket) => {
                if bucket.iter().any(|member| doc_id(member) == doc_id(doc)) {
                    return true;
                }
                if self.unique {
                    return false;
                }
                bucket.push(doc.clone());
                true
            }
            None => {
                self.entries.insert(key, vec![doc.clone()]);
                true
            }
        }
    }

    /// Checks whether the document handle is present.
    pub fn has(&self, doc: &Doc) -> bool {
        let key = self.key(doc);
        self.entries
            .get(&key)
            .map(|bucket| bucket.iter().any(|member| doc_id(member) == doc_id(doc)))
            .unwrap_or(false)
    }

    /// Removes the document from the index. Idempotent.
    pub fn remove(&mut self, doc: &Doc) {
        let key = self.key(doc);
        if let Some(bucket) = self.entries.get_mut(&key) {
            bucket.retain(|member| doc_id(member) != doc_id(doc));
            if bucket.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    /// Returns all handles in column-tuple order.
    pub fn list(&self) -> Vec<Doc> {
        self.entries.values().flatten().cloned().collect()
    }
}

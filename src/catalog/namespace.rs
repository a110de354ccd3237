use crate::catalog::{DocSet, Index};
use crate::query::Column;
use std::collections::BTreeMap;

/// The name of the implicit primary index present on every namespace.
pub const ID_INDEX: &str = "_id_";

/// The primary key field of every document.
pub const ID_FIELD: &str = "_id";

/// A named document set plus its indexes.
///
/// Namespaces follow the `"<db>.<coll>"` naming convention and always
/// carry the unique `_id_` index. Cloning a namespace copies the set and
/// every index while sharing document handles, which makes the clone an
/// independently mutable unit.
#[derive(Clone)]
pub struct Namespace {
    pub(crate) name: String,
    pub(crate) documents: DocSet,
    pub(crate) indexes: BTreeMap<String, Index>,
}

impl Namespace {
    /// Creates an empty namespace with its implicit `_id_` index.
    pub fn new(name: &str) -> Self {
        let mut indexes = BTreeMap::new();
        indexes.insert(
            ID_INDEX.to_string(),
            Index::new(true, vec![Column::new(ID_FIELD, false)]),
        );

        Namespace {
            name: name.to_string(),
            documents: DocSet::new(),
            indexes,
        }
    }

    /// The namespace name, `"<db>.<coll>"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document set.
    pub fn documents(&self) -> &DocSet {
        &self.documents
    }

    /// The indexes by name, including `_id_`.
    pub fn indexes(&self) -> &BTreeMap<String, Index> {
        &self.indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use std::sync::Arc;

    #[test]
    fn new_namespace_carries_id_index() {
        let ns = Namespace::new("db.coll");
        assert_eq!(ns.name(), "db.coll");
        assert!(ns.documents().is_empty());
        let index = ns.indexes().get(ID_INDEX).unwrap();
        assert!(index.is_unique());
        assert_eq!(index.columns(), &[Column::new(ID_FIELD, false)]);
    }

    #[test]
    fn id_index_rejects_duplicate_ids() {
        let mut ns = Namespace::new("db.coll");
        let first = Arc::new(doc! { "_id": 1 });
        let second = Arc::new(doc! { "_id": 1 });

        let index = ns.indexes.get_mut(ID_INDEX).unwrap();
        assert!(index.add(&first));
        assert!(!index.add(&second));
    }

    #[test]
    fn clone_is_independent() {
        let mut ns = Namespace::new("db.coll");
        let doc = Arc::new(doc! { "_id": 1 });
        ns.documents.add(doc.clone());
        if let Some(index) = ns.indexes.get_mut(ID_INDEX) {
            index.add(&doc);
        }

        let mut cloned = ns.clone();
        cloned.documents.remove(&doc);
        if let Some(index) = cloned.indexes.get_mut(ID_INDEX) {
            index.remove(&doc);
        }

        assert_eq!(ns.documents().len(), 1);
        assert!(ns.indexes().get(ID_INDEX).unwrap().has(&doc));
        assert!(cloned.documents().is_empty());
    }
}

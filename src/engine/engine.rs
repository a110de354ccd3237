use crate::catalog::{Catalog, ID_FIELD, ID_INDEX};
use crate::document::{compare, path, Doc, Document, ObjectId, Value};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use crate::doc;
use crate::query;
use crate::store::Store;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::Arc;

/// The outcome of an engine operation.
///
/// `matched` carries the documents selected by the read phase,
/// `modified` the freshly inserted or rewritten handles, and `upserted`
/// the document synthesized by an upsert. An unordered insert collects
/// per-document failures in `errors` while continuing with the rest of
/// the batch.
#[derive(Default, Debug)]
pub struct OpResult {
    pub matched: Vec<Doc>,
    pub modified: Vec<Doc>,
    pub upserted: Option<Doc>,
    pub errors: Vec<FerriteError>,
}

/// The mutex-serialized storage engine.
///
/// Every public operation acquires the engine's single exclusive lock
/// for its full duration, so the engine is a serial executor: readers
/// and writers never run concurrently and operations observe the order
/// in which they acquired the lock.
///
/// Mutating operations follow a four-phase recipe: a read-only phase
/// computes the affected documents against the current snapshot, a clone
/// phase deep-clones the affected namespace (unrelated namespaces share
/// structure), a mutate phase rewrites clones and indexes, and a commit
/// phase hands the new snapshot to the [Store] before atomically
/// publishing it. Any failure discards the clone: the previous snapshot
/// stays authoritative and no partial commit is ever observable.
pub struct Engine {
    inner: Mutex<EngineInner>,
}

struct EngineInner {
    store: Box<dyn Store>,
    data: Catalog,
}

impl Engine {
    /// Creates an engine, loading the initial snapshot from the store.
    pub fn new(store: impl Store + 'static) -> FerriteResult<Engine> {
        let store: Box<dyn Store> = Box::new(store);
        let data = store.load()?;
        log::debug!("engine loaded {} namespaces", data.len());

        Ok(Engine {
            inner: Mutex::new(EngineInner { store, data }),
        })
    }

    /// Lists database specifications, grouped from namespace prefixes.
    ///
    /// A database is empty when every namespace in it holds no
    /// documents. The synthesized documents are filtered by `query`.
    pub fn list_databases(&self, query: &Document) -> FerriteResult<Vec<Doc>> {
        let inner = self.inner.lock();

        // group namespaces by prefix before the first dot
        let mut groups: std::collections::BTreeMap<String, bool> = std::collections::BTreeMap::new();
        for (name, namespace) in inner.data.iter() {
            let db = name.split('.').next().unwrap_or("").to_string();
            let empty = groups.entry(db).or_insert(true);
            if !namespace.documents().is_empty() {
                *empty = false;
            }
        }

        let list: Vec<Doc> = groups
            .into_iter()
            .map(|(name, empty)| {
                Arc::new(doc! {
                    "name": name,
                    "sizeOnDisk": 0,
                    "empty": empty,
                })
            })
            .collect();

        query::filter(&list, query, 0)
    }

    /// Lists collection specifications of a database, filtered by `query`.
    pub fn list_collections(&self, db: &str, query: &Document) -> FerriteResult<Vec<Doc>> {
        let inner = self.inner.lock();

        let prefix = format!("{}.", db);
        let mut list: Vec<Doc> = Vec::new();
        for (name, _) in inner.data.iter() {
            if let Some(collection) = name.strip_prefix(&prefix) {
                list.push(Arc::new(doc! {
                    "name": collection,
                    "type": "collection",
                    "options": doc! {},
                    "info": doc! {
                        "uuid": name.clone(),
                        "readOnly": false,
                    },
                    "idIndex": doc! {
                        "v": 2,
                        "key": doc! { "_id": 1 },
                        "name": ID_INDEX,
                        "ns": name.clone(),
                    },
                }));
            }
        }

        query::filter(&list, query, 0)
    }

    /// Returns the number of documents in a namespace, or 0.
    pub fn num_documents(&self, ns: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .data
            .get(ns)
            .map(|namespace| namespace.documents().len())
            .unwrap_or(0)
    }

    /// Finds documents matching `query`, optionally sorted, with skip
    /// and limit. Read-only: no clone, no commit.
    pub fn find(
        &self,
        ns: &str,
        query: &Document,
        sort: Option<&Document>,
        skip: usize,
        limit: usize,
    ) -> FerriteResult<OpResult> {
        let inner = self.inner.lock();

        let Some(namespace) = inner.data.get(ns) else {
            return Ok(OpResult::default());
        };

        let mut list: Vec<Doc> = namespace.documents().list().to_vec();

        // sort documents
        if let Some(spec) = sort {
            if !spec.is_empty() {
                list = query::sorted(&list, spec)?;
            }
        }

        // apply skip
        if skip > list.len() {
            list.clear();
        } else {
            list.drain(..skip);
        }

        // filter documents
        let matched = query::filter(&list, query, limit)?;

        Ok(OpResult {
            matched,
            ..Default::default()
        })
    }

    /// Inserts documents into a namespace, generating missing `_id`s.
    ///
    /// With `ordered` the batch stops at the first failure; otherwise
    /// failures are collected per document and the rest of the batch
    /// proceeds. The commit happens only if at least one document was
    /// inserted.
    pub fn insert(&self, ns: &str, docs: Vec<Document>, ordered: bool) -> FerriteResult<OpResult> {
        let mut inner = self.inner.lock();

        // ensure ids
        let mut handles: Vec<Doc> = Vec::with_capacity(docs.len());
        for mut doc in docs {
            if path::get(&doc, ID_FIELD).is_missing() {
                path::put(&mut doc, ID_FIELD, Value::ObjectId(ObjectId::new()), true)?;
            }
            handles.push(Arc::new(doc));
        }

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        let mut result = OpResult::default();

        for doc in handles {
            // identity pre-check
            if namespace.documents.contains(&doc) {
                result.errors.push(FerriteError::new(
                    &format!("duplicate document in namespace \"{}\"", ns),
                    ErrorKind::DuplicateDocument,
                ));
                if ordered {
                    break;
                }
                continue;
            }

            // add document to all indexes, rolling back on conflict so a
            // skipped document leaves no trace
            let mut conflict: Option<String> = None;
            let mut added: Vec<String> = Vec::new();
            for (name, index) in namespace.indexes.iter_mut() {
                if index.add(&doc) {
                    added.push(name.clone());
                } else {
                    conflict = Some(name.clone());
                    break;
                }
            }
            if let Some(name) = conflict {
                for added_name in added {
                    if let Some(index) = namespace.indexes.get_mut(&added_name) {
                        index.remove(&doc);
                    }
                }
                result.errors.push(FerriteError::new(
                    &format!("duplicate document for index \"{}\"", name),
                    ErrorKind::UniqueConstraintViolation,
                ));
                if ordered {
                    break;
                }
                continue;
            }

            // add document
            namespace.documents.add(doc.clone());
            result.modified.push(doc);
        }

        // commit only if documents have been inserted
        if !result.modified.is_empty() {
            clone.publish(namespace);
            inner.commit(clone)?;
        }

        Ok(result)
    }

    /// Replaces at most one matching document.
    ///
    /// A replacement without `_id` adopts the matched document's id; a
    /// replacement with a different `_id` fails. Without a match and
    /// with `upsert`, a document is synthesized from the query and the
    /// replacement.
    pub fn replace(
        &self,
        ns: &str,
        query: &Document,
        sort: Option<&Document>,
        repl: Document,
        upsert: bool,
    ) -> FerriteResult<OpResult> {
        let mut inner = self.inner.lock();

        // read-only phase
        let list = inner.read_matched(ns, query, sort, 1)?;
        if list.is_empty() {
            if upsert {
                return inner.upsert(ns, query, Some(repl), None);
            }
            return Ok(OpResult::default());
        }

        // set missing id or check existing id
        let mut repl = repl;
        let repl_id = path::get(&repl, ID_FIELD);
        let matched_id = path::get(&list[0], ID_FIELD);
        if repl_id.is_missing() {
            path::put(&mut repl, ID_FIELD, matched_id, true)?;
        } else if compare(&repl_id, &matched_id) != Ordering::Equal {
            return Err(FerriteError::new(
                "document _id is immutable",
                ErrorKind::ImmutableField,
            ));
        }
        let repl: Doc = Arc::new(repl);

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        // update indexes
        for (name, index) in namespace.indexes.iter_mut() {
            index.remove(&list[0]);
            if !index.add(&repl) {
                return Err(FerriteError::new(
                    &format!("duplicate document for index \"{}\"", name),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }

        // replace document
        namespace.documents.replace(&list[0], repl.clone());

        clone.publish(namespace);
        inner.commit(clone)?;

        Ok(OpResult {
            matched: list,
            modified: vec![repl],
            ..Default::default()
        })
    }

    /// Applies an update document to up to `limit` matching documents.
    ///
    /// `_id` is immutable: an update that changes it fails wholesale.
    /// Without a match and with `upsert`, a document is synthesized from
    /// the query and the update.
    pub fn update(
        &self,
        ns: &str,
        query: &Document,
        sort: Option<&Document>,
        update: &Document,
        limit: usize,
        upsert: bool,
    ) -> FerriteResult<OpResult> {
        let mut inner = self.inner.lock();

        // read-only phase
        let list = inner.read_matched(ns, query, sort, limit)?;
        if list.is_empty() {
            if upsert {
                return inner.upsert(ns, query, None, Some(update));
            }
            return Ok(OpResult::default());
        }

        // clone and update documents
        let mut new_docs: Vec<Document> = list.iter().map(|doc| (**doc).clone()).collect();
        for doc in new_docs.iter_mut() {
            query::apply(doc, update, false)?;
        }

        // check ids
        for (new_doc, old_doc) in new_docs.iter().zip(list.iter()) {
            let new_id = path::get(new_doc, ID_FIELD);
            let old_id = path::get(old_doc, ID_FIELD);
            if compare(&new_id, &old_id) != Ordering::Equal {
                return Err(FerriteError::new(
                    "document _id is immutable",
                    ErrorKind::ImmutableField,
                ));
            }
        }
        let new_list: Vec<Doc> = new_docs.into_iter().map(Arc::new).collect();

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        // remove old docs from indexes
        for doc in &list {
            for index in namespace.indexes.values_mut() {
                index.remove(doc);
            }
        }

        // add new docs to indexes
        for doc in &new_list {
            for (name, index) in namespace.indexes.iter_mut() {
                if !index.add(doc) {
                    return Err(FerriteError::new(
                        &format!("duplicate document for index \"{}\"", name),
                        ErrorKind::UniqueConstraintViolation,
                    ));
                }
            }
        }

        // replace documents
        for (old_doc, new_doc) in list.iter().zip(new_list.iter()) {
            namespace.documents.replace(old_doc, new_doc.clone());
        }

        clone.publish(namespace);
        inner.commit(clone)?;

        Ok(OpResult {
            matched: list,
            modified: new_list,
            ..Default::default()
        })
    }

    /// Deletes up to `limit` matching documents.
    pub fn delete(
        &self,
        ns: &str,
        query: &Document,
        sort: Option<&Document>,
        limit: usize,
    ) -> FerriteResult<OpResult> {
        let mut inner = self.inner.lock();

        if inner.data.get(ns).is_none() {
            return Ok(OpResult::default());
        }

        // read-only phase
        let list = inner.read_matched(ns, query, sort, limit)?;

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        // remove documents
        for doc in &list {
            namespace.documents.remove(doc);
            for index in namespace.indexes.values_mut() {
                index.remove(doc);
            }
        }

        clone.publish(namespace);
        inner.commit(clone)?;

        Ok(OpResult {
            matched: list,
            ..Default::default()
        })
    }

    /// Drops all namespaces matching `ns`, where `*` is a wildcard over
    /// namespace names and every other character matches literally.
    pub fn drop(&self, ns: &str) -> FerriteResult<()> {
        let mut inner = self.inner.lock();

        // quote all meta characters, then turn wildcards into patterns
        let pattern = regex::escape(ns).replace("\\*", ".*");
        let regex = Regex::new(&format!("^{}$", pattern)).map_err(|err| {
            log::error!("invalid drop pattern \"{}\": {}", ns, err);
            FerriteError::new(
                &format!("invalid drop pattern \"{}\"", ns),
                ErrorKind::InternalError,
            )
        })?;

        // clone data and drop all matching namespaces
        let mut clone = inner.data.clone();
        let names: Vec<String> = clone
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| regex.is_match(name))
            .collect();
        for name in &names {
            clone.remove(name);
        }

        log::debug!("dropping {} namespaces matching \"{}\"", names.len(), ns);
        inner.commit(clone)
    }

    /// Lists the index specifications of a namespace, sorted by name.
    pub fn list_indexes(&self, ns: &str) -> FerriteResult<Vec<Doc>> {
        let inner = self.inner.lock();

        let Some(namespace) = inner.data.get(ns) else {
            return Err(missing_namespace(ns));
        };

        let mut list: Vec<Doc> = Vec::new();
        for (name, index) in namespace.indexes() {
            let mut key = Document::new();
            for column in index.columns() {
                key.insert(column.path.clone(), if column.reverse { -1 } else { 1 });
            }

            let mut spec = doc! {
                "v": 2,
                "key": key,
                "name": name.clone(),
                "ns": ns,
            };

            // the implicit primary index behaves uniquely but is not
            // reported as such
            if index.is_unique() && name != ID_INDEX {
                spec.insert("unique", true);
            }

            list.push(Arc::new(spec));
        }

        Ok(list)
    }

    /// Creates an index over the given keys and fills it from the
    /// current documents. Returns the index name.
    ///
    /// Without an explicit name, the name is derived from the columns
    /// as `path_dir_path_dir_...`. A unique conflict among the existing
    /// documents fails the operation.
    pub fn create_index(
        &self,
        ns: &str,
        keys: &Document,
        name: Option<&str>,
        unique: bool,
    ) -> FerriteResult<String> {
        let mut inner = self.inner.lock();

        // get columns
        let columns = query::columns(keys)?;

        // generate name if missing
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let mut segments = Vec::with_capacity(columns.len() * 2);
                for column in &columns {
                    segments.push(column.path.clone());
                    segments.push(if column.reverse { "-1" } else { "1" }.to_string());
                }
                segments.join("_")
            }
        };

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        // create and fill index
        let mut index = crate::catalog::Index::new(unique, columns);
        for doc in namespace.documents.list() {
            if !index.add(doc) {
                return Err(FerriteError::new(
                    &format!("duplicate document for index \"{}\"", name),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }
        namespace.indexes.insert(name.clone(), index);

        clone.publish(namespace);
        inner.commit(clone)?;

        Ok(name)
    }

    /// Drops an index by name; `"*"` drops every index except `_id_`.
    pub fn drop_index(&self, ns: &str, name: &str) -> FerriteResult<()> {
        let mut inner = self.inner.lock();

        if inner.data.get(ns).is_none() {
            return Err(missing_namespace(ns));
        }

        // clone data and namespace
        let mut clone = inner.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        if name == "*" {
            // delete all indexes except the primary one
            namespace.indexes.retain(|name, _| name == ID_INDEX);
        } else {
            if name == ID_INDEX {
                return Err(FerriteError::new(
                    &format!("cannot drop index \"{}\"", ID_INDEX),
                    ErrorKind::InvalidOperation,
                ));
            }
            if namespace.indexes.remove(name).is_none() {
                log::error!("missing index \"{}\"", name);
                return Err(FerriteError::new(
                    &format!("missing index \"{}\"", name),
                    ErrorKind::IndexNotFound,
                ));
            }
        }

        clone.publish(namespace);
        inner.commit(clone)
    }
}

impl EngineInner {
    // read phase shared by replace, update, and delete: sort the
    // namespace list, then filter with a limit
    fn read_matched(
        &self,
        ns: &str,
        query: &Document,
        sort: Option<&Document>,
        limit: usize,
    ) -> FerriteResult<Vec<Doc>> {
        let Some(namespace) = self.data.get(ns) else {
            return Ok(Vec::new());
        };

        let mut list: Vec<Doc> = namespace.documents().list().to_vec();
        if let Some(spec) = sort {
            if !spec.is_empty() {
                list = query::sorted(&list, spec)?;
            }
        }

        query::filter(&list, query, limit)
    }

    // match-or-insert: seed a document from the query's equality
    // conjuncts, overlay the replacement or apply the update in upsert
    // mode, then insert it
    fn upsert(
        &mut self,
        ns: &str,
        query: &Document,
        repl: Option<Document>,
        update: Option<&Document>,
    ) -> FerriteResult<OpResult> {
        // extract query
        let mut doc = query::extract(query)?;

        // overlay replacement if present
        if let Some(repl) = repl {
            let query_id = path::get(&doc, ID_FIELD);
            let repl_id = path::get(&repl, ID_FIELD);

            if !query_id.is_missing()
                && !repl_id.is_missing()
                && compare(&query_id, &repl_id) != Ordering::Equal
            {
                return Err(FerriteError::new(
                    "query _id and replacement _id must match",
                    ErrorKind::ImmutableField,
                ));
            }

            doc = repl;
            if !repl_id.is_missing() {
                path::put(&mut doc, ID_FIELD, repl_id, true)?;
            } else if !query_id.is_missing() {
                path::put(&mut doc, ID_FIELD, query_id, true)?;
            }
        }

        // apply update if present
        if let Some(update) = update {
            query::apply(&mut doc, update, true)?;
        }

        // generate object id if missing
        if path::get(&doc, ID_FIELD).is_missing() {
            path::put(&mut doc, ID_FIELD, Value::ObjectId(ObjectId::new()), true)?;
        }

        // clone data and namespace
        let mut clone = self.data.clone();
        let mut namespace = clone.clone_namespace(ns);

        // add document to indexes
        let handle: Doc = Arc::new(doc);
        for (name, index) in namespace.indexes.iter_mut() {
            if !index.add(&handle) {
                return Err(FerriteError::new(
                    &format!("duplicate document for index \"{}\"", name),
                    ErrorKind::UniqueConstraintViolation,
                ));
            }
        }

        // add document
        namespace.documents.add(handle.clone());

        clone.publish(namespace);
        self.commit(clone)?;

        Ok(OpResult {
            upserted: Some(handle),
            ..Default::default()
        })
    }

    // hand the snapshot to the store, then publish it as current
    fn commit(&mut self, clone: Catalog) -> FerriteResult<()> {
        self.store.store(&clone)?;
        self.data = clone;
        Ok(())
    }
}

fn missing_namespace(ns: &str) -> FerriteError {
    log::error!("missing namespace \"{}\"", ns);
    FerriteError::new(
        &format!("missing namespace \"{}\"", ns),
        ErrorKind::NamespaceNotFound,
    )
}

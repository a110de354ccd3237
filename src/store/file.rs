use crate::catalog::{Catalog, DocSet, Index, Namespace, ID_INDEX};
use crate::document::{Doc, Document};
use crate::errors::{ErrorKind, FerriteError, FerriteResult};
use crate::query::Column;
use crate::store::Store;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// On-disk shape of a snapshot. Documents are stored in set order and
// indexes as specifications only; the trees are rebuilt on load.
#[derive(serde::Deserialize, serde::Serialize)]
struct SnapshotRepr {
    namespaces: Vec<NamespaceRepr>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct NamespaceRepr {
    name: String,
    documents: Vec<Document>,
    indexes: Vec<IndexRepr>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct IndexRepr {
    name: String,
    unique: bool,
    columns: Vec<Column>,
}

/// A store that persists the whole snapshot to a single file.
///
/// Every commit serializes the snapshot and renames a temporary file
/// into place, so an interrupted or failed write never corrupts the
/// previously persisted state. Loading a missing file yields an empty
/// catalog.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a file store writing to the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn encode(data: &Catalog) -> FerriteResult<Vec<u8>> {
        let repr = SnapshotRepr {
            namespaces: data
                .iter()
                .map(|(_, ns)| NamespaceRepr {
                    name: ns.name().to_string(),
                    documents: ns
                        .documents()
                        .list()
                        .iter()
                        .map(|doc| (**doc).clone())
                        .collect(),
                    indexes: ns
                        .indexes()
                        .iter()
                        .map(|(name, index)| IndexRepr {
                            name: name.clone(),
                            unique: index.is_unique(),
                            columns: index.columns().to_vec(),
                        })
                        .collect(),
                })
                .collect(),
        };

        bincode::serde::encode_to_vec(&repr, bincode::config::legacy()).map_err(|err| {
            log::error!("failed to encode snapshot: {}", err);
            FerriteError::new(
                &format!("failed to encode snapshot: {}", err),
                ErrorKind::EncodingError,
            )
        })
    }

    fn decode(bytes: &[u8]) -> FerriteResult<Catalog> {
        let (repr, _): (SnapshotRepr, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::legacy()).map_err(|err| {
                log::error!("failed to decode snapshot: {}", err);
                FerriteError::new(
                    &format!("failed to decode snapshot: {}", err),
                    ErrorKind::EncodingError,
                )
            })?;

        let mut catalog = Catalog::new();
        for ns_repr in repr.namespaces {
            let mut namespace = Namespace::new(&ns_repr.name);

            for index_repr in ns_repr.indexes {
                if index_repr.name == ID_INDEX {
                    continue;
                }
                namespace.indexes.insert(
                    index_repr.name,
                    Index::new(index_repr.unique, index_repr.columns),
                );
            }

            let mut documents = DocSet::new();
            for document in ns_repr.documents {
                let handle: Doc = Arc::new(document);
                for (name, index) in namespace.indexes.iter_mut() {
                    if !index.add(&handle) {
                        log::error!(
                            "duplicate document for index \"{}\" in stored namespace \"{}\"",
                            name,
                            ns_repr.name
                        );
                        return Err(FerriteError::new(
                            &format!("duplicate document for index \"{}\"", name),
                            ErrorKind::EncodingError,
                        ));
                    }
                }
                documents.add(handle);
            }
            namespace.documents = documents;

            catalog.publish(namespace);
        }

        Ok(catalog)
    }
}

impl Store for FileStore {
    fn load(&self) -> FerriteResult<Catalog> {
        if !self.path.exists() {
            log::debug!("no snapshot at {:?}, starting empty", self.path);
            return Ok(Catalog::new());
        }

        let bytes = fs::read(&self.path)?;
        Self::decode(&bytes)
    }

    fn store(&self, data: &Catalog) -> FerriteResult<()> {
        let bytes = Self::encode(data)?;

        // write-then-rename keeps the previous snapshot intact on failure
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, &bytes)?;
        fs::rename(&temp, &self.path)?;

        log::debug!("persisted snapshot to {:?} ({} bytes)", self.path, bytes.len());
        Ok(())
    }
}

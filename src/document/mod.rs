//! The document data model: values, ordered documents, the dotted-path
//! algebra, and the total order over values.

pub mod compare;
#[allow(clippy::module_inception)]
mod document;
mod object_id;
pub mod path;
mod timestamp;
mod value;

pub use compare::{compare, compare_documents};
pub use document::Document;
pub use object_id::ObjectId;
pub use timestamp::{Timestamp, TimestampGenerator};
pub use value::{RegexValue, Value};

use std::sync::Arc;

/// A handle to a document.
///
/// Documents are referenced by stable identity, not by content: two
/// structurally equal documents behind different handles are distinct
/// members of a set and distinct index entries. Handles are cheap to
/// clone and share; the referenced document is never mutated in place
/// after insertion — mutations clone the document into a new handle.
pub type Doc = Arc<Document>;

/// Returns the identity of a handle, used to key sets and indexes.
#[inline]
pub fn doc_id(doc: &Doc) -> usize {
    Arc::as_ptr(doc) as usize
}

/// Deep-clones the referenced document into a fresh handle.
pub fn clone_doc(doc: &Doc) -> Doc {
    Arc::new((**doc).clone())
}

/// Deep-clones every document in the list into fresh handles.
pub fn clone_list(list: &[Doc]) -> Vec<Doc> {
    list.iter().map(clone_doc).collect()
}

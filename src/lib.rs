//! # Ferrite - Embedded Document Database Engine
//!
//! Ferrite is an embeddable, in-process document database written in
//! Rust. It implements a meaningful subset of the MongoDB data model and
//! query/update semantics on top of a pluggable persistence backend:
//! ordered documents, dotted-path access, the familiar `$` query and
//! update operators, unique and non-unique multi-column indexes, and a
//! copy-on-write engine with all-or-nothing commits.
//!
//! ## Key Features
//!
//! - **Embedded**: No separate server process required
//! - **Documents**: Ordered key-value documents with nested documents
//!   and arrays, addressed by dotted paths
//! - **Queries**: `$eq`, `$gt`, `$in`, `$exists`, `$regex`, `$elemMatch`
//!   and friends, with logical combinators
//! - **Updates**: `$set`, `$unset`, `$rename`, `$inc`, `$min`/`$max`,
//!   `$currentDate` with upsert support
//! - **Indexes**: Unique and non-unique multi-column indexes, always
//!   including the implicit `_id_` index
//! - **Snapshots**: Mutations clone affected namespaces and publish a
//!   new snapshot atomically after the store accepts it
//! - **Pluggable Stores**: In-memory and single-file backends included
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrite::doc;
//! use ferrite::engine::Engine;
//! use ferrite::store::MemoryStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(MemoryStore::new())?;
//!
//! engine.insert("app.users", vec![
//!     doc! { "name": "Alice", "age": 30 },
//!     doc! { "name": "Bob", "age": 25 },
//! ], true)?;
//!
//! let result = engine.find(
//!     "app.users",
//!     &doc! { "age": doc! { "$gte": 28 } },
//!     None,
//!     0,
//!     0,
//! )?;
//! assert_eq!(result.matched.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`document`] - Values, ordered documents, path access, comparison
//! - [`query`] - Matching, update application, sorting, filtering
//! - [`catalog`] - Document sets, indexes, namespaces, snapshots
//! - [`engine`] - The mutex-serialized engine
//! - [`store`] - The persistence contract and bundled backends
//! - [`errors`] - Error types and result definitions

pub mod catalog;
pub mod document;
pub mod engine;
pub mod errors;
pub mod query;
pub mod store;

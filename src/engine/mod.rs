//! The mutex-serialized storage engine with copy-on-write commits.

#[allow(clippy::module_inception)]
mod engine;

pub use engine::{Engine, OpResult};

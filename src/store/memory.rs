use crate::catalog::Catalog;
use crate::errors::FerriteResult;
use crate::store::Store;

/// A store that persists nothing.
///
/// The engine itself holds the current snapshot in memory; a memory
/// store simply starts it empty and accepts every commit. Useful for
/// tests and ephemeral databases.
#[derive(Default, Clone, Copy)]
pub struct MemoryStore;

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore
    }
}

impl Store for MemoryStore {
    fn load(&self) -> FerriteResult<Catalog> {
        Ok(Catalog::new())
    }

    fn store(&self, _data: &Catalog) -> FerriteResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_yields_empty_catalog() {
        let store = MemoryStore::new();
        let catalog = store.load().unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn store_accepts_any_snapshot() {
        let store = MemoryStore::new();
        let catalog = store.load().unwrap();
        assert!(store.store(&catalog).is_ok());
    }
}

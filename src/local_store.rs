use crate::backend::{KeyValueStore, StorageError};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// In-process store. Contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let store = MemoryStore::default();
        assert_eq!(store.get("mm_bookings").unwrap(), None);

        store.set("mm_bookings", "[]".into()).unwrap();
        assert_eq!(store.get("mm_bookings").unwrap().as_deref(), Some("[]"));

        store.set("mm_bookings", "[1]".into()).unwrap();
        assert_eq!(store.get("mm_bookings").unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.get("mm_blocks").unwrap(), None);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = MemoryStore::default();
        let clone = store.clone();
        clone.set("mm_blocks", "[]".into()).unwrap();
        assert_eq!(store.get("mm_blocks").unwrap().as_deref(), Some("[]"));
    }
}

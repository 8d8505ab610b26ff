use crate::backend::{KeyValueStore, StorageError};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Persists every key as `<key>.json` inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, StorageError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path(key);
        let staging = self.directory.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        debug!(path = %path.display(), "Stored key");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_key_reads_as_none() {
        let directory = tempdir().unwrap();
        let store = FileStore::new(directory.path()).unwrap();
        assert_eq!(store.get("mm_bookings").unwrap(), None);
    }

    #[test]
    fn test_persistency_across_instances() {
        let directory = tempdir().unwrap();
        let store = FileStore::new(directory.path().join("nested")).unwrap();
        store.set("mm_blocks", r#"[{"a":1}]"#.into()).unwrap();
        drop(store);

        let store = FileStore::new(directory.path().join("nested")).unwrap();
        assert_eq!(
            store.get("mm_blocks").unwrap().as_deref(),
            Some(r#"[{"a":1}]"#)
        );
        assert!(!directory
            .path()
            .join("nested")
            .join(".mm_blocks.json.tmp")
            .exists());
    }
}

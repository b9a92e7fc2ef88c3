//! Durable string-keyed blob stores.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Errors surfaced by [`KeyValueStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be written or removed.
    #[error("could not access save file {}: {source}", path.display())]
    Io {
        /// File the store operates on.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A value could not be encoded as JSON.
    #[error("could not encode persisted value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable store of string blobs keyed by name.
pub trait KeyValueStore {
    /// Retrieves the blob stored under `key`, if any.
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous blob.
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Stores every `(key, value)` pair as one write.
    ///
    /// Either all pairs are stored or, on error, none of them are.
    fn set_strings(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    /// Removes every stored blob.
    fn clear_all(&mut self) -> Result<(), StoreError>;
}

/// Volatile store used by tests and sessions without a save file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let _ = self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn set_strings(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        self.entries.extend(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
        );
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

/// Store persisted as a single JSON object file.
///
/// Every write rewrites the whole file through a temporary sibling that is
/// renamed into place. The in-memory entries only change once that rename
/// succeeded, so they always match the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty; it is replaced on the next write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self { path, entries }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, staged: BTreeMap<String, String>) -> Result<(), StoreError> {
        self.write_file(&staged)?;
        self.entries = staged;
        Ok(())
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, contents).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_strings(&[(key, value)])
    }

    fn set_strings(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut staged = self.entries.clone();
        staged.extend(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
        );
        self.commit(staged)
    }

    fn clear_all(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "could not read save file, starting empty");
            return BTreeMap::new();
        }
    };

    serde_json::from_str(&contents).unwrap_or_else(|error| {
        tracing::warn!(path = %path.display(), %error, "save file is corrupt, starting empty");
        BTreeMap::new()
    })
}

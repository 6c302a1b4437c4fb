use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use desk_logging::{desk_debug, desk_warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode entry: {0}")]
    Encode(String),
    #[error("could not decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Independent slices of the local store; each can be cleared on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Conversation,
    Comparison,
    Patterns,
    Contradictions,
    Auth,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Conversation => "conversation",
            Namespace::Comparison => "comparison",
            Namespace::Patterns => "patterns",
            Namespace::Contradictions => "contradictions",
            Namespace::Auth => "auth",
        }
    }
}

/// On-disk envelope; the full key guards against hash collisions.
#[derive(Serialize, Deserialize)]
struct Entry<T> {
    key: String,
    value: T,
}

/// Directory of JSON files keyed by namespace and key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{namespace}-{short_hash(key)}.json` inside the store directory.
    pub fn path_for(&self, namespace: Namespace, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", namespace.as_str(), short_hash(key)))
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.path_for(namespace, key);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entry: Entry<T> =
            serde_json::from_str(&content).map_err(|err| StoreError::Decode {
                path: path.clone(),
                message: err.to_string(),
            })?;
        if entry.key != key {
            desk_warn!("Store entry {:?} belongs to another key; ignoring", path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    pub fn save<T: Serialize>(
        &self,
        namespace: Namespace,
        key: &str,
        value: &T,
    ) -> Result<PathBuf, StoreError> {
        let entry = Entry {
            key: key.to_string(),
            value,
        };
        let content = serde_json::to_string_pretty(&entry)
            .map_err(|err| StoreError::Encode(err.to_string()))?;
        let path = self.path_for(namespace, key);
        write_atomic(&self.dir, &path, &content)?;
        desk_debug!("Stored {} entry at {:?}", namespace.as_str(), path);
        Ok(path)
    }

    /// Removes one entry; a missing entry is not an error.
    pub fn clear(&self, namespace: Namespace, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(namespace, key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| StoreError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(StoreError::Dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| StoreError::Dir(e.to_string()))?;
    }
    Ok(())
}

/// Writes to a temp file in `dir`, then renames it over `target`.
fn write_atomic(dir: &Path, target: &Path, content: &str) -> Result<(), StoreError> {
    ensure_dir(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn short_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_stable_and_namespaced() {
        let store = LocalStore::new("/tmp/docdesk");
        let a = store.path_for(Namespace::Conversation, "a,b");
        assert_eq!(a, store.path_for(Namespace::Conversation, "a,b"));
        assert_ne!(a, store.path_for(Namespace::Comparison, "a,b"));
        assert_ne!(a, store.path_for(Namespace::Conversation, "a,c"));

        let name = a.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("conversation-"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "conversation-".len() + 16 + ".json".len());
    }
}

//! # Key-Value Store
//!
//! String-keyed JSON blob storage used for per-prompt variable values and
//! usage metadata. [`MemoryKeyValueStore`] keeps everything in memory;
//! [`FileKeyValueStore`] writes one `<key>.json` file per key, with the key
//! percent-encoded so any prompt id maps to a single plain file name.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid base path: {0}")]
    InvalidBasePath(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError>;
    fn remove(&mut self, key: &str) -> Result<(), KeyValueError>;
    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>, KeyValueError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KeyValueError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// A directory of `<key>.json` files.
pub struct FileKeyValueStore {
    /// The directory where entries are stored.
    pub base_path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        FileKeyValueStore {
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KeyValueError> {
        if key.is_empty() {
            return Err(KeyValueError::InvalidKey(key.to_string()));
        }
        // Only '.' survives encoding unescaped among path-relevant characters.
        let stem = urlencoding::encode(key).replace('.', "%2E");
        Ok(self.base_path.join(format!("{}.json", stem)))
    }

    fn ensure_base_directory_exists(&self) -> Result<(), KeyValueError> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path)?;
        } else if !self.base_path.is_dir() {
            return Err(KeyValueError::InvalidBasePath(
                self.base_path.display().to_string(),
            ));
        }
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes to a temporary file in the same directory and renames it over
    /// the target, so readers never see a half-written entry.
    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError> {
        let path = self.path_for(key)?;
        self.ensure_base_directory_exists()?;

        let mut file = tempfile::NamedTempFile::new_in(&self.base_path)?;
        file.write_all(value.as_bytes())?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, KeyValueError> {
        if !self.base_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys: Vec<String> = WalkDir::new(&self.base_path)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let stem = e.path().file_stem()?.to_str()?.to_string();
                urlencoding::decode(&stem).ok().map(|key| key.into_owned())
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryKeyValueStore::new();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();

        assert_eq!(Some("1".to_string()), store.get("a").unwrap());
        assert_eq!(vec!["a".to_string(), "b".to_string()], store.keys().unwrap());

        store.remove("a").unwrap();
        assert_eq!(None, store.get("a").unwrap());
    }

    #[test]
    fn test_file_store_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = temp_dir.path().join("state");
        let mut store = FileKeyValueStore::new(&state_dir);

        assert!(!state_dir.exists());
        store.set("prompt_vars_p1", "{\"name\":\"Ada\"}").unwrap();

        assert!(state_dir.join("prompt_vars_p1.json").exists());
        assert_eq!(
            Some("{\"name\":\"Ada\"}".to_string()),
            store.get("prompt_vars_p1").unwrap()
        );
    }

    #[test]
    fn test_file_store_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKeyValueStore::new(temp_dir.path());

        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();

        assert_eq!(Some("second".to_string()), store.get("k").unwrap());
        assert_eq!(vec!["k".to_string()], store.keys().unwrap());
    }

    #[test]
    fn test_file_store_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKeyValueStore::new(temp_dir.path());

        assert_eq!(None, store.get("nothing").unwrap());
        assert!(store.remove("nothing").is_ok());
    }

    #[test]
    fn test_file_store_keys_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKeyValueStore::new(temp_dir.path());
        store.set("prompt_meta_p1", "{}").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(vec!["prompt_meta_p1".to_string()], store.keys().unwrap());
    }

    #[test]
    fn test_file_store_encodes_arbitrary_keys() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = temp_dir.path().join("state");
        let mut store = FileKeyValueStore::new(&state_dir);

        store.set("prompt_vars_code review/v2", "{}").unwrap();
        store.set("../escape", "x").unwrap();
        store.set("prompt_meta_a:b", "{}").unwrap();

        assert_eq!(Some("{}".to_string()), store.get("prompt_vars_code review/v2").unwrap());
        assert_eq!(Some("x".to_string()), store.get("../escape").unwrap());
        assert!(!temp_dir.path().join("escape.json").exists());
        assert_eq!(3, fs::read_dir(&state_dir).unwrap().count());
        assert_eq!(
            vec![
                "../escape".to_string(),
                "prompt_meta_a:b".to_string(),
                "prompt_vars_code review/v2".to_string(),
            ],
            store.keys().unwrap()
        );

        store.remove("prompt_vars_code review/v2").unwrap();
        assert_eq!(None, store.get("prompt_vars_code review/v2").unwrap());
    }

    #[test]
    fn test_file_store_rejects_empty_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        assert!(matches!(store.get(""), Err(KeyValueError::InvalidKey(_))));
    }

    #[test]
    fn test_file_store_base_path_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not_a_directory");
        fs::write(&file_path, "some content").unwrap();

        let mut store = FileKeyValueStore::new(file_path);
        assert!(store.set("k", "v").is_err());
    }
}

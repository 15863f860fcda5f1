//! # File Storage
//!
//! This module provides a [`PromptSource`] backed by a single JSON library file:
//! an array of prompt objects, in display order.
//!
//! Updates are merges, not overwrites: the serialized prompt is laid over the
//! stored object key by key, and `variations` / `variables` survive when the
//! update does not carry them. Every write goes to a temporary file next to
//! the library and is renamed into place.
//!
//! # Examples
//!
//! ```rust
//! use promptdeck_core::file_storage::FileStorage;
//! use promptdeck_core::registry::PromptSource;
//! use tempfile::TempDir;
//!
//! let temp_dir = TempDir::new().unwrap();
//! let library = temp_dir.path().join("prompts.json");
//! std::fs::write(&library, r#"[{"id": "hello", "title": "Hello", "category": "General", "template": "Hi {{name}}"}]"#).unwrap();
//!
//! let storage = FileStorage::new(library);
//! let prompts = storage.get_prompts().expect("Failed to load prompts");
//! assert_eq!(1, prompts.len());
//! ```

use crate::prompt::Prompt;
use crate::registry::PromptSource;
use log::info;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::PathBuf;
use std::{fs, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid base path: {0}")]
    InvalidBasePath(String),
    #[error("Invalid prompt library: {0}")]
    InvalidLibrary(String),
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),
}

/// A prompt library stored as one JSON file.
pub struct FileStorage {
    /// Path of the library file, e.g. `prompts.json`.
    pub library_path: PathBuf,
}

impl FileStorage {
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        FileStorage {
            library_path: library_path.into(),
        }
    }

    /// Reads the library as raw JSON objects. A missing file is an empty library.
    fn read_records(&self) -> Result<Vec<Map<String, Value>>, FileStorageError> {
        if !self.library_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.library_path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Array(items) = value else {
            return Err(FileStorageError::InvalidLibrary(
                "expected a JSON array of prompts".to_string(),
            ));
        };

        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(FileStorageError::InvalidLibrary(
                    "every prompt must be a JSON object".to_string(),
                )),
            })
            .collect()
    }

    fn write_records(&self, records: Vec<Map<String, Value>>) -> Result<(), FileStorageError> {
        let directory = self.ensure_parent_directory_exists()?;
        let records: Vec<Value> = records.into_iter().map(Value::Object).collect();
        let serialized = serde_json::to_string_pretty(&records)?;

        let mut file = tempfile::NamedTempFile::new_in(directory)?;
        file.write_all(serialized.as_bytes())?;
        file.persist(&self.library_path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Writes `prompts` as the whole library, replacing the file.
    pub fn write_library(&self, prompts: &[Prompt]) -> Result<(), FileStorageError> {
        let records = prompts
            .iter()
            .map(|prompt| match serde_json::to_value(prompt)? {
                Value::Object(map) => Ok(map),
                _ => Err(FileStorageError::InvalidPrompt(prompt.id.clone())),
            })
            .collect::<Result<Vec<_>, FileStorageError>>()?;
        self.write_records(records)
    }

    fn ensure_parent_directory_exists(&self) -> Result<PathBuf, FileStorageError> {
        let directory = match self.library_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        } else if !directory.is_dir() {
            return Err(FileStorageError::InvalidBasePath(
                directory.display().to_string(),
            ));
        }
        Ok(directory)
    }
}

/// Lays `patch` over `stored`. `variations` and `variables` are kept from
/// `stored` when the patch omits them; `variables` defaults to `[]`.
fn merge_record(stored: &Map<String, Value>, patch: Map<String, Value>) -> Map<String, Value> {
    let mut merged = stored.clone();
    for (key, value) in patch {
        merged.insert(key, value);
    }

    if !merged.contains_key("variables") {
        merged.insert("variables".to_string(), Value::Array(Vec::new()));
    }
    merged
}

fn required_field<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn record_id(record: &Map<String, Value>) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

impl PromptSource for FileStorage {
    type Error = FileStorageError;

    /// Loads every prompt in the library, in file order.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Prompt>)` - All prompts; empty if the library file doesn't exist.
    /// * `FileStorageError` - If the file can't be read or isn't a JSON array of prompts.
    fn get_prompts(&self) -> Result<Vec<Prompt>, FileStorageError> {
        let prompts = self
            .read_records()?
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)))
            .collect::<Result<Vec<Prompt>, _>>()?;

        info!(
            "Loaded {} prompt(s) from {}",
            prompts.len(),
            self.library_path.display()
        );
        Ok(prompts)
    }

    /// Gets a prompt given its id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Prompt))` - If the prompt is found.
    /// * `Ok(None)` - If no prompt has this id.
    fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, FileStorageError> {
        let record = self
            .read_records()?
            .into_iter()
            .find(|record| record_id(record) == Some(id));

        match record {
            Some(record) => Ok(Some(serde_json::from_value(Value::Object(record))?)),
            None => Ok(None),
        }
    }

    /// Merges `prompt` into the stored prompt with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(Prompt)` - The merged prompt as now stored.
    /// * `FileStorageError::PromptNotFound` - If no stored prompt has this id.
    /// * `FileStorageError::InvalidPrompt` - If `title` or `category` is empty.
    fn update_prompt(&self, prompt: &Prompt) -> Result<Prompt, FileStorageError> {
        let mut records = self.read_records()?;
        let index = records
            .iter()
            .position(|record| record_id(record) == Some(prompt.id.as_str()))
            .ok_or_else(|| FileStorageError::PromptNotFound(prompt.id.clone()))?;

        let Value::Object(patch) = serde_json::to_value(prompt)? else {
            return Err(FileStorageError::InvalidPrompt(prompt.id.clone()));
        };
        if required_field(&patch, "title").is_none() || required_field(&patch, "category").is_none() {
            return Err(FileStorageError::InvalidPrompt(
                "title and category are required".to_string(),
            ));
        }

        let merged = merge_record(&records[index], patch);
        records[index] = merged.clone();
        self.write_records(records)?;

        info!("Updated prompt '{}' in {}", prompt.id, self.library_path.display());
        Ok(serde_json::from_value(Value::Object(merged))?)
    }
}

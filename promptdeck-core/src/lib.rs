//! # promptdeck Core
//!
//! This crate provides the core functionality for promptdeck, a library of
//! reusable prompt templates with fill-in variables.
//!
//! A prompt is either a single template or a set of variants, optionally
//! split into steps. Variables are substituted into `{{name}}` placeholders,
//! can be hidden behind a toggle, and keep their values between sessions.
//!
//! # Modules
//!
//! - [`prompt`] - Core prompt data structures and their JSON format
//! - [`parser`] - Placeholder parsing
//! - [`compiler`] - Placeholder substitution
//! - [`resolver`] - Picks the active template and variable set of a prompt
//! - [`dependency`] - Toggle-gated variable visibility
//! - [`view`] - Locked/unlocked view state transitions
//! - [`kv_store`] - String-keyed blob storage
//! - [`variable_store`] - Saved variable values per prompt
//! - [`usage`] - Use count and last-used tracking
//! - [`registry`] - Prompt source trait, repository and filters
//! - [`file_storage`] - JSON library file implementation of the prompt source
//! - [`clipboard`] - Clipboard port with manual-selection fallback
//! - [`validation`] - Library consistency checks
//! - [`session`] - The library session tying everything together
//!
//! # Examples
//!
//! ```rust
//! use promptdeck_core::file_storage::FileStorage;
//! use promptdeck_core::kv_store::MemoryKeyValueStore;
//! use promptdeck_core::prompt::{Prompt, Variable};
//! use promptdeck_core::session::PromptLibrary;
//! use tempfile::TempDir;
//!
//! let temp_dir = TempDir::new().unwrap();
//! let storage = FileStorage::new(temp_dir.path().join("prompts.json"));
//!
//! let prompt = Prompt::new_simple("greet", "Greeting", "General", "Hello {{name}}", vec![Variable::new("name")]);
//! storage.write_library(&[prompt]).expect("Failed to write library");
//!
//! let mut library = PromptLibrary::load(storage, MemoryKeyValueStore::new());
//! library.set_variable("greet", "name", "Ada");
//! assert_eq!(Some("Hello Ada".to_string()), library.preview("greet"));
//! ```

pub mod clipboard;
pub mod compiler;
pub mod dependency;
pub mod file_storage;
pub mod kv_store;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod usage;
pub mod validation;
pub mod variable_store;
pub mod view;

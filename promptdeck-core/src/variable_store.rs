//! # Variable Store
//!
//! Persists variable values per prompt id under `prompt_vars_<id>`.
//!
//! Storage is scoped to the prompt, not the variant: variants that use the
//! same variable name share its saved value. I/O failures and corrupt
//! entries are logged and treated as "nothing saved".

use crate::kv_store::KeyValueStore;
use crate::prompt::Variable;
use log::{debug, warn};
use std::collections::BTreeMap;

pub const VARIABLES_KEY_PREFIX: &str = "prompt_vars_";

pub fn variables_key(prompt_id: &str) -> String {
    format!("{}{}", VARIABLES_KEY_PREFIX, prompt_id)
}

/// Writes the non-empty values of `variables` for `prompt_id`.
///
/// The saved mapping replaces whatever was stored before. Returns whether
/// the write succeeded.
pub fn save<'a>(
    store: &mut dyn KeyValueStore,
    prompt_id: &str,
    variables: impl IntoIterator<Item = &'a Variable>,
) -> bool {
    let values: BTreeMap<&str, &str> = variables
        .into_iter()
        .filter(|v| v.has_value())
        .map(|v| (v.name.as_str(), v.value.as_str()))
        .collect();

    let serialized = match serde_json::to_string(&values) {
        Ok(serialized) => serialized,
        Err(e) => {
            warn!("Failed to serialize variables for prompt '{}': {}", prompt_id, e);
            return false;
        }
    };

    match store.set(&variables_key(prompt_id), &serialized) {
        Ok(()) => {
            debug!("Saved {} variable value(s) for prompt '{}'", values.len(), prompt_id);
            true
        }
        Err(e) => {
            warn!("Failed to save variables for prompt '{}': {}", prompt_id, e);
            false
        }
    }
}

/// Hydrates `variables` from the values saved for `prompt_id`.
///
/// Only variables with a non-empty saved value are touched. Returns the
/// number of variables that were set.
pub fn load<'a>(
    store: &dyn KeyValueStore,
    prompt_id: &str,
    variables: impl IntoIterator<Item = &'a mut Variable>,
) -> usize {
    let saved = saved_values(store, prompt_id);

    let mut restored = 0;
    for variable in variables {
        if let Some(value) = saved.get(&variable.name) {
            if !value.is_empty() {
                variable.value = value.clone();
                restored += 1;
            }
        }
    }
    restored
}

/// The raw saved mapping for `prompt_id`; empty when nothing usable is stored.
pub fn saved_values(store: &dyn KeyValueStore, prompt_id: &str) -> BTreeMap<String, String> {
    let raw = match store.get(&variables_key(prompt_id)) {
        Ok(Some(raw)) => raw,
        Ok(None) => return BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read saved variables for prompt '{}': {}", prompt_id, e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&raw) {
        Ok(values) => values
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(s) => Some((name, s)),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!("Ignoring corrupt saved variables for prompt '{}': {}", prompt_id, e);
            BTreeMap::new()
        }
    }
}

/// Ids of every prompt with saved values, sorted.
pub fn stored_prompt_ids(store: &dyn KeyValueStore) -> Vec<String> {
    match store.keys() {
        Ok(keys) => keys
            .iter()
            .filter_map(|key| key.strip_prefix(VARIABLES_KEY_PREFIX))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!("Failed to list saved variables: {}", e);
            Vec::new()
        }
    }
}

/// Deletes the saved values for `prompt_id`.
pub fn clear(store: &mut dyn KeyValueStore, prompt_id: &str) -> bool {
    match store.remove(&variables_key(prompt_id)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to clear saved variables for prompt '{}': {}", prompt_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::{KeyValueError, MemoryKeyValueStore};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, KeyValueError> {
            Err(KeyValueError::InvalidBasePath("unreachable".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), KeyValueError> {
            Err(KeyValueError::InvalidBasePath("unreachable".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), KeyValueError> {
            Err(KeyValueError::InvalidBasePath("unreachable".to_string()))
        }

        fn keys(&self) -> Result<Vec<String>, KeyValueError> {
            Err(KeyValueError::InvalidBasePath("unreachable".to_string()))
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut store = MemoryKeyValueStore::new();
        let saved = vec![
            Variable::new("name").with_value("Ada"),
            Variable::new("topic"),
            Variable::new("tone").with_value("dry"),
        ];
        assert!(save(&mut store, "p1", &saved));

        let mut fresh = vec![
            Variable::new("name"),
            Variable::new("topic").with_value("kept"),
            Variable::new("tone"),
        ];
        let restored = load(&store, "p1", &mut fresh);

        assert_eq!(2, restored);
        assert_eq!("Ada", fresh[0].value);
        assert_eq!("kept", fresh[1].value);
        assert_eq!("dry", fresh[2].value);
    }

    #[test]
    fn test_save_only_writes_non_empty_values() {
        let mut store = MemoryKeyValueStore::new();
        save(&mut store, "p1", &[Variable::new("a").with_value("1"), Variable::new("b")]);

        let raw = store.get("prompt_vars_p1").unwrap().unwrap();
        assert_eq!("{\"a\":\"1\"}", raw);
    }

    #[test]
    fn test_load_never_overwrites_with_empty() {
        let mut store = MemoryKeyValueStore::new();
        store.set("prompt_vars_p1", "{\"a\":\"\",\"b\":\"2\"}").unwrap();

        let mut variables = vec![Variable::new("a").with_value("keep"), Variable::new("b")];
        load(&store, "p1", &mut variables);

        assert_eq!("keep", variables[0].value);
        assert_eq!("2", variables[1].value);
    }

    #[test]
    fn test_load_is_scoped_by_prompt_id() {
        let mut store = MemoryKeyValueStore::new();
        save(&mut store, "p1", &[Variable::new("a").with_value("1")]);

        let mut variables = vec![Variable::new("a")];
        assert_eq!(0, load(&store, "p2", &mut variables));
        assert_eq!("", variables[0].value);
    }

    #[test]
    fn test_corrupt_data_is_ignored() {
        let mut store = MemoryKeyValueStore::new();
        store.set("prompt_vars_p1", "{not json").unwrap();

        let mut variables = vec![Variable::new("a").with_value("default")];
        assert_eq!(0, load(&store, "p1", &mut variables));
        assert_eq!("default", variables[0].value);
    }

    #[test]
    fn test_non_string_values_are_ignored() {
        let mut store = MemoryKeyValueStore::new();
        store.set("prompt_vars_p1", "{\"a\":3,\"b\":\"ok\"}").unwrap();

        let values = saved_values(&store, "p1");
        assert_eq!(1, values.len());
        assert_eq!(Some(&"ok".to_string()), values.get("b"));
    }

    #[test]
    fn test_unreachable_store_falls_back() {
        let mut store = BrokenStore;
        let mut variables = vec![Variable::new("a").with_value("default")];

        assert!(!save(&mut store, "p1", &variables));
        assert_eq!(0, load(&store, "p1", &mut variables));
        assert!(!clear(&mut store, "p1"));
        assert_eq!("default", variables[0].value);
    }

    #[test]
    fn test_stored_prompt_ids() {
        let mut store = MemoryKeyValueStore::new();
        save(&mut store, "essay", &[Variable::new("topic").with_value("Rust")]);
        save(&mut store, "code review/v2", &[Variable::new("lang").with_value("Rust")]);
        store.set("prompt_meta_essay", "{}").unwrap();

        assert_eq!(vec!["code review/v2".to_string(), "essay".to_string()], stored_prompt_ids(&store));
        assert!(stored_prompt_ids(&BrokenStore).is_empty());
    }

    #[test]
    fn test_clear_removes_entry() {
        let mut store = MemoryKeyValueStore::new();
        save(&mut store, "p1", &[Variable::new("a").with_value("1")]);

        assert!(clear(&mut store, "p1"));
        assert_eq!(None, store.get("prompt_vars_p1").unwrap());
    }
}

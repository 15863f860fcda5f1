//! # Usage Tracker
//!
//! Use count and last-used timestamp per prompt, stored under
//! `prompt_meta_<id>` as `{"useCount": n, "lastUsed": "<rfc3339>"}`.

use crate::kv_store::KeyValueStore;
use crate::prompt::{Prompt, Usage};
use chrono::{DateTime, Utc};
use log::warn;

pub const META_KEY_PREFIX: &str = "prompt_meta_";

pub fn meta_key(prompt_id: &str) -> String {
    format!("{}{}", META_KEY_PREFIX, prompt_id)
}

/// Bumps the use count, stamps `now` and persists both.
pub fn record_use(store: &mut dyn KeyValueStore, prompt: &mut Prompt, now: DateTime<Utc>) -> Usage {
    prompt.usage.use_count += 1;
    prompt.usage.last_used = Some(now);

    match serde_json::to_string(&prompt.usage) {
        Ok(serialized) => {
            if let Err(e) = store.set(&meta_key(&prompt.id), &serialized) {
                warn!("Failed to save usage for prompt '{}': {}", prompt.id, e);
            }
        }
        Err(e) => warn!("Failed to serialize usage for prompt '{}': {}", prompt.id, e),
    }

    prompt.usage
}

/// Reads the stored usage for `prompt_id`, if any usable entry exists.
pub fn load_usage(store: &dyn KeyValueStore, prompt_id: &str) -> Option<Usage> {
    let raw = match store.get(&meta_key(prompt_id)) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Failed to read usage for prompt '{}': {}", prompt_id, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(usage) => Some(usage),
        Err(e) => {
            warn!("Ignoring corrupt usage for prompt '{}': {}", prompt_id, e);
            None
        }
    }
}

/// Overwrites `prompt.usage` with the stored usage when there is one.
pub fn hydrate(store: &dyn KeyValueStore, prompt: &mut Prompt) {
    if let Some(usage) = load_usage(store, &prompt.id) {
        prompt.usage = usage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::MemoryKeyValueStore;
    use chrono::TimeZone;

    fn prompt() -> Prompt {
        Prompt::new_simple("p1", "T", "C", "X", vec![])
    }

    #[test]
    fn test_record_use_increments_and_persists() {
        let mut store = MemoryKeyValueStore::new();
        let mut prompt = prompt();
        let first = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 3, 2, 8, 30, 0).unwrap();

        record_use(&mut store, &mut prompt, first);
        let usage = record_use(&mut store, &mut prompt, second);

        assert_eq!(2, usage.use_count);
        assert_eq!(Some(second), usage.last_used);
        assert_eq!(Some(usage), load_usage(&store, "p1"));

        let raw = store.get("prompt_meta_p1").unwrap().unwrap();
        assert!(raw.contains("\"useCount\":2"));
        assert!(raw.contains("\"lastUsed\":\"2025-03-02T08:30:00Z\""));
    }

    #[test]
    fn test_hydrate_restores_usage() {
        let mut store = MemoryKeyValueStore::new();
        store
            .set("prompt_meta_p1", "{\"useCount\":7,\"lastUsed\":\"2025-01-05T10:00:00Z\"}")
            .unwrap();

        let mut prompt = prompt();
        hydrate(&store, &mut prompt);

        assert_eq!(7, prompt.usage.use_count);
        assert!(prompt.usage.last_used.is_some());
    }

    #[test]
    fn test_corrupt_usage_is_ignored() {
        let mut store = MemoryKeyValueStore::new();
        store.set("prompt_meta_p1", "[1,2").unwrap();

        let mut prompt = prompt();
        prompt.usage.use_count = 3;
        hydrate(&store, &mut prompt);

        assert_eq!(3, prompt.usage.use_count);
    }

    #[test]
    fn test_missing_usage() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(None, load_usage(&store, "p1"));
    }
}

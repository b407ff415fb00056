//! Key-value persistence boundary.
//!
//! Hosts persist custom metrics and the scoring configuration as opaque JSON
//! strings. The engine defines the shapes; the store decides where they live.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{CustomMetric, MetricsError};

/// Storage key for the user's custom metric definitions.
pub const CUSTOM_METRICS_KEY: &str = "customMetrics";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, MetricsError>;
    fn set(&self, key: &str, value: String) -> Result<(), MetricsError>;
    fn remove(&self, key: &str) -> Result<(), MetricsError>;
}

/// Process-local store, safe to share between threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, MetricsError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), MetricsError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MetricsError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Read and decode a JSON value. Undecodable content is logged and treated
/// as absent so a corrupt entry never blocks the caller.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, MetricsError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable stored value for '{}': {}", key, e);
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), MetricsError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw)
}

pub fn load_custom_metrics(store: &dyn KeyValueStore) -> Result<Vec<CustomMetric>, MetricsError> {
    Ok(load_json(store, CUSTOM_METRICS_KEY)?.unwrap_or_default())
}

pub fn save_custom_metrics(
    store: &dyn KeyValueStore,
    metrics: &[CustomMetric],
) -> Result<(), MetricsError> {
    save_json(store, CUSTOM_METRICS_KEY, &metrics)
}

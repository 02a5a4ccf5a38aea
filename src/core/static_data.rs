use dashmap::DashMap;
use serde_json::Value;

/// JSON state persisted by the host between node invocations, keyed by node
/// id. Mirrors the host platform's "static workflow data": the batching
/// node keeps its cursor here, the dedup node its history.
///
/// One store spans one workflow; the host isolates workflows by giving each
/// its own instance.
#[derive(Debug, Default)]
pub struct StaticDataStore {
    entries: DashMap<String, Value>,
}

impl StaticDataStore {
    pub fn new() -> Self {
        StaticDataStore {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, node_id: &str) -> Option<Value> {
        self.entries.get(node_id).map(|entry| entry.value().clone())
    }

    pub fn set(&self, node_id: &str, state: Value) {
        self.entries.insert(node_id.to_string(), state);
    }

    pub fn remove(&self, node_id: &str) -> Option<Value> {
        self.entries.remove(node_id).map(|(_, state)| state)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

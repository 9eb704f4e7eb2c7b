use serde_json::Value;
use std::collections::BTreeMap;

/// Record store handle that updaters receive. Owned by the executor.
pub trait RecordStore {
    fn get(&self, id: &str) -> Option<&Value>;
    fn set(&mut self, id: &str, record: Value);
    fn delete(&mut self, id: &str) -> Option<Value>;
}

/// Flat in-memory store keyed by record id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    records: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &str) -> Option<&Value> {
        self.records.get(id)
    }

    fn set(&mut self, id: &str, record: Value) {
        self.records.insert(id.to_string(), record);
    }

    fn delete(&mut self, id: &str) -> Option<Value> {
        self.records.remove(id)
    }
}

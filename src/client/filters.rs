use std::collections::BTreeMap;

use serde_json::json;

/// Named filter values with declared parent/child dependencies. Setting a
/// parent clears every descendant before anything else can observe the change,
/// so a child-scoped request can never go out against a stale parent.
#[derive(Debug, Default)]
pub struct FilterSet {
    values: BTreeMap<String, String>,
    dependents: BTreeMap<String, Vec<String>>,
    revision: u64,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet::default()
    }

    pub fn declare(&mut self, name: &str) {
        self.values.entry(name.to_string()).or_default();
    }

    pub fn declare_dependent(&mut self, child: &str, parent: &str) {
        self.declare(parent);
        self.declare(child);
        self.dependents
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let current = self.values.entry(name.to_string()).or_default();
        if *current == value {
            return;
        }
        *current = value;
        self.clear_descendants(name);
        self.revision += 1;
    }

    fn clear_descendants(&mut self, name: &str) {
        let children = self.dependents.get(name).cloned().unwrap_or_default();
        for child in children {
            if let Some(v) = self.values.get_mut(&child) {
                v.clear();
            }
            self.clear_descendants(&child);
        }
    }

    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn is_set(&self, name: &str) -> bool {
        let v = self.get(name);
        !v.is_empty() && v != "all"
    }

    /// Bumped on every effective change; pages refetch when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Query object for the wire: empty and "all" values are no-filter and
    /// stay home.
    pub fn to_query(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (k, v) in &self.values {
            if v.is_empty() || v == "all" {
                continue;
            }
            out.insert(k.clone(), json!(v));
        }
        serde_json::Value::Object(out)
    }
}

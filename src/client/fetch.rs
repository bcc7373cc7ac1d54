use super::transport::{ApiCall, Transport};

/// Pulls the payload array out of whichever envelope shape arrived: a `data`
/// field, a field named after the resource, or the raw body itself. Anything
/// that is not an array becomes an empty one; malformed payloads never panic.
pub fn extract_collection(payload: &serde_json::Value, resource_key: &str) -> Vec<serde_json::Value> {
    let candidate = if payload.get("data").is_some() {
        payload.get("data")
    } else if payload.get(resource_key).is_some() {
        payload.get(resource_key)
    } else {
        Some(payload)
    };
    candidate
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// The collection a page currently displays. Replaced wholesale by each
/// successful fetch; a failed fetch keeps whatever was shown before (nothing,
/// on initial load).
#[derive(Debug, Default)]
pub struct CollectionState {
    pub records: Vec<serde_json::Value>,
    pub pending: bool,
    pub last_error: Option<String>,
    generation: u64,
    applied_generation: u64,
}

impl CollectionState {
    pub fn new() -> Self {
        CollectionState::default()
    }

    /// Marks a request in flight and returns its generation. Responses carry
    /// this back; anything older than the newest issued request is stale.
    pub fn begin_request(&mut self) -> u64 {
        self.pending = true;
        self.generation += 1;
        self.generation
    }

    pub fn apply_success(&mut self, generation: u64, records: Vec<serde_json::Value>) -> bool {
        if generation < self.generation || generation <= self.applied_generation {
            // A newer request is already out; drop the stale payload.
            return false;
        }
        self.records = records;
        self.last_error = None;
        self.applied_generation = generation;
        self.pending = false;
        true
    }

    pub fn apply_failure(&mut self, generation: u64, message: impl Into<String>) {
        if generation < self.generation {
            return;
        }
        self.last_error = Some(message.into());
        self.pending = false;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One fetch cycle: GET the resource, unwrap the envelope, replace the
/// collection. Errors land in `state.last_error` for the page to toast; the
/// request itself is never retried.
pub fn fetch_collection(
    transport: &mut dyn Transport,
    state: &mut CollectionState,
    path: &str,
    query: serde_json::Value,
    resource_key: &str,
) {
    let generation = state.begin_request();
    match transport.send(&ApiCall::get(path, query)) {
        Ok(resp) => {
            if resp.get("success").and_then(|v| v.as_bool()) == Some(false) {
                let msg = resp
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Operation failed")
                    .to_string();
                state.apply_failure(generation, msg);
            } else {
                state.apply_success(generation, extract_collection(&resp, resource_key));
            }
        }
        Err(e) => state.apply_failure(generation, format!("request failed: {}", e)),
    }
}

/// Reference lists (dropdown options) degrade to empty on failure instead of
/// blocking the page; only a log line records the problem. Records without a
/// usable id are dropped before they can be offered as options.
pub fn fetch_options(
    transport: &mut dyn Transport,
    path: &str,
    query: serde_json::Value,
    resource_key: &str,
) -> Vec<serde_json::Value> {
    match transport.send(&ApiCall::get(path, query)) {
        Ok(resp) => extract_collection(&resp, resource_key)
            .into_iter()
            .filter(|r| {
                r.get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| !s.is_empty())
                    .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            log::warn!("options fetch for {} failed: {}", path, e);
            Vec::new()
        }
    }
}

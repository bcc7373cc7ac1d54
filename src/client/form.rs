use std::collections::BTreeMap;

use serde_json::json;

use super::resources::{FieldKind, ResourceSpec};
use super::transport::{ApiCall, Transport};
use crate::api::validate::parse_date;

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    /// The record id lives in the mode, not in the editable fields, so an
    /// edit can never rewrite it.
    Edit { id: String },
}

/// The in-progress copy of a record being edited in a dialog. All values are
/// kept as strings (controlled inputs); `to_body` restores wire types.
#[derive(Debug)]
pub struct FormDraft {
    spec: &'static ResourceSpec,
    pub mode: FormMode,
    values: BTreeMap<String, String>,
}

#[derive(Debug, PartialEq)]
pub struct SubmitOutcome {
    pub closed: bool,
    pub refetch: bool,
    pub error: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct DeleteOutcome {
    /// Whether a request went out at all; declining the confirmation means no.
    pub requested: bool,
    pub refetch: bool,
    pub error: Option<String>,
}

impl FormDraft {
    pub fn create(spec: &'static ResourceSpec) -> Self {
        let mut values = BTreeMap::new();
        for f in spec.fields {
            values.insert(f.name.to_string(), f.default.to_string());
        }
        FormDraft {
            spec,
            mode: FormMode::Create,
            values,
        }
    }

    /// Seeds from an existing record; nullable server fields become empty
    /// strings so every input stays controlled.
    pub fn edit(spec: &'static ResourceSpec, record: &serde_json::Value) -> Self {
        let id = record
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let mut values = BTreeMap::new();
        for f in spec.fields {
            let text = match record.get(f.name) {
                None => f.default.to_string(),
                Some(v) if v.is_null() => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            values.insert(f.name.to_string(), text);
        }
        FormDraft {
            spec,
            mode: FormMode::Edit { id },
            values,
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// First violated rule, or None. Required checks run before format checks,
    /// mirroring what the inputs' own `required` semantics would catch.
    pub fn validate(&self) -> Option<String> {
        for f in self.spec.fields {
            let raw = self.get(f.name);
            let raw = raw.trim();
            if raw.is_empty() {
                if f.required {
                    return Some(format!("{} is required", f.label));
                }
                continue;
            }
            match f.kind {
                FieldKind::Text => {}
                FieldKind::Number => {
                    if raw.parse::<f64>().is_err() {
                        return Some(format!("{} must be a number", f.label));
                    }
                }
                FieldKind::Integer => {
                    if raw.parse::<i64>().is_err() {
                        return Some(format!("{} must be a whole number", f.label));
                    }
                }
                FieldKind::Date => {
                    if parse_date(raw).is_none() {
                        return Some(format!("{} must be YYYY-MM-DD", f.label));
                    }
                }
                FieldKind::Select(options) => {
                    if !options.contains(&raw) {
                        return Some(format!("{} has an invalid value", f.label));
                    }
                }
            }
        }
        None
    }

    /// Wire body: numeric-looking strings become numbers where the API
    /// expects them, empty optionals go out as null. The id is never here.
    pub fn to_body(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for f in self.spec.fields {
            let raw = self.get(f.name).trim().to_string();
            let value = if raw.is_empty() {
                serde_json::Value::Null
            } else {
                match f.kind {
                    FieldKind::Number => raw
                        .parse::<f64>()
                        .map(|n| json!(n))
                        .unwrap_or(serde_json::Value::String(raw)),
                    FieldKind::Integer => raw
                        .parse::<i64>()
                        .map(|n| json!(n))
                        .unwrap_or(serde_json::Value::String(raw)),
                    _ => serde_json::Value::String(raw),
                }
            };
            out.insert(f.name.to_string(), value);
        }
        serde_json::Value::Object(out)
    }

    /// POST on create, PUT on edit. Client-side validation failures never
    /// reach the network. A success closes the dialog and asks for a refetch;
    /// a failure leaves the dialog open with the server's message.
    pub fn submit(&self, transport: &mut dyn Transport) -> SubmitOutcome {
        if let Some(rule) = self.validate() {
            return SubmitOutcome {
                closed: false,
                refetch: false,
                error: Some(rule),
            };
        }

        let call = match &self.mode {
            FormMode::Create => ApiCall::with_body("POST", self.spec.base_path, self.to_body()),
            FormMode::Edit { id } => ApiCall::with_body(
                "PUT",
                format!("{}/{}", self.spec.base_path, id),
                self.to_body(),
            ),
        };

        match transport.send(&call) {
            Ok(resp) if resp.get("success").and_then(|v| v.as_bool()) == Some(true) => {
                SubmitOutcome {
                    closed: true,
                    refetch: true,
                    error: None,
                }
            }
            Ok(resp) => SubmitOutcome {
                closed: false,
                refetch: false,
                error: Some(
                    resp.get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Operation failed")
                        .to_string(),
                ),
            },
            Err(_) => SubmitOutcome {
                closed: false,
                refetch: false,
                error: Some("Operation failed".to_string()),
            },
        }
    }
}

/// Deletes skip the dialog and gate on an explicit confirmation instead.
/// There is no optimistic removal: the caller refetches only on success.
pub fn delete_record(
    spec: &'static ResourceSpec,
    id: &str,
    transport: &mut dyn Transport,
    confirm: impl FnOnce(&str) -> bool,
) -> DeleteOutcome {
    if !confirm("Are you sure you want to delete this record?") {
        return DeleteOutcome {
            requested: false,
            refetch: false,
            error: None,
        };
    }

    let call = ApiCall {
        method: "DELETE".to_string(),
        path: format!("{}/{}", spec.base_path, id),
        query: serde_json::Value::Null,
        body: serde_json::Value::Null,
    };
    match transport.send(&call) {
        Ok(resp) if resp.get("success").and_then(|v| v.as_bool()) == Some(true) => DeleteOutcome {
            requested: true,
            refetch: true,
            error: None,
        },
        Ok(resp) => DeleteOutcome {
            requested: true,
            refetch: false,
            error: Some(
                resp.get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Operation failed")
                    .to_string(),
            ),
        },
        Err(_) => DeleteOutcome {
            requested: true,
            refetch: false,
            error: Some("Operation failed".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::resources::{FEES, NOTICES};

    #[derive(Default)]
    struct RecordingTransport {
        calls: Vec<ApiCall>,
        response: Option<serde_json::Value>,
    }

    impl RecordingTransport {
        fn answering(response: serde_json::Value) -> Self {
            RecordingTransport {
                calls: Vec::new(),
                response: Some(response),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, call: &ApiCall) -> anyhow::Result<serde_json::Value> {
            self.calls.push(call.clone());
            Ok(self
                .response
                .clone()
                .unwrap_or_else(|| json!({ "success": true, "data": {} })))
        }
    }

    #[test]
    fn empty_required_field_never_reaches_network() {
        let mut t = RecordingTransport::default();
        let mut draft = FormDraft::create(&NOTICES);
        draft.set("title", "");
        let outcome = draft.submit(&mut t);
        assert_eq!(outcome.error.as_deref(), Some("Title is required"));
        assert!(!outcome.closed);
        assert!(t.calls.is_empty());
    }

    #[test]
    fn edit_seeds_nulls_as_empty_and_omits_id_from_body() {
        let record = json!({
            "id": "n42",
            "title": "Sports day",
            "body": null,
            "publishDate": "2025-03-01",
            "audience": "all",
        });
        let draft = FormDraft::edit(&NOTICES, &record);
        assert_eq!(draft.get("body"), "");

        let mut t = RecordingTransport::answering(json!({ "success": true, "data": {} }));
        let outcome = draft.submit(&mut t);
        assert!(outcome.closed);
        assert!(outcome.refetch);
        assert_eq!(t.calls.len(), 1);
        assert_eq!(t.calls[0].method, "PUT");
        assert_eq!(t.calls[0].path, "/api/events/notices/n42");
        assert!(t.calls[0].body.get("id").is_none());
        assert_eq!(t.calls[0].body["body"], serde_json::Value::Null);
    }

    #[test]
    fn numeric_strings_are_coerced_in_body() {
        let mut draft = FormDraft::create(&FEES);
        draft.set("studentId", "s1");
        draft.set("title", "Term 1 tuition");
        draft.set("amount", "1250.50");
        draft.set("dueDate", "2025-04-15");
        let body = draft.to_body();
        assert_eq!(body["amount"], json!(1250.5));
    }

    #[test]
    fn resubmitting_unchanged_draft_sends_identical_bodies() {
        let mut t = RecordingTransport::answering(json!({ "success": true, "data": {} }));
        let record = json!({ "id": "n1", "title": "Exam week", "body": "rooms TBD",
                             "publishDate": "2025-05-01", "audience": "students" });
        let draft = FormDraft::edit(&NOTICES, &record);
        let first = draft.submit(&mut t);
        let second = draft.submit(&mut t);
        assert!(first.closed && second.closed);
        assert_eq!(t.calls.len(), 2);
        assert_eq!(t.calls[0], t.calls[1]);
    }

    #[test]
    fn server_error_keeps_dialog_open_with_verbatim_message() {
        let mut t = RecordingTransport::answering(json!({
            "success": false, "status": 400,
            "error": "a notice with this title already exists",
        }));
        let mut draft = FormDraft::create(&NOTICES);
        draft.set("title", "Sports day");
        let outcome = draft.submit(&mut t);
        assert!(!outcome.closed);
        assert!(!outcome.refetch);
        assert_eq!(
            outcome.error.as_deref(),
            Some("a notice with this title already exists")
        );
    }

    #[test]
    fn declining_confirmation_sends_nothing() {
        let mut t = RecordingTransport::default();
        let outcome = delete_record(&NOTICES, "n1", &mut t, |_| false);
        assert!(!outcome.requested);
        assert!(t.calls.is_empty());
    }

    #[test]
    fn confirmed_delete_failure_does_not_request_refetch() {
        let mut t = RecordingTransport::answering(json!({
            "success": false, "status": 404, "error": "notice not found",
        }));
        let outcome = delete_record(&NOTICES, "42", &mut t, |_| true);
        assert!(outcome.requested);
        assert!(!outcome.refetch);
        assert_eq!(outcome.error.as_deref(), Some("notice not found"));
        assert_eq!(t.calls[0].method, "DELETE");
        assert_eq!(t.calls[0].path, "/api/events/notices/42");
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Done,
    Failed,
}

impl TaskStatus {
    /// Unknown or missing statuses keep the task in polling.
    pub fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("done") => TaskStatus::Done,
            Some("error") => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// Body of `GET /api/result/{task_id}`: `status`, `task_id`, and whatever
/// payload fields the backend attached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TaskResult {
    fields: Map<String, Value>,
}

impl TaskResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ApiError::Parse(format!("expected a JSON object, got {other}"))),
        }
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_wire(self.fields.get("status").and_then(Value::as_str))
    }

    pub fn raw_status(&self) -> Option<&str> {
        self.fields.get("status").and_then(Value::as_str)
    }

    /// The payload shown to the user on success: everything except the
    /// bookkeeping fields.
    pub fn payload(&self) -> Value {
        let mut cleaned = self.fields.clone();
        cleaned.shift_remove("task_id");
        cleaned.shift_remove("status");
        Value::Object(cleaned)
    }

    /// The `error` field when it carries something, otherwise the whole body.
    pub fn error_report(&self) -> Value {
        match self.fields.get("error") {
            Some(error) if is_truthy(error) => error.clone(),
            _ => Value::Object(self.fields.clone()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The two backend calls the assistant controller depends on.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Submit a question, returning the id of the created task.
    async fn create_task(&self, question: &str) -> Result<String, ApiError>;

    async fn get_task_result(&self, task_id: &str) -> Result<TaskResult, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(value: Value) -> TaskResult {
        TaskResult::from_value(value).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(result(json!({"status": "done"})).status(), TaskStatus::Done);
        assert_eq!(result(json!({"status": "error"})).status(), TaskStatus::Failed);
        assert_eq!(result(json!({"status": "pending"})).status(), TaskStatus::Pending);
        assert_eq!(result(json!({"status": "queued"})).status(), TaskStatus::Pending);
        assert_eq!(result(json!({})).status(), TaskStatus::Pending);
        assert!(TaskStatus::Done.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_payload_strips_bookkeeping_and_keeps_order() {
        let r = result(json!({"task_id": "t1", "zeta": 1, "status": "done", "alpha": [2]}));
        let payload = r.payload();
        assert_eq!(payload, json!({"zeta": 1, "alpha": [2]}));
        let keys: Vec<&String> = payload.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_error_report_prefers_error_field() {
        let r = result(json!({"status": "error", "error": "bad question"}));
        assert_eq!(r.error_report(), json!("bad question"));
    }

    #[test]
    fn test_error_report_falls_back_to_whole_body() {
        let r = result(json!({"status": "error", "task_id": "t9"}));
        assert_eq!(r.error_report(), json!({"status": "error", "task_id": "t9"}));

        let r = result(json!({"status": "error", "error": ""}));
        assert_eq!(r.error_report(), json!({"status": "error", "error": ""}));

        let r = result(json!({"status": "error", "error": null}));
        assert_eq!(r.error_report(), json!({"status": "error", "error": null}));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        assert!(matches!(TaskResult::from_value(json!([1, 2])), Err(ApiError::Parse(_))));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AskResponse {
    pub task_id: String,
}

#[derive(Deserialize)]
pub(crate) struct ProjectsResponse {
    pub projects: Vec<String>,
}

/// Executions per day for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPoint {
    pub date: String,
    pub execution_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassFailPoint {
    pub date: String,
    pub passed: u64,
    pub failed: u64,
    /// Percentage, 0 to 100
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPoint {
    pub date: String,
    pub avg_duration_seconds: f64,
}

/// One of the latest executed test cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub status: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Per-project rollup from `/dashboard/summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub project: String,
    pub executions: u64,
    pub avg_duration: f64,
    /// Percentage, 0 to 100
    pub pass_rate: f64,
    #[serde(default)]
    pub date: Option<String>,
}

pub mod types;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::assistant::{TaskBackend, TaskResult};
use crate::dashboard::DateRange;
use crate::error::ApiError;
use types::{AskRequest, AskResponse, ProjectsResponse};

pub use types::{DurationPoint, ExecutionPoint, ExecutionStats, PassFailPoint, TestCase};

/// Client for the test-analytics backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ask(&self, question: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/ask", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { question })
            .send()
            .await?;

        let ask_response: AskResponse = check(response).await?.json().await?;
        Ok(ask_response.task_id)
    }

    pub async fn task_result(&self, task_id: &str) -> Result<TaskResult, ApiError> {
        let url = format!("{}/api/result/{}", self.base_url, task_id);

        let response = self.client.get(&url).send().await?;
        let body: Value = check(response).await?.json().await?;
        TaskResult::from_value(body)
    }

    pub async fn projects(&self) -> Result<Vec<String>, ApiError> {
        let response: ProjectsResponse = self.get_json("/api/dashboard/projects", &[]).await?;
        Ok(response.projects)
    }

    pub async fn executions_per_project(
        &self,
        project: &str,
        range: &DateRange,
    ) -> Result<Vec<ExecutionPoint>, ApiError> {
        self.get_dashboard("/api/dashboard/executions-per-project", project, range)
            .await
    }

    pub async fn pass_fail_trend(
        &self,
        project: &str,
        range: &DateRange,
    ) -> Result<Vec<PassFailPoint>, ApiError> {
        self.get_dashboard("/api/dashboard/pass-fail-trend", project, range)
            .await
    }

    pub async fn average_duration_trend(
        &self,
        project: &str,
        range: &DateRange,
    ) -> Result<Vec<DurationPoint>, ApiError> {
        self.get_dashboard("/api/dashboard/average-execution-durations-trend", project, range)
            .await
    }

    pub async fn test_cases(
        &self,
        project: &str,
        range: &DateRange,
    ) -> Result<Vec<TestCase>, ApiError> {
        self.get_dashboard("/api/dashboard/test-cases", project, range)
            .await
    }

    /// Cross-project rollup for the range.
    pub async fn summary(&self, range: &DateRange) -> Result<Vec<ExecutionStats>, ApiError> {
        let from_date = range.from_param();
        let to_date = range.to_param();
        self.get_json(
            "/dashboard/summary",
            &[("from_date", from_date.as_str()), ("to_date", to_date.as_str())],
        )
        .await
    }

    async fn get_dashboard<T: DeserializeOwned>(
        &self,
        path: &str,
        project: &str,
        range: &DateRange,
    ) -> Result<T, ApiError> {
        let from_date = range.from_param();
        let to_date = range.to_param();
        self.get_json(
            path,
            &[
                ("project_name", project),
                ("from_date", from_date.as_str()),
                ("to_date", to_date.as_str()),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self.client.get(&url).query(query).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn create_task(&self, question: &str) -> Result<String, ApiError> {
        self.ask(question).await
    }

    async fn get_task_result(&self, task_id: &str) -> Result<TaskResult, ApiError> {
        self.task_result(task_id).await
    }
}

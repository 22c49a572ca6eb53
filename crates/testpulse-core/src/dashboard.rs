//! Dashboard data: the date range being viewed and the four series fetched
//! for the selected project.

use chrono::{Duration, Local, NaiveDate};

use crate::api::{ApiClient, DurationPoint, ExecutionPoint, PassFailPoint, TestCase};
use crate::error::ApiError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// The `days` days before `end`, plus `end` itself. Clamped to the
    /// earliest representable date.
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        let from = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(from, end)
    }

    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Local::now().date_naive(), days)
    }

    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days()
    }

    /// Move the whole window by its own length; negative steps go back.
    /// A window that would leave the representable calendar stays put.
    pub fn shift(&self, steps: i64) -> Self {
        let shifted = self
            .len_days()
            .max(1)
            .checked_mul(steps)
            .and_then(Duration::try_days)
            .and_then(|span| {
                Some((self.from.checked_add_signed(span)?, self.to.checked_add_signed(span)?))
            });
        match shifted {
            Some((from, to)) => Self::new(from, to),
            None => *self,
        }
    }

    /// Grow (or shrink, with a negative value) the window by moving `from`.
    /// The window never gets shorter than one day.
    pub fn widen(&self, days: i64) -> Self {
        let len = self.len_days().saturating_add(days).max(1);
        let from = Duration::try_days(len)
            .and_then(|span| self.to.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        Self::new(from, self.to)
    }

    pub fn from_param(&self) -> String {
        self.from.format(DATE_FORMAT).to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format(DATE_FORMAT).to_string()
    }

    pub fn label(&self) -> String {
        format!("{} → {}", self.from_param(), self.to_param())
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::last_days(30)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
    Other,
}

impl TestOutcome {
    pub fn classify(status: &str) -> Self {
        match status {
            "PASSED" => TestOutcome::Passed,
            "FAILED" => TestOutcome::Failed,
            "SKIPPED" => TestOutcome::Skipped,
            _ => TestOutcome::Other,
        }
    }
}

impl TestCase {
    pub fn outcome(&self) -> TestOutcome {
        TestOutcome::classify(&self.status)
    }

    pub fn duration_label(&self) -> String {
        format!("{:.2}", self.duration_seconds)
    }
}

/// Everything the dashboard shows for one project and range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub executions: Vec<ExecutionPoint>,
    pub pass_fail: Vec<PassFailPoint>,
    pub durations: Vec<DurationPoint>,
    pub test_cases: Vec<TestCase>,
}

impl DashboardData {
    /// Fetch all four series concurrently; any failure fails the whole load.
    pub async fn fetch(
        client: &ApiClient,
        project: &str,
        range: &DateRange,
    ) -> Result<Self, ApiError> {
        let (executions, pass_fail, durations, test_cases) = tokio::try_join!(
            client.executions_per_project(project, range),
            client.pass_fail_trend(project, range),
            client.average_duration_trend(project, range),
            client.test_cases(project, range),
        )?;

        Ok(Self {
            executions,
            pass_fail,
            durations,
            test_cases,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
            && self.pass_fail.is_empty()
            && self.durations.is_empty()
            && self.test_cases.is_empty()
    }
}

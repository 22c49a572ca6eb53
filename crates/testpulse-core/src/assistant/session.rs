//! Assistant session controller.
//!
//! The session never performs I/O itself. Operations mutate the message log
//! and return an [`Effect`] describing the backend work to run next; the
//! outcome of that work comes back through [`AssistantSession::handle`]. All
//! calls happen on the caller's event loop, so the placeholder is always in
//! the log before the create call can possibly complete.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::message::{
    ChatMessage, SessionState, BACKEND_UNREACHABLE_TEXT, FETCH_FAILED_TEXT, TASK_ERROR_PREFIX,
};
use super::task::{TaskResult, TaskStatus};
use crate::error::ApiError;

pub const INITIAL_POLL_DELAY: Duration = Duration::from_millis(1000);
pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Backend work requested by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateTask { question: String },
    Poll { task_id: String, delay: Duration },
}

/// Outcome of an [`Effect`], fed back into the session.
#[derive(Debug)]
pub enum AssistantEvent {
    TaskCreated(Result<String, ApiError>),
    PollCompleted {
        task_id: String,
        outcome: Result<TaskResult, ApiError>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Polling { task_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            initial_delay: INITIAL_POLL_DELAY,
            interval: POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssistantSession {
    state: SessionState,
    phase: Phase,
    timing: PollTiming,
    /// Pending question text, cleared on a successful submit.
    pub input: String,
}

impl AssistantSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Submit whatever is in the input buffer.
    pub fn submit_input(&mut self) -> Option<Effect> {
        let question = self.input.clone();
        self.submit(&question)
    }

    /// Append the question and a placeholder, then ask for a task to be
    /// created. Blank questions are ignored, as is anything sent while a task
    /// is outstanding.
    pub fn submit(&mut self, question: &str) -> Option<Effect> {
        if question.trim().is_empty() {
            return None;
        }
        if self.state.busy {
            debug!("Ignoring submit while a task is outstanding");
            return None;
        }

        self.state.messages.push(ChatMessage::user(question));
        self.state.messages.push(ChatMessage::placeholder());
        self.state.busy = true;
        self.input.clear();
        self.phase = Phase::Submitting;

        Some(Effect::CreateTask {
            question: question.to_string(),
        })
    }

    /// Empty the log. An outstanding task keeps running; its result will be
    /// appended since no placeholder is left to replace.
    pub fn clear(&mut self) {
        self.state.messages.clear();
    }

    pub fn handle(&mut self, event: AssistantEvent) -> Option<Effect> {
        match event {
            AssistantEvent::TaskCreated(outcome) => self.on_task_created(outcome),
            AssistantEvent::PollCompleted { task_id, outcome } => {
                self.on_poll_result(&task_id, outcome)
            }
        }
    }

    pub fn on_task_created(&mut self, outcome: Result<String, ApiError>) -> Option<Effect> {
        if self.phase != Phase::Submitting {
            warn!("Task creation outcome arrived outside of submission, ignoring");
            return None;
        }

        match outcome {
            Ok(task_id) => {
                info!(task_id = %task_id, "Assistant task created");
                self.phase = Phase::Polling {
                    task_id: task_id.clone(),
                };
                Some(Effect::Poll {
                    task_id,
                    delay: self.timing.initial_delay,
                })
            }
            Err(e) => {
                warn!("Assistant task submission failed: {e}");
                // The placeholder stays where it is; the error goes after it.
                self.state.messages.push(ChatMessage::bot(BACKEND_UNREACHABLE_TEXT));
                self.finish();
                None
            }
        }
    }

    pub fn on_poll_result(
        &mut self,
        task_id: &str,
        outcome: Result<TaskResult, ApiError>,
    ) -> Option<Effect> {
        match &self.phase {
            Phase::Polling { task_id: current } if current == task_id => {}
            _ => {
                warn!(task_id = %task_id, "Poll result for a task that is not being polled, ignoring");
                return None;
            }
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(task_id = %task_id, "Failed to fetch task result: {e}");
                self.state.resolve_placeholder(ChatMessage::bot(FETCH_FAILED_TEXT));
                self.finish();
                return None;
            }
        };

        match result.status() {
            TaskStatus::Pending => {
                debug!(task_id = %task_id, status = ?result.raw_status(), "Task still pending");
                Some(Effect::Poll {
                    task_id: task_id.to_string(),
                    delay: self.timing.interval,
                })
            }
            TaskStatus::Done => {
                info!(task_id = %task_id, "Assistant task done");
                let text = pretty(&result.payload());
                self.state.resolve_placeholder(ChatMessage::bot(text));
                self.finish();
                None
            }
            TaskStatus::Failed => {
                warn!(task_id = %task_id, "Assistant task reported an error");
                let text = format!("{TASK_ERROR_PREFIX}{}", pretty(&result.error_report()));
                self.state.resolve_placeholder(ChatMessage::bot(text));
                self.finish();
                None
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Idle;
        self.state.busy = false;
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

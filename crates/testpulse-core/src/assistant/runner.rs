//! Executes session effects on tokio and reports outcomes as events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::session::{AssistantEvent, AssistantSession, Effect};
use super::task::TaskBackend;

pub struct TaskRunner {
    backend: Arc<dyn TaskBackend>,
    events: mpsc::UnboundedSender<AssistantEvent>,
    job: Option<JoinHandle<()>>,
}

impl TaskRunner {
    pub fn new(backend: Arc<dyn TaskBackend>, events: mpsc::UnboundedSender<AssistantEvent>) -> Self {
        Self { backend, events, job: None }
    }

    /// Runner plus the receiving end of its event channel.
    pub fn channel(backend: Arc<dyn TaskBackend>) -> (Self, mpsc::UnboundedReceiver<AssistantEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(backend, tx), rx)
    }

    pub fn dispatch(&mut self, effect: Effect) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        let job = match effect {
            Effect::CreateTask { question } => tokio::spawn(async move {
                let outcome = backend.create_task(&question).await;
                let _ = events.send(AssistantEvent::TaskCreated(outcome));
            }),
            Effect::Poll { task_id, delay } => tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                debug!(task_id = %task_id, "Polling task result");
                let outcome = backend.get_task_result(&task_id).await;
                let _ = events.send(AssistantEvent::PollCompleted { task_id, outcome });
            }),
        };

        // The session only ever has one effect in flight, so any previous job
        // has already delivered its event.
        self.job = Some(job);
    }

    pub fn is_running(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Stop whatever is in flight. Outstanding polling ends here.
    pub fn shutdown(&mut self) {
        if let Some(job) = self.job.take() {
            job.abort();
        }
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Submit `question` and drive the session until the task is resolved.
/// Returns the session's final bot message, if any.
pub async fn ask(
    session: &mut AssistantSession,
    runner: &mut TaskRunner,
    events: &mut mpsc::UnboundedReceiver<AssistantEvent>,
    question: &str,
) -> Option<String> {
    let effect = session.submit(question)?;
    runner.dispatch(effect);
    run_to_completion(session, runner, events).await;
    session.messages().last().map(|m| m.text.clone())
}

pub async fn run_to_completion(
    session: &mut AssistantSession,
    runner: &mut TaskRunner,
    events: &mut mpsc::UnboundedReceiver<AssistantEvent>,
) {
    while session.is_busy() {
        let Some(event) = events.recv().await else {
            break;
        };
        if let Some(effect) = session.handle(event) {
            runner.dispatch(effect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::message::{ChatMessage, BACKEND_UNREACHABLE_TEXT};
    use crate::assistant::task::TaskResult;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Backend with scripted poll responses; `None` simulates a network failure.
    struct ScriptedBackend {
        create_ok: bool,
        polls: Mutex<VecDeque<Option<Value>>>,
        poll_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedBackend {
        fn new(create_ok: bool, polls: Vec<Option<Value>>) -> Arc<Self> {
            Arc::new(Self {
                create_ok,
                polls: Mutex::new(polls.into()),
                poll_times: Mutex::new(Vec::new()),
            })
        }

        fn poll_times(&self) -> Vec<Instant> {
            self.poll_times.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskBackend for ScriptedBackend {
        async fn create_task(&self, _question: &str) -> Result<String, ApiError> {
            if self.create_ok {
                Ok("abc".to_string())
            } else {
                Err(ApiError::Network("connection refused".into()))
            }
        }

        async fn get_task_result(&self, _task_id: &str) -> Result<TaskResult, ApiError> {
            self.poll_times.lock().unwrap().push(Instant::now());
            let next = self.polls.lock().unwrap().pop_front().flatten();
            match next {
                Some(value) => TaskResult::from_value(value),
                None => Err(ApiError::Network("reset".into())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_after_initial_delay_then_interval() {
        let backend = ScriptedBackend::new(
            true,
            vec![
                Some(json!({"task_id": "abc", "status": "pending"})),
                Some(json!({"task_id": "abc", "status": "pending"})),
                Some(json!({"task_id": "abc", "status": "done", "failures": 3})),
            ],
        );
        let (mut runner, mut events) = TaskRunner::channel(backend.clone());
        let mut session = AssistantSession::new();
        let start = Instant::now();

        let answer = ask(&mut session, &mut runner, &mut events, "What failed yesterday?").await;

        let offsets: Vec<Duration> = backend.poll_times().iter().map(|t| *t - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(4000),
                Duration::from_millis(7000),
            ]
        );
        assert_eq!(answer.as_deref(), Some("{\n  \"failures\": 3\n}"));
        assert!(!session.is_busy());
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_never_polls() {
        let backend = ScriptedBackend::new(false, vec![]);
        let (mut runner, mut events) = TaskRunner::channel(backend.clone());
        let mut session = AssistantSession::new();

        let answer = ask(&mut session, &mut runner, &mut events, "anything").await;

        assert_eq!(answer.as_deref(), Some(BACKEND_UNREACHABLE_TEXT));
        assert_eq!(session.messages().len(), 3);
        assert!(backend.poll_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_ends_polling() {
        let backend = ScriptedBackend::new(true, vec![Some(json!({"status": "pending"})), None]);
        let (mut runner, mut events) = TaskRunner::channel(backend.clone());
        let mut session = AssistantSession::new();

        ask(&mut session, &mut runner, &mut events, "q").await;

        assert_eq!(backend.poll_times().len(), 2);
        assert_eq!(
            session.messages().last(),
            Some(&ChatMessage::bot("❌ Failed to fetch result."))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_question_does_nothing() {
        let backend = ScriptedBackend::new(true, vec![]);
        let (mut runner, mut events) = TaskRunner::channel(backend);
        let mut session = AssistantSession::new();

        assert_eq!(ask(&mut session, &mut runner, &mut events, "   ").await, None);
        assert!(session.messages().is_empty());
        assert!(!runner.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_scheduled_poll() {
        let backend = ScriptedBackend::new(true, vec![Some(json!({"status": "done"}))]);
        let (mut runner, mut events) = TaskRunner::channel(backend.clone());

        runner.dispatch(Effect::Poll {
            task_id: "abc".into(),
            delay: Duration::from_millis(3000),
        });
        assert!(runner.is_running());
        runner.shutdown();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(backend.poll_times().is_empty());
        assert!(events.try_recv().is_err());
    }
}

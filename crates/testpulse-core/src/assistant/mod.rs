pub mod message;
pub mod runner;
pub mod session;
pub mod task;

pub use message::{ChatMessage, Origin, SessionState, PLACEHOLDER_TEXT};
pub use runner::TaskRunner;
pub use session::{AssistantEvent, AssistantSession, Effect, Phase, PollTiming};
pub use task::{TaskBackend, TaskResult, TaskStatus};

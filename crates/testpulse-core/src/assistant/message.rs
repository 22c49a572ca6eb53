/// Sentinel text of the "awaiting result" bot message.
pub const PLACEHOLDER_TEXT: &str = "🤔 Thinking...";
pub const BACKEND_UNREACHABLE_TEXT: &str = "🚨 Failed to reach backend.";
pub const FETCH_FAILED_TEXT: &str = "❌ Failed to fetch result.";
pub const TASK_ERROR_PREFIX: &str = "❌ Error: ";

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Bot,
}

/// A chat message in the assistant conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub origin: Origin,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { origin: Origin::User, text: text.into() }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { origin: Origin::Bot, text: text.into() }
    }

    pub fn placeholder() -> Self {
        Self::bot(PLACEHOLDER_TEXT)
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == Origin::Bot && self.text == PLACEHOLDER_TEXT
    }

    /// Bot message reporting that the task could not be submitted, fetched or
    /// completed.
    pub fn is_failure(&self) -> bool {
        self.origin == Origin::Bot
            && (self.text == BACKEND_UNREACHABLE_TEXT
                || self.text == FETCH_FAILED_TEXT
                || self.text.starts_with(TASK_ERROR_PREFIX))
    }
}

/// Message log plus the busy flag of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub busy: bool,
}

impl SessionState {
    /// Replace the trailing placeholder with `message`, or append it when the
    /// log no longer ends in one (e.g. after a clear).
    pub fn resolve_placeholder(&mut self, message: ChatMessage) {
        match self.messages.last_mut() {
            Some(last) if last.is_placeholder() => *last = message,
            _ => self.messages.push(message),
        }
    }
}

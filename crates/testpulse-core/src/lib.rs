pub mod api;
pub mod assistant;
pub mod config;
pub mod dashboard;
pub mod error;

// Re-export main types for convenience
pub use api::ApiClient;
pub use assistant::{
    AssistantEvent, AssistantSession, ChatMessage, Effect, Origin, SessionState, TaskBackend,
    TaskRunner,
};
pub use config::Config;
pub use dashboard::{DashboardData, DateRange};
pub use error::ApiError;

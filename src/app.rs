use std::sync::Arc;

use ratatui::widgets::{ListState, TableState};
use testpulse_core::assistant::PollTiming;
use testpulse_core::{
    ApiClient, ApiError, AssistantEvent, AssistantSession, Config, DashboardData, DateRange,
    TaskRunner,
};
use tokio::sync::mpsc;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Dashboard,
    Assistant,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,
    pub show_assistant: bool,
    pub status_message: Option<String>,

    // Dashboard state
    pub projects: Vec<String>,
    pub selected_project: Option<String>,
    pub range: DateRange,
    pub data: DashboardData,
    pub loading: bool,
    pub test_cases_state: TableState,
    /// Bumped on every reload so late responses for an old selection are dropped.
    pub load_generation: u64,

    // Project picker state
    pub show_project_picker: bool,
    pub project_picker_state: ListState,

    // Assistant state
    pub session: AssistantSession,
    pub input_cursor: usize, // cursor position in session.input, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Services
    pub config: Config,
    pub api: ApiClient,
    pub runner: TaskRunner,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    /// Build the app and the receiver the task runner reports on. Nothing is
    /// fetched until `request_projects` is called.
    pub fn new(
        config: Config,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<AssistantEvent>) {
        let api = ApiClient::new(&config.api_base);
        let (runner, assistant_rx) = TaskRunner::channel(Arc::new(api.clone()));

        let session = AssistantSession::new().with_timing(PollTiming {
            initial_delay: config.initial_poll_delay(),
            interval: config.poll_interval(),
        });

        let app = Self {
            should_quit: false,
            focus: Focus::Dashboard,
            show_assistant: false,
            status_message: None,

            projects: Vec::new(),
            selected_project: None,
            range: DateRange::last_days(config.range_days),
            data: DashboardData::default(),
            loading: false,
            test_cases_state: TableState::default(),
            load_generation: 0,

            show_project_picker: false,
            project_picker_state: ListState::default(),

            session,
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            config,
            api,
            runner,
            events,
        };

        (app, assistant_rx)
    }

    // Dashboard loading
    pub fn request_projects(&mut self) {
        let api = self.api.clone();
        let events = self.events.clone();
        self.loading = true;
        tokio::spawn(async move {
            let result = api.projects().await;
            let _ = events.send(AppEvent::Projects(result));
        });
    }

    pub fn on_projects(&mut self, result: Result<Vec<String>, ApiError>) {
        match result {
            Ok(projects) => {
                tracing::info!("Loaded {} projects", projects.len());
                let preferred = self
                    .config
                    .default_project
                    .as_ref()
                    .filter(|p| projects.contains(p))
                    .cloned();
                self.selected_project = preferred.or_else(|| projects.first().cloned());
                self.projects = projects;
                self.reload();
            }
            Err(e) => {
                tracing::warn!("Failed to load projects: {e}");
                self.loading = false;
                self.status_message = Some(format!("Could not load projects: {e}"));
            }
        }
    }

    /// Refetch all dashboard series for the current project and range.
    pub fn reload(&mut self) {
        let Some(project) = self.selected_project.clone() else {
            self.loading = false;
            return;
        };

        self.load_generation += 1;
        self.loading = true;

        let generation = self.load_generation;
        let range = self.range;
        let api = self.api.clone();
        let events = self.events.clone();
        tracing::debug!(project = %project, range = %range.label(), "Fetching dashboard");

        tokio::spawn(async move {
            let result = DashboardData::fetch(&api, &project, &range).await;
            let _ = events.send(AppEvent::Dashboard { generation, result });
        });
    }

    pub fn on_dashboard(&mut self, generation: u64, result: Result<DashboardData, ApiError>) {
        if generation != self.load_generation {
            tracing::debug!(generation, "Dropping stale dashboard response");
            return;
        }

        self.loading = false;
        match result {
            Ok(data) => {
                self.data = data;
                self.status_message = None;
                self.test_cases_state.select(if self.data.test_cases.is_empty() {
                    None
                } else {
                    Some(0)
                });
            }
            Err(e) => {
                // Keep showing whatever was loaded before
                tracing::error!("Error fetching dashboard data: {e}");
                self.status_message = Some(format!("Dashboard fetch failed: {e}"));
            }
        }
    }

    pub fn shift_range(&mut self, steps: i64) {
        self.range = self.range.shift(steps);
        self.reload();
    }

    pub fn widen_range(&mut self, days: i64) {
        self.range = self.range.widen(days);
        self.reload();
    }

    pub fn test_cases_nav_down(&mut self) {
        let len = self.data.test_cases.len();
        if len > 0 {
            let i = self.test_cases_state.selected().unwrap_or(0);
            self.test_cases_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn test_cases_nav_up(&mut self) {
        let i = self.test_cases_state.selected().unwrap_or(0);
        self.test_cases_state.select(Some(i.saturating_sub(1)));
    }

    // Project picker methods
    pub fn open_project_picker(&mut self) {
        if self.projects.is_empty() {
            return;
        }
        let current = self
            .selected_project
            .as_ref()
            .and_then(|p| self.projects.iter().position(|x| x == p))
            .unwrap_or(0);
        self.project_picker_state.select(Some(current));
        self.show_project_picker = true;
    }

    pub fn project_picker_nav_down(&mut self) {
        let len = self.projects.len();
        if len > 0 {
            let i = self.project_picker_state.selected().unwrap_or(0);
            self.project_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn project_picker_nav_up(&mut self) {
        let i = self.project_picker_state.selected().unwrap_or(0);
        self.project_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_project(&mut self) {
        if let Some(i) = self.project_picker_state.selected() {
            if let Some(project) = self.projects.get(i).cloned() {
                self.show_project_picker = false;
                if self.selected_project.as_ref() != Some(&project) {
                    if let Err(e) = Config::save_default_project(&project) {
                        tracing::warn!("Could not remember default project: {e}");
                    }
                    self.config.default_project = Some(project.clone());
                    self.selected_project = Some(project);
                    self.reload();
                }
            }
        }
    }

    // Assistant
    pub fn open_assistant(&mut self) {
        self.show_assistant = true;
        self.focus = Focus::Assistant;
    }

    pub fn close_assistant(&mut self) {
        self.show_assistant = false;
        self.focus = Focus::Dashboard;
    }

    pub fn send_question(&mut self) {
        if let Some(effect) = self.session.submit_input() {
            self.input_cursor = 0;
            self.runner.dispatch(effect);
            self.scroll_chat_to_bottom();
        }
    }

    pub fn clear_chat(&mut self) {
        self.session.clear();
        self.chat_scroll = 0;
    }

    pub fn on_assistant_event(&mut self, event: AssistantEvent) {
        if let Some(effect) = self.session.handle(event) {
            self.runner.dispatch(effect);
        }
        self.scroll_chat_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(1); // Origin line ("You:" or "Bot:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = char_count.div_ceil(wrap_width).max(1);
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn shutdown(&mut self) {
        self.runner.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testpulse_core::ChatMessage;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = Config {
            // Nothing listens here; spawned requests fail fast
            api_base: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        App::new(config, tx).0
    }

    #[tokio::test]
    async fn test_projects_select_first_without_default() {
        let mut app = test_app();
        app.on_projects(Ok(vec!["checkout".into(), "payments".into()]));

        assert_eq!(app.selected_project.as_deref(), Some("checkout"));
        assert!(app.loading);
        assert_eq!(app.load_generation, 1);
    }

    #[tokio::test]
    async fn test_projects_prefer_configured_default() {
        let mut app = test_app();
        app.config.default_project = Some("payments".into());
        app.on_projects(Ok(vec!["checkout".into(), "payments".into()]));
        assert_eq!(app.selected_project.as_deref(), Some("payments"));

        let mut app = test_app();
        app.config.default_project = Some("gone".into());
        app.on_projects(Ok(vec!["checkout".into()]));
        assert_eq!(app.selected_project.as_deref(), Some("checkout"));
    }

    #[tokio::test]
    async fn test_empty_project_list_does_not_load() {
        let mut app = test_app();
        app.on_projects(Ok(vec![]));
        assert_eq!(app.selected_project, None);
        assert!(!app.loading);
        assert_eq!(app.load_generation, 0);
    }

    #[tokio::test]
    async fn test_stale_dashboard_response_is_dropped() {
        let mut app = test_app();
        app.on_projects(Ok(vec!["checkout".into()]));
        app.shift_range(-1);
        assert_eq!(app.load_generation, 2);

        let mut stale = DashboardData::default();
        stale.test_cases.push(testpulse_core::api::TestCase {
            name: "old".into(),
            status: "PASSED".into(),
            duration_seconds: 1.0,
            error_message: None,
        });
        app.on_dashboard(1, Ok(stale));
        assert!(app.data.is_empty());
        assert!(app.loading);

        app.on_dashboard(2, Err(ApiError::Network("down".into())));
        assert!(!app.loading);
        assert!(app.status_message.as_deref().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_send_question_and_clear() {
        let mut app = test_app();
        app.session.input = "why is checkout red?".into();
        app.input_cursor = 5;

        app.send_question();

        assert!(app.session.is_busy());
        assert_eq!(app.session.messages().len(), 2);
        assert_eq!(app.input_cursor, 0);

        app.clear_chat();
        assert!(app.session.messages().is_empty());
        assert!(app.session.is_busy());
        app.shutdown();
    }

    #[tokio::test]
    async fn test_assistant_event_resolves_after_clear() {
        let mut app = test_app();
        app.session.input = "q".into();
        app.send_question();
        app.clear_chat();

        app.on_assistant_event(AssistantEvent::TaskCreated(Err(ApiError::Network("x".into()))));

        assert!(!app.session.is_busy());
        assert_eq!(
            app.session.messages(),
            &[ChatMessage::bot("🚨 Failed to reach backend.")]
        );
    }

    #[test]
    fn test_scroll_to_bottom_counts_wrapped_lines() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut app, _) = App::new(Config::default(), tx);
        app.chat_width = 10;
        app.chat_height = 4;
        app.session.submit("x".repeat(25).as_str());
        // user: 1 + 3 + 1, placeholder: 1 + 2 + 1 = 9 lines
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, 5);
    }

    #[test]
    fn test_scroll_to_bottom_counts_exact_width_lines_once() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 2;
        let _ = app.session.submit("0123456789");

        app.scroll_chat_to_bottom();

        // "You:" + 1 wrapped line + blank, then "Bot:" + 2 lines for the
        // 13-char placeholder + blank
        assert_eq!(app.chat_scroll, 7 - 2);
    }
}

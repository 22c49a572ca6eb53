use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, Focus};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Assistant(event) => app.on_assistant_event(event),
        AppEvent::Projects(result) => app.on_projects(result),
        AppEvent::Dashboard { generation, result } => app.on_dashboard(generation, result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_project_picker {
        handle_project_picker(app, key);
        return;
    }

    match app.focus {
        Focus::Dashboard => handle_dashboard(app, key),
        Focus::Assistant => handle_assistant(app, key),
    }
}

fn handle_project_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_project_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.project_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.project_picker_nav_up(),
        KeyCode::Enter => app.select_project(),
        _ => {}
    }
}

fn handle_dashboard(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Test case table
        KeyCode::Char('j') | KeyCode::Down => app.test_cases_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.test_cases_nav_up(),

        // Filters
        KeyCode::Char('p') => app.open_project_picker(),
        KeyCode::Char('[') => app.shift_range(-1),
        KeyCode::Char(']') => app.shift_range(1),
        KeyCode::Char('+') | KeyCode::Char('=') => app.widen_range(7),
        KeyCode::Char('-') => app.widen_range(-7),
        KeyCode::Char('r') => app.reload(),

        KeyCode::Char('a') => app.open_assistant(),
        KeyCode::Tab if app.show_assistant => app.focus = Focus::Assistant,

        _ => {}
    }
}

fn handle_assistant(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('l') => app.clear_chat(),
            KeyCode::Char('u') => {
                app.session.input.clear();
                app.input_cursor = 0;
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.close_assistant(),
        KeyCode::Tab => app.focus = Focus::Dashboard,
        KeyCode::Enter => {
            // Send is disabled while a task is in flight
            if !app.session.is_busy() {
                app.send_question();
            }
        }
        KeyCode::PageUp => app.scroll_chat_up(),
        KeyCode::PageDown => app.scroll_chat_down(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.session.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
            app.session.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Clear, Dataset, GraphType,
        List, ListItem, Paragraph, Row, Table, Wrap,
    },
};
use testpulse_core::dashboard::TestOutcome;
use testpulse_core::Origin;
use crate::app::{App, Focus};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.show_assistant {
        // Assistant panel takes the right half, like a slide-over
        let [dashboard_area, assistant_area] = Layout::horizontal([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .areas(body_area);
        render_dashboard(app, frame, dashboard_area);
        render_assistant(app, frame, assistant_area);
    } else {
        render_dashboard(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if app.show_project_picker {
        render_project_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let project = app.selected_project.as_deref().unwrap_or("no project");

    let mut spans = vec![
        Span::styled(" testpulse ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("│ "),
        Span::styled(project.to_string(), Style::default().fg(Color::White).bold()),
        Span::raw(" │ "),
        Span::raw(app.range.label()),
    ];
    if app.loading {
        spans.push(Span::styled("  loading…", Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(message) = &app.status_message {
        let footer = Paragraph::new(Line::from(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Red),
        )))
        .style(Style::default().bg(Color::Black));
        frame.render_widget(footer, area);
        return;
    }

    let (mode_text, mode_style) = match app.focus {
        Focus::Dashboard => (" DASHBOARD ", Style::default().bg(Color::Blue).fg(Color::White)),
        Focus::Assistant => (" ASSISTANT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.focus {
        Focus::Dashboard => vec![
            Span::styled(" p ", key_style),
            Span::styled(" project ", label_style),
            Span::styled(" [ ] ", key_style),
            Span::styled(" range ", label_style),
            Span::styled(" + - ", key_style),
            Span::styled(" widen ", label_style),
            Span::styled(" r ", key_style),
            Span::styled(" refresh ", label_style),
            Span::styled(" a ", key_style),
            Span::styled(" assistant ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        Focus::Assistant => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(if app.session.is_busy() { " waiting… " } else { " send " }, label_style),
            Span::styled(" ^L ", key_style),
            Span::styled(" clear chat ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" dashboard ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_dashboard(app: &mut App, frame: &mut Frame, area: Rect) {
    let [executions_area, pass_fail_area, duration_area, cases_area] = Layout::vertical([
        Constraint::Percentage(22),
        Constraint::Percentage(22),
        Constraint::Percentage(22),
        Constraint::Min(6),
    ])
    .areas(area);

    render_executions(app, frame, executions_area);
    render_pass_fail(app, frame, pass_fail_area);
    render_durations(app, frame, duration_area);
    render_test_cases(app, frame, cases_area);
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", title))
}

/// Loading or empty placeholder; returns true when the panel was filled.
fn render_panel_state(app: &App, frame: &mut Frame, area: Rect, title: &str, empty: bool) -> bool {
    let text = if app.loading {
        "Loading..."
    } else if app.selected_project.is_none() {
        "Select a project (p)"
    } else if empty {
        "No data for this range"
    } else {
        return false;
    };

    let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
        .block(panel(title));
    frame.render_widget(paragraph, area);
    true
}

/// Short axis label: "2024-05-17" becomes "05-17".
fn short_date(date: &str) -> String {
    date.get(5..).unwrap_or(date).to_string()
}

fn render_executions(app: &App, frame: &mut Frame, area: Rect) {
    let title = "Executions Trend";
    if render_panel_state(app, frame, area, title, app.data.executions.is_empty()) {
        return;
    }

    let bars: Vec<Bar> = app
        .data
        .executions
        .iter()
        .map(|point| {
            Bar::default()
                .value(point.execution_count)
                .label(Line::from(short_date(&point.date)))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel(title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1)
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    frame.render_widget(chart, area);
}

fn axis_labels(dates: &[&str]) -> Vec<Span<'static>> {
    match dates {
        [] => vec![],
        [only] => vec![Span::raw(short_date(only))],
        [first, .., last] => vec![Span::raw(short_date(first)), Span::raw(short_date(last))],
    }
}

fn render_pass_fail(app: &App, frame: &mut Frame, area: Rect) {
    let title = "Pass/Fail Trend";
    if render_panel_state(app, frame, area, title, app.data.pass_fail.is_empty()) {
        return;
    }

    let points = &app.data.pass_fail;
    let passed: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.passed as f64))
        .collect();
    let failed: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.failed as f64))
        .collect();
    let max_y = points
        .iter()
        .map(|p| p.passed.max(p.failed))
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();

    let latest_rate = points.last().map(|p| p.pass_rate).unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .name("passed")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&passed),
        Dataset::default()
            .name("failed")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&failed),
    ];

    let chart = Chart::new(datasets)
        .block(panel(&format!("{title} · latest pass rate {latest_rate:.1}%")))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, (points.len().saturating_sub(1)).max(1) as f64])
                .labels(axis_labels(&dates)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_y])
                .labels(vec![Span::raw("0"), Span::raw(format!("{max_y:.0}"))]),
        );

    frame.render_widget(chart, area);
}

fn render_durations(app: &App, frame: &mut Frame, area: Rect) {
    let title = "Average Execution Duration Trend";
    if render_panel_state(app, frame, area, title, app.data.durations.is_empty()) {
        return;
    }

    let points = &app.data.durations;
    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.avg_duration_seconds))
        .collect();
    let max_y = points
        .iter()
        .map(|p| p.avg_duration_seconds)
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();

    let datasets = vec![Dataset::default()
        .name("avg seconds")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Magenta))
        .data(&series)];

    let chart = Chart::new(datasets)
        .block(panel(title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, (points.len().saturating_sub(1)).max(1) as f64])
                .labels(axis_labels(&dates)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_y])
                .labels(vec![Span::raw("0s"), Span::raw(format!("{max_y:.1}s"))]),
        );

    frame.render_widget(chart, area);
}

fn outcome_style(outcome: TestOutcome) -> Style {
    match outcome {
        TestOutcome::Passed => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        TestOutcome::Failed => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        TestOutcome::Skipped => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        TestOutcome::Other => Style::default().fg(Color::Gray),
    }
}

fn render_test_cases(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = "Latest Executed Test Cases";
    if render_panel_state(app, frame, area, title, app.data.test_cases.is_empty()) {
        return;
    }

    let rows: Vec<Row> = app
        .data
        .test_cases
        .iter()
        .map(|case| {
            Row::new(vec![
                Cell::from(case.name.clone()),
                Cell::from(case.status.clone()).style(outcome_style(case.outcome())),
                Cell::from(case.duration_label()),
                Cell::from(case.error_message.clone().unwrap_or_default())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let header = Row::new(vec!["Test Case", "Status", "Duration (s)", "Error"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(45),
            Constraint::Length(9),
            Constraint::Length(13),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(panel(title))
    .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.test_cases_state);
}

fn render_assistant(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let focused = app.focus == Focus::Assistant;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" AI Assistant ");

    let chat_text = if app.session.messages().is_empty() {
        Text::from(Span::styled(
            "Ask a question about your test runs...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.messages() {
            match msg.origin {
                Origin::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Origin::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    if msg.is_placeholder() {
                        // Animated ellipsis: cycles through ".", "..", "..."
                        let dots = ".".repeat((app.animation_frame as usize) + 1);
                        lines.push(Line::from(Span::styled(
                            format!("🤔 Thinking{}", dots),
                            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                        )));
                    } else {
                        for line in msg.text.lines() {
                            lines.push(Line::from(line.to_string()));
                        }
                    }
                }
            }
            lines.push(Line::default());
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    let input_border_color = if app.session.is_busy() {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(if app.session.is_busy() { " Waiting for answer… " } else { " Ask a question " });

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.session.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if focused && !app.show_project_picker {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            input_area.x + cursor_x + 1,
            input_area.y + 1,
        ));
    }
}

fn render_project_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (app.projects.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Project (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .projects
        .iter()
        .map(|project| {
            let style = if app.selected_project.as_ref() == Some(project) {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", project)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.project_picker_state);
}

//! Terminal User Interface (TUI) rendering and management.
//!
//! This module handles initializing the terminal in raw mode, restoring it on exit,
//! and drawing the dashboard using `ratatui`. Drawing reads only the render-side
//! `View`; it never touches an application record.

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;

use crate::record::AppStatus;
use crate::view::View;

/// Type alias for the specific terminal backend used.
pub type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Initializes the terminal for TUI mode.
///
/// Enables raw mode, enters the alternate screen, and creates a `ratatui` Terminal instance.
pub fn init_terminal() -> io::Result<TuiTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restores the terminal to its original state.
pub fn restore_terminal(mut terminal: TuiTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Draws the current view to the terminal.
pub fn draw(view: &mut View, terminal: &mut TuiTerminal) -> io::Result<()> {
    execute!(terminal.backend_mut(), SetTitle(window_title(view)))?;
    terminal.draw(|frame| {
        let area = frame.size();
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 4),
                Constraint::Ratio(2, 4),
                Constraint::Ratio(1, 4),
            ])
            .split(vertical[0]);
        let border_style = Style::default().fg(Color::DarkGray);

        let items: Vec<ListItem> = view
            .apps
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let is_selected = idx == view.selected;
                let indent = if is_selected { "▶ " } else { "  " };
                let name_style = if is_selected {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let width = (panes[0].width as usize).saturating_sub(8);
                ListItem::new(Line::from(vec![
                    Span::styled(indent, Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format!("[{}] ", status_char(row.status, view.use_symbols)),
                        status_style(row.status),
                    ),
                    Span::styled(truncate(&row.name, width), name_style),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(pane_block("Applications", border_style))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));
        frame.render_stateful_widget(list, panes[0], &mut list_state(view.selected, view.apps.len()));

        let log_block = pane_block(&log_title(view), border_style);
        let log_area = log_block.inner(panes[1]);
        view.set_log_view_height(log_area.height as usize);
        let logs = Paragraph::new(visible_logs(view, log_area.width as usize)).block(log_block);
        frame.render_widget(logs, panes[1]);
        if view.logs.is_empty() {
            let hint = if view.shown.is_some() {
                "No output yet"
            } else {
                "Select an application to view logs"
            };
            let empty = Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, log_area);
        }

        let status = Paragraph::new(view.status_text.as_str())
            .style(status_text_style(view.status_failed))
            .block(pane_block("Status", border_style))
            .wrap(Wrap { trim: true });
        frame.render_widget(status, panes[2]);

        let hints = Paragraph::new(Line::from(Span::styled(
            key_hints(view.use_symbols),
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(hints, vertical[1]);

        if view.show_help {
            let popup_area = centered_rect(50, 60, area);
            let help_text = [
                "Navigation:",
                "  Up/Down    Select application",
                "  Tab        Cycle selection",
                "  Enter      Show selected application",
                "  PageUp/Dn  Scroll logs",
                "  Home/End   Scroll to top/bottom",
                "  f          Toggle auto-follow",
                "",
                "Lifecycle:",
                "  r          Restart selected",
                "  R          Restart ALL",
                "  s          Start selected",
                "  k          Stop selected",
                "",
                "General:",
                "  ?          Toggle this help",
                "  q          Quit",
            ]
            .join("\n");
            let help_block = Paragraph::new(help_text)
                .block(
                    Block::default()
                        .title("Help")
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                )
                .style(Style::default().bg(Color::DarkGray).fg(Color::White));
            frame.render_widget(Clear, popup_area);
            frame.render_widget(help_block, popup_area);
        }
    })?;
    Ok(())
}

fn pane_block(title: &str, border_style: Style) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
}

fn visible_logs(view: &View, width: usize) -> Text<'static> {
    let height = view.log_view_height;
    if height == 0 {
        return Text::default();
    }
    let start = view.scroll.min(view.logs.len());
    let end = (start + height).min(view.logs.len());
    let lines: Vec<Line<'static>> = view.logs[start..end]
        .iter()
        .map(|line| Line::from(truncate(line, width)))
        .collect();
    Text::from(lines)
}

fn key_hints(use_symbols: bool) -> &'static str {
    if use_symbols {
        " ↑/↓ select · r restart · R all · s start · k stop · f follow · ? help · q quit"
    } else {
        " Up/Down select | r restart | R all | s start | k stop | f follow | ? help | q quit"
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn window_title(view: &View) -> String {
    match view.shown.as_deref() {
        Some(name) => format!("appdeck · {}", name),
        None => "appdeck".to_string(),
    }
}

fn log_title(view: &View) -> String {
    let Some(name) = view.shown.as_deref() else {
        return "Logs".to_string();
    };
    let status = view
        .apps
        .iter()
        .find(|row| row.name == name)
        .and_then(|row| row.status);
    match status {
        Some(status) => format!("Logs - {} ({})", name, status.label().to_lowercase()),
        None => format!("Logs - {}", name),
    }
}

fn list_state(selected: usize, len: usize) -> ListState {
    let mut state = ListState::default();
    if len > 0 {
        state.select(Some(selected.min(len - 1)));
    }
    state
}

fn status_char(status: Option<AppStatus>, use_symbols: bool) -> char {
    match (status, use_symbols) {
        (Some(AppStatus::Running), true) => '●',
        (Some(AppStatus::Stopped), true) => '○',
        (None, true) => '·',
        (Some(AppStatus::Running), false) => 'R',
        (Some(AppStatus::Stopped), false) => 'S',
        (None, false) => '?',
    }
}

fn status_style(status: Option<AppStatus>) -> Style {
    match status {
        Some(AppStatus::Running) => Style::default().fg(Color::Green),
        Some(AppStatus::Stopped) => Style::default().fg(Color::Gray),
        None => Style::default().fg(Color::DarkGray),
    }
}

fn status_text_style(failed: bool) -> Style {
    if failed {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max.saturating_sub(1)).collect::<String>();
    out.push('~');
    out
}

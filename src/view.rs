//! Render-side dashboard state.
//!
//! `View` is owned by the render loop and is the only place widget data
//! lives. Everything it shows arrives either from key handling on the render
//! loop itself or from closures delivered through the bridge, always as
//! already-captured snapshots. Key presses are translated into `ViewAction`s
//! which the driver turns into lifecycle commands.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::record::{AppStatus, Snapshot};

/// One entry of the applications list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRow {
    pub name: String,
    /// Last known status; `None` until the first snapshot arrives.
    pub status: Option<AppStatus>,
}

/// Actions resulting from user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// No action required.
    None,
    /// Exit the dashboard.
    Quit,
    /// Show an application's logs and status.
    Select(String),
    /// Restart an application.
    Restart(String),
    /// Restart every application.
    RestartAll,
    /// Start a stopped application.
    Start(String),
    /// Stop a running application.
    Stop(String),
}

#[derive(Debug)]
pub struct View {
    /// Applications in list order.
    pub apps: Vec<AppRow>,
    /// Index of the highlighted list entry.
    pub selected: usize,
    /// Application whose logs are in the log pane.
    pub shown: Option<String>,
    /// Log lines of the shown application.
    pub logs: Vec<String>,
    /// Text of the status panel.
    pub status_text: String,
    /// Whether the status text reports a failed operation.
    pub status_failed: bool,
    /// First visible log line when not following.
    pub scroll: usize,
    /// Whether the log pane sticks to the newest line.
    pub follow: bool,
    /// Height of the log pane, set while drawing.
    pub log_view_height: usize,
    pub use_symbols: bool,
    pub show_help: bool,
    pub should_quit: bool,
}

impl View {
    pub fn new(names: Vec<String>, use_symbols: bool) -> Self {
        let apps = names
            .into_iter()
            .map(|name| AppRow { name, status: None })
            .collect();
        Self {
            apps,
            selected: 0,
            shown: None,
            logs: Vec::new(),
            status_text: String::new(),
            status_failed: false,
            scroll: 0,
            follow: true,
            log_view_height: 0,
            use_symbols,
            show_help: false,
            should_quit: false,
        }
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.apps.get(self.selected).map(|row| row.name.as_str())
    }

    /// Puts `name` in the log pane and describes it in the status panel.
    pub fn show(&mut self, name: &str, snapshot: Snapshot) {
        self.set_status(status_line(name, snapshot.status()));
        if self.shown.as_deref() != Some(name) {
            self.scroll = 0;
            self.follow = true;
        }
        self.shown = Some(name.to_string());
        self.refresh(name, snapshot);
    }

    /// Applies a fresh snapshot without changing what is shown.
    pub fn refresh(&mut self, name: &str, snapshot: Snapshot) {
        if let Some(row) = self.apps.iter_mut().find(|row| row.name == name) {
            row.status = Some(snapshot.status());
        }
        if self.shown.as_deref() == Some(name) {
            self.logs = snapshot.logs;
            if self.follow {
                self.ensure_follow();
            } else {
                self.scroll = self.scroll.min(self.max_scroll());
            }
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.set_result(text, true);
    }

    /// Sets the status text for a finished operation.
    pub fn set_result(&mut self, text: impl Into<String>, success: bool) {
        self.status_text = text.into();
        self.status_failed = !success;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return ViewAction::None;
        }
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                ViewAction::Quit
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                ViewAction::Quit
            }
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    return self.select_current();
                }
                ViewAction::None
            }
            KeyCode::Down => {
                if self.selected + 1 < self.apps.len() {
                    self.selected += 1;
                    return self.select_current();
                }
                ViewAction::None
            }
            KeyCode::Tab => {
                if self.apps.is_empty() {
                    return ViewAction::None;
                }
                self.selected = (self.selected + 1) % self.apps.len();
                self.select_current()
            }
            KeyCode::Enter => self.select_current(),
            KeyCode::Char('r') => self.for_selected(ViewAction::Restart),
            KeyCode::Char('R') => ViewAction::RestartAll,
            KeyCode::Char('s') => self.for_selected(ViewAction::Start),
            KeyCode::Char('k') => self.for_selected(ViewAction::Stop),
            KeyCode::Char('f') => {
                self.follow = !self.follow;
                if self.follow {
                    self.ensure_follow();
                }
                ViewAction::None
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                ViewAction::None
            }
            KeyCode::PageUp => {
                self.scroll_up(self.log_view_height.max(1));
                ViewAction::None
            }
            KeyCode::PageDown => {
                self.scroll_down(self.log_view_height.max(1));
                ViewAction::None
            }
            KeyCode::Home => {
                self.scroll = 0;
                self.follow = false;
                ViewAction::None
            }
            KeyCode::End => {
                self.follow = true;
                self.ensure_follow();
                ViewAction::None
            }
            _ => ViewAction::None,
        }
    }

    fn select_current(&self) -> ViewAction {
        self.for_selected(ViewAction::Select)
    }

    fn for_selected(&self, action: fn(String) -> ViewAction) -> ViewAction {
        match self.selected_name() {
            Some(name) => action(name.to_string()),
            None => ViewAction::None,
        }
    }

    pub fn scroll_up(&mut self, amount: usize) {
        let current = if self.follow {
            self.max_scroll()
        } else {
            self.scroll
        };
        self.scroll = current.saturating_sub(amount);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, amount: usize) {
        let max_scroll = self.max_scroll();
        let current = if self.follow { max_scroll } else { self.scroll };
        let next = (current + amount).min(max_scroll);
        self.scroll = next;
        self.follow = next == max_scroll;
    }

    pub fn ensure_follow(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn set_log_view_height(&mut self, height: usize) {
        self.log_view_height = height;
        if self.follow {
            self.ensure_follow();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    fn max_scroll(&self) -> usize {
        self.logs.len().saturating_sub(self.log_view_height.max(1))
    }
}

/// Status panel text for a selected application.
pub fn status_line(name: &str, status: AppStatus) -> String {
    format!("App: {} | Status: {}", name, status.label())
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEventKind, KeyEventState};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn make_view() -> View {
        View::new(vec!["App1".to_string(), "App2".to_string()], true)
    }

    fn snapshot(running: bool, lines: usize) -> Snapshot {
        Snapshot {
            running,
            logs: (0..lines).map(|i| format!("line {}", i)).collect(),
        }
    }

    #[test]
    fn navigation_selects_neighbours() {
        let mut view = make_view();
        assert_eq!(view.handle_key(key(KeyCode::Up)), ViewAction::None);
        assert_eq!(
            view.handle_key(key(KeyCode::Down)),
            ViewAction::Select("App2".to_string())
        );
        assert_eq!(view.handle_key(key(KeyCode::Down)), ViewAction::None);
        assert_eq!(
            view.handle_key(key(KeyCode::Tab)),
            ViewAction::Select("App1".to_string())
        );
        assert_eq!(
            view.handle_key(key(KeyCode::Enter)),
            ViewAction::Select("App1".to_string())
        );
    }

    #[test]
    fn lifecycle_keys_target_selection() {
        let mut view = make_view();
        view.selected = 1;
        assert_eq!(
            view.handle_key(key(KeyCode::Char('r'))),
            ViewAction::Restart("App2".to_string())
        );
        assert_eq!(
            view.handle_key(key(KeyCode::Char('s'))),
            ViewAction::Start("App2".to_string())
        );
        assert_eq!(
            view.handle_key(key(KeyCode::Char('k'))),
            ViewAction::Stop("App2".to_string())
        );
        assert_eq!(view.handle_key(key(KeyCode::Char('R'))), ViewAction::RestartAll);
    }

    #[test]
    fn empty_list_produces_no_commands() {
        let mut view = View::new(Vec::new(), false);
        assert_eq!(view.handle_key(key(KeyCode::Char('r'))), ViewAction::None);
        assert_eq!(view.handle_key(key(KeyCode::Tab)), ViewAction::None);
        assert_eq!(view.handle_key(key(KeyCode::Enter)), ViewAction::None);
    }

    #[test]
    fn quit_sets_flag() {
        let mut view = make_view();
        assert_eq!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Quit);
        assert!(view.should_quit);
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut view = make_view();
        view.handle_key(key(KeyCode::Char('?')));
        assert!(view.show_help);
        assert_eq!(view.handle_key(key(KeyCode::Char('r'))), ViewAction::None);
        view.handle_key(key(KeyCode::Esc));
        assert!(!view.show_help);
        assert!(!view.should_quit);
    }

    #[test]
    fn show_sets_logs_and_status() {
        let mut view = make_view();
        view.show(
            "App1",
            Snapshot {
                running: false,
                logs: vec!["App1 initialized".to_string()],
            },
        );
        assert_eq!(view.shown.as_deref(), Some("App1"));
        assert_eq!(view.logs, vec!["App1 initialized"]);
        assert_eq!(view.status_text, "App: App1 | Status: Stopped");
        assert_eq!(view.apps[0].status, Some(AppStatus::Stopped));
    }

    #[test]
    fn failed_result_is_flagged_until_next_status() {
        let mut view = make_view();
        view.set_result("Failed to restart app: App1 | Error: boom", false);
        assert!(view.status_failed);
        view.show("App1", snapshot(false, 1));
        assert!(!view.status_failed);
        assert_eq!(view.status_text, "App: App1 | Status: Stopped");
    }

    #[test]
    fn refresh_of_hidden_app_only_updates_marker() {
        let mut view = make_view();
        view.show("App1", snapshot(false, 1));
        view.refresh("App2", snapshot(true, 3));
        assert_eq!(view.logs.len(), 1);
        assert_eq!(view.apps[1].status, Some(AppStatus::Running));
        assert_eq!(view.status_text, "App: App1 | Status: Stopped");
    }

    #[test]
    fn following_tracks_new_lines() {
        let mut view = make_view();
        view.set_log_view_height(5);
        view.show("App1", snapshot(true, 8));
        assert_eq!(view.scroll, 3);
        view.refresh("App1", snapshot(true, 12));
        assert_eq!(view.scroll, 7);
    }

    #[test]
    fn scrolling_up_stops_following() {
        let mut view = make_view();
        view.set_log_view_height(5);
        view.show("App1", snapshot(true, 20));
        view.handle_key(key(KeyCode::PageUp));
        assert!(!view.follow);
        assert_eq!(view.scroll, 10);
        view.refresh("App1", snapshot(true, 25));
        assert_eq!(view.scroll, 10);
        view.handle_key(key(KeyCode::End));
        assert!(view.follow);
        assert_eq!(view.scroll, 20);
    }

    #[test]
    fn scrolling_down_to_bottom_resumes_follow() {
        let mut view = make_view();
        view.set_log_view_height(5);
        view.show("App1", snapshot(true, 12));
        view.handle_key(key(KeyCode::Home));
        assert_eq!(view.scroll, 0);
        view.scroll_down(100);
        assert_eq!(view.scroll, 7);
        assert!(view.follow);
    }
}

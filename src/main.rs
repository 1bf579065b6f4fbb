//! appdeck: a terminal dashboard for a small set of supervised applications.
//!
//! This is the entry point of the application. It parses command-line arguments,
//! loads configuration, builds the application registry, and runs the render loop
//! that draws the dashboard and applies updates submitted through the bridge.

mod bridge;
mod config;
mod dashboard;
mod events;
mod launcher;
mod lifecycle;
mod record;
mod registry;
mod tui;
mod view;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::builder::styling::{AnsiColor, Effects, Style};
use clap::builder::Styles;
use clap::Parser;
use crossterm::event::KeyEventKind;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Config};
use crate::dashboard::Dashboard;
use crate::events::Event;
use crate::launcher::StubLauncher;
use crate::registry::{AppSpec, Registry};
use crate::view::{View, ViewAction};

const DEFAULT_LOG_PATH: &str = "/var/log/apps";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(
    name = "appdeck",
    version,
    about = "Terminal dashboard for supervised applications",
    styles = help_styles(),
    color = clap::ColorChoice::Always
)]
struct Cli {
    /// Path to appdeck.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ignore any appdeck.toml in the current directory.
    #[arg(long)]
    no_config: bool,
    /// Log location passed to every application start.
    #[arg(long)]
    log_path: Option<PathBuf>,
    /// Application to supervise: NAME or NAME=INITIAL LOG LINE (repeatable).
    #[arg(long = "app", value_name = "NAME[=LINE]", value_parser = parse_app_arg)]
    apps: Vec<AppSpec>,
    /// Write the dashboard's own trace output to this file.
    #[arg(long)]
    trace_file: Option<PathBuf>,
    /// Trace level ("error", "warn", "info", "debug", "trace").
    #[arg(long)]
    log_level: Option<String>,
    /// Use plain ASCII status markers.
    #[arg(long)]
    no_symbols: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    setup_logging(settings.trace_file.as_deref(), &settings.log_level)?;

    let registry = Arc::new(Registry::new(
        &settings.apps,
        settings.log_path.clone(),
        Arc::new(StubLauncher),
    )?);
    tracing::info!(
        apps = settings.apps.len(),
        log_path = %registry.log_path().display(),
        "dashboard starting"
    );

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let (bridge, mut updates) = bridge::channel();
    let dashboard = Dashboard::new(Arc::clone(&registry), bridge);
    let mut view = View::new(registry.names(), settings.use_symbols);

    dashboard.prime();
    for spec in settings.apps.iter().filter(|spec| spec.autostart) {
        dashboard.start(&spec.name);
    }
    if let Some(name) = view.selected_name() {
        dashboard.select(name);
    }

    let mut terminal = tui::init_terminal().context("failed to initialize terminal")?;
    spawn_input_listener(event_tx.clone());
    spawn_signal_listener(event_tx);

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut result = Ok(());

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    Event::Key(key) => {
                        let action = view.handle_key(key);
                        handle_view_action(action, &dashboard);
                    }
                    Event::Resize { width, height } => {
                        tracing::debug!(width, height, "terminal resized");
                        let _ = terminal.autoresize();
                    }
                    Event::Shutdown => {
                        tracing::info!("shutdown requested");
                        view.should_quit = true;
                    }
                }
            }
            Some(update) = updates.recv() => {
                update(&mut view);
                updates.apply_pending(&mut view);
            }
            _ = ticker.tick() => {}
        }

        if let Err(err) = tui::draw(&mut view, &mut terminal) {
            result = Err(err.into());
            break;
        }
        if view.should_quit {
            break;
        }
    }

    let restored = tui::restore_terminal(terminal);
    finish(&dashboard, result, restored).await
}

/// Stops supervised applications even when the loop or the terminal restore
/// failed, then reports the first error.
async fn finish(
    dashboard: &Dashboard,
    result: Result<()>,
    restored: std::io::Result<()>,
) -> Result<()> {
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, dashboard.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("timed out stopping applications on exit");
    }
    tracing::info!("dashboard stopped");
    result.and(restored.context("failed to restore terminal"))
}

fn handle_view_action(action: ViewAction, dashboard: &Dashboard) {
    match action {
        ViewAction::Select(name) => {
            dashboard.select(&name);
        }
        ViewAction::Restart(name) => {
            dashboard.restart(&name);
        }
        ViewAction::RestartAll => {
            dashboard.restart_all();
        }
        ViewAction::Start(name) => {
            dashboard.start(&name);
        }
        ViewAction::Stop(name) => {
            dashboard.stop(&name);
        }
        ViewAction::Quit | ViewAction::None => {}
    }
}

fn spawn_input_listener(tx: mpsc::Sender<Event>) {
    std::thread::spawn(move || loop {
        if crossterm::event::poll(Duration::from_millis(100)).unwrap_or(false) {
            let event = match crossterm::event::read() {
                Ok(crossterm::event::Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    Event::Key(key)
                }
                Ok(crossterm::event::Event::Resize(width, height)) => Event::Resize { width, height },
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.blocking_send(event).is_err() {
                break;
            }
        }
    });
}

fn spawn_signal_listener(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(_) => return,
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        let _ = tx.send(Event::Shutdown).await;
    });
}

/// Runtime configuration derived from CLI arguments and the config file.
#[derive(Debug, Clone)]
struct RunSettings {
    apps: Vec<AppSpec>,
    log_path: PathBuf,
    use_symbols: bool,
    trace_file: Option<PathBuf>,
    log_level: String,
}

impl RunSettings {
    fn resolve(cli: &Cli, config: Config) -> Self {
        let mut apps: Vec<AppSpec> = config.apps.into_iter().map(AppConfig::into_spec).collect();
        apps.extend(cli.apps.iter().cloned());
        if apps.is_empty() {
            apps = default_apps();
        }
        let log_path = cli
            .log_path
            .clone()
            .or(config.log_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
        let use_symbols = if cli.no_symbols {
            false
        } else {
            config.symbols.unwrap_or(true)
        };
        let trace_file = cli.trace_file.clone().or(config.trace_file);
        let log_level = cli
            .log_level
            .clone()
            .or(config.log_level)
            .unwrap_or_else(|| "info".to_string());
        Self {
            apps,
            log_path,
            use_symbols,
            trace_file,
            log_level,
        }
    }
}

fn load_settings(cli: &Cli) -> Result<RunSettings> {
    let mut config = Config::default();
    if !cli.no_config {
        let config_path = cli.config.clone().or_else(default_config_path);
        if let Some(path) = config_path {
            config = config::load_config(&path)?;
        }
    }
    Ok(RunSettings::resolve(cli, config))
}

fn default_config_path() -> Option<PathBuf> {
    let path = Path::new("appdeck.toml");
    if path.exists() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

fn default_apps() -> Vec<AppSpec> {
    vec![AppSpec::named("App1"), AppSpec::named("App2")]
}

fn parse_app_arg(value: &str) -> Result<AppSpec, String> {
    let (name, initial_log) = match value.split_once('=') {
        Some((name, line)) => (name.trim(), Some(line)),
        None => (value.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("missing application name in {:?}", value));
    }
    let mut spec = AppSpec::named(name);
    if let Some(line) = initial_log {
        spec.initial_log = line.to_string();
    }
    Ok(spec)
}

fn setup_logging(trace_file: Option<&Path>, level: &str) -> Result<()> {
    // The TUI owns stdout/stderr, so traces only go to a file.
    let Some(path) = trace_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open trace file {}", path.display()))?;
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("appdeck={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("failed to install trace subscriber: {}", err))
}

fn help_styles() -> Styles {
    Styles::styled()
        .header(
            Style::new()
                .fg_color(Some(AnsiColor::Cyan.into()))
                .effects(Effects::BOLD),
        )
        .usage(
            Style::new()
                .fg_color(Some(AnsiColor::Green.into()))
                .effects(Effects::BOLD),
        )
        .literal(Style::new().fg_color(Some(AnsiColor::Yellow.into())))
        .placeholder(Style::new().fg_color(Some(AnsiColor::Magenta.into())))
        .valid(Style::new().fg_color(Some(AnsiColor::Green.into())))
        .invalid(
            Style::new()
                .fg_color(Some(AnsiColor::Red.into()))
                .effects(Effects::BOLD),
        )
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_app_arg_splits_initial_line() {
        let spec = parse_app_arg("api=api warming up").unwrap();
        assert_eq!(spec.name, "api");
        assert_eq!(spec.initial_log, "api warming up");
        assert!(!spec.autostart);

        let spec = parse_app_arg("worker").unwrap();
        assert_eq!(spec.initial_log, "worker initialized");

        assert!(parse_app_arg("=orphan").is_err());
    }

    #[test]
    fn defaults_match_builtin_pair() {
        let cli = Cli::parse_from(["appdeck", "--no-config"]);
        let settings = RunSettings::resolve(&cli, Config::default());
        assert_eq!(settings.apps, default_apps());
        assert_eq!(settings.log_path, PathBuf::from(DEFAULT_LOG_PATH));
        assert!(settings.use_symbols);
        assert!(settings.trace_file.is_none());
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn cli_overrides_config() {
        let config: Config = toml::from_str(
            r#"
log_path = "/srv/logs"
symbols = true
log_level = "warn"

[[app]]
name = "db"
autostart = true
"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "appdeck",
            "--log-path",
            "/tmp/logs",
            "--app",
            "api=api booting",
            "--no-symbols",
            "--log-level",
            "debug",
        ]);
        let settings = RunSettings::resolve(&cli, config);
        let names: Vec<&str> = settings.apps.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, vec!["db", "api"]);
        assert!(settings.apps[0].autostart);
        assert_eq!(settings.apps[1].initial_log, "api booting");
        assert_eq!(settings.log_path, PathBuf::from("/tmp/logs"));
        assert!(!settings.use_symbols);
        assert_eq!(settings.log_level, "debug");
    }

    #[tokio::test]
    async fn finish_stops_apps_when_restore_fails() {
        let registry = Arc::new(
            Registry::new(&default_apps(), DEFAULT_LOG_PATH, Arc::new(StubLauncher)).unwrap(),
        );
        let (bridge, _updates) = bridge::channel();
        let dashboard = Dashboard::new(Arc::clone(&registry), bridge);
        dashboard.start("App1").await.unwrap();

        let restored = Err(std::io::Error::new(std::io::ErrorKind::Other, "tty gone"));
        let err = finish(&dashboard, Ok(()), restored).await.unwrap_err();

        assert!(err.to_string().contains("failed to restore terminal"));
        assert!(!registry.lookup("App1").unwrap().snapshot().running);
    }

    #[tokio::test]
    async fn finish_reports_loop_error_first() {
        let registry = Arc::new(
            Registry::new(&default_apps(), DEFAULT_LOG_PATH, Arc::new(StubLauncher)).unwrap(),
        );
        let (bridge, _updates) = bridge::channel();
        let dashboard = Dashboard::new(registry, bridge);

        let restored = Err(std::io::Error::new(std::io::ErrorKind::Other, "tty gone"));
        let err = finish(&dashboard, Err(anyhow!("draw failed")), restored)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "draw failed");
    }

    #[test]
    fn setup_logging_without_file_is_noop() {
        assert!(setup_logging(None, "debug").is_ok());
    }
}

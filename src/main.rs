mod config;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tails_logs::{Ingested, LogSession, SearchController, copy_all};
use tails_source::{Broker, Subscription, TailSource};
use tails_tui::{
    Action, AppState, Event, EventHandler, KeyBindings, KeyContext, LogViewerScreen,
    NoticeLevel, Tui,
};

use crate::config::{Config, LogLevel};

/// tails - follow a log file with severity colouring and live search
#[derive(Parser, Debug)]
#[command(name = "tails")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Each tails process is the only reader of its own follower. \
Running a second tails on the same file starts an independent viewer; \
it does not take over the first one.")]
struct Args {
    /// Log file to follow
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Buffer size in lines
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Drop lines arriving this many milliseconds after subscribing
    #[arg(long)]
    warmup_ms: Option<u64>,

    /// Apply a typed search after this many quiet milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Start with this search query applied
    #[arg(short, long)]
    search: Option<String>,

    /// Follow the file again after it fails
    #[arg(long)]
    reconnect: bool,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Diagnostic log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let result = start(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn start(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    init_tracing(&config)?;
    run_app(args, config).await
}

/// Read the config file, if any, and apply command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from '{}'", path.display()))?,
        None => Config::default(),
    };

    if let Some(capacity) = args.buffer_size {
        config.buffer.capacity = capacity;
    }
    if let Some(warmup_ms) = args.warmup_ms {
        config.gate.warmup_ms = warmup_ms;
    }
    if let Some(debounce_ms) = args.debounce_ms {
        config.search.debounce_ms = debounce_ms;
    }
    if args.reconnect {
        config.stream.reconnect = true;
    }
    if let Some(path) = &args.log_file {
        config.log.file = Some(path.display().to_string());
    }
    if let Some(level) = args.log_level {
        config.log.level = level;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.log.level.as_str().parse()?);

    match &config.log.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file '{}'", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

async fn run_app(args: Args, config: Config) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    // Initialize state
    let mut search = SearchController::new(config.debounce());
    if let Some(query) = &args.search {
        search.restore(query.as_str());
    }
    let mut state = AppState::new(args.path.display().to_string(), config.rule_set()?, search);
    let mut session = LogSession::new(config.session_options(), Instant::now());

    // Start following before taking over the terminal so path errors print plainly
    let mut broker = follow(&args, &config).await?;
    let mut subscription = Some(broker.subscribe());
    let mut reconnect_at: Option<Instant> = None;
    info!(
        path = %args.path.display(),
        readers = broker.subscriber_count(),
        policy = ?broker.policy(),
        "subscribed"
    );

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    render(&mut tui, &mut state, &session)?;

    loop {
        let warmup_at = session.warmup_deadline();
        let settle_at = state.search.settle_deadline();

        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.search_active {
                            keybindings.get_search_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Paste(text) => {
                        if state.ui_state.search_active {
                            state.search_paste(&text, Instant::now());
                        }
                    }
                    Event::Tick | Event::Resize(_, _) => {}
                    Event::Error(e) => {
                        state.notify(NoticeLevel::Error, e);
                    }
                }
            }

            // Handle incoming payloads
            message = next_message(&mut subscription) => {
                match message {
                    Some(raw) => {
                        if let Ingested::Terminated = session.ingest(raw, Instant::now()) {
                            unsubscribe(&mut subscription, &mut state);
                            let reason = close_text(&session);
                            state.notify(NoticeLevel::Warning, reason);
                        }
                    }
                    None => {
                        let reason = broker
                            .failure()
                            .unwrap_or_else(|| "source closed".to_string());
                        session.transport_failed(reason);
                        unsubscribe(&mut subscription, &mut state);

                        let mut text = close_text(&session);
                        if config.stream.reconnect {
                            reconnect_at = Some(Instant::now() + config.reconnect_delay());
                            text.push_str(", reconnecting");
                        }
                        state.notify(NoticeLevel::Error, text);
                    }
                }
            }

            _ = sleep_until(warmup_at), if warmup_at.is_some() => {
                session.on_warmup_elapsed(Instant::now());
            }

            _ = sleep_until(settle_at), if settle_at.is_some() => {
                state.search.poll(Instant::now());
            }

            _ = sleep_until(reconnect_at), if reconnect_at.is_some() => {
                reconnect_at = None;
                match follow(&args, &config).await {
                    Ok(new_broker) => {
                        broker = new_broker;
                        if session.resubscribe(Instant::now()) {
                            subscription = Some(broker.subscribe());
                            info!(readers = broker.subscriber_count(), "resubscribed");
                            state.notify(NoticeLevel::Info, "reconnected");
                        }
                    }
                    Err(e) => {
                        warn!("reconnect failed: {:#}", e);
                        state.notify(NoticeLevel::Error, format!("reconnect failed: {:#}", e));
                        reconnect_at = Some(Instant::now() + config.reconnect_delay());
                    }
                }
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut session, action);
            }
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &session)?;
    }

    // Cleanup
    session.shutdown();
    broker.shutdown();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

async fn follow(args: &Args, config: &Config) -> Result<Broker> {
    TailSource::follow(&args.path, config.follow_options(), config.reader_policy())
        .await
        .with_context(|| format!("cannot follow '{}'", args.path.display()))
}

/// Next payload from the subscription; never resolves while unsubscribed
async fn next_message(subscription: &mut Option<Subscription>) -> Option<String> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn sleep_until(deadline: Option<Instant>) -> tokio::time::Sleep {
    let deadline = deadline.unwrap_or_else(Instant::now);
    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline))
}

/// Stop consuming: drop the subscription and any pending search settle
fn unsubscribe(subscription: &mut Option<Subscription>, state: &mut AppState) {
    *subscription = None;
    state.search.cancel_pending();
}

fn close_text(session: &LogSession) -> String {
    session
        .close_reason()
        .map(|reason| reason.describe())
        .unwrap_or_else(|| "stream closed".to_string())
}

fn handle_action(state: &mut AppState, session: &mut LogSession, action: Action) {
    let now = Instant::now();

    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::ToggleHelp => {
            state.toggle_help();
        }
        Action::DismissNotice => {
            if state.ui_state.help_visible {
                state.toggle_help();
            } else {
                state.dismiss_notice();
            }
        }

        Action::OpenSearch => state.start_search(),
        Action::ApplySearch => state.apply_search(),
        Action::CloseSearch => state.cancel_search(),
        Action::SearchInput(c) => state.search_input_char(c, now),
        Action::SearchBackspace => state.search_input_backspace(now),
        Action::SearchClear => state.search_clear(now),

        Action::ScrollUp(n) => state.scroll_up(n),
        Action::ScrollDown(n) => state.scroll_down(n),
        Action::PageUp => state.page_up(),
        Action::PageDown => state.page_down(),
        Action::ScrollToTop => state.scroll_to_top(),
        Action::ScrollToBottom => state.scroll_to_bottom(),
        Action::ToggleAutoScroll => state.toggle_auto_scroll(),

        Action::ClearLogs => {
            session.clear();
            state.logs_cleared();
        }
        Action::CopyAll => {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let filename = format!("tails_{}.log", timestamp);

            match export_all(&filename, session) {
                Ok(count) => {
                    state.notify(
                        NoticeLevel::Info,
                        format!("Copied {} lines to {}", count, filename),
                    );
                }
                Err(e) => {
                    state.notify(NoticeLevel::Error, format!("Copy failed: {:#}", e));
                }
            }
        }
    }
}

fn export_all(filename: &str, session: &LogSession) -> Result<usize> {
    std::fs::write(filename, copy_all(session.buffer()))
        .with_context(|| format!("writing '{}'", filename))?;
    Ok(session.buffer().len())
}

fn render(tui: &mut Tui, state: &mut AppState, session: &LogSession) -> Result<()> {
    tui.terminal()
        .draw(|frame| LogViewerScreen::render(frame, state, session))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tails_logs::{RuleSet, SessionOptions};

    #[test]
    fn test_help_explains_reader_scope() {
        use clap::CommandFactory;

        let help = Args::command().render_long_help().to_string();
        let help = help.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(help.contains("does not take over the first one"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "tails",
            "app.log",
            "--buffer-size",
            "50",
            "--warmup-ms",
            "0",
            "--reconnect",
            "--log-level",
            "debug",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.buffer.capacity, 50);
        assert_eq!(config.gate.warmup_ms, 0);
        assert_eq!(config.search.debounce_ms, 1000);
        assert!(config.stream.reconnect);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_cli_override_is_validated() {
        let args = Args::parse_from(["tails", "app.log", "--buffer-size", "0"]);
        assert!(load_config(&args).is_err());
    }

    fn test_state() -> (AppState, LogSession) {
        let state = AppState::new(
            "app.log",
            RuleSet::builtin(),
            SearchController::new(Duration::from_millis(100)),
        );
        let options = SessionOptions {
            warmup: Duration::ZERO,
            ..SessionOptions::default()
        };
        (state, LogSession::new(options, Instant::now()))
    }

    #[test]
    fn test_search_actions() {
        let (mut state, mut session) = test_state();

        handle_action(&mut state, &mut session, Action::OpenSearch);
        handle_action(&mut state, &mut session, Action::SearchInput('o'));
        handle_action(&mut state, &mut session, Action::SearchInput('k'));
        assert!(state.search.is_pending());
        assert_eq!(state.search.debounced_query(), "");

        handle_action(&mut state, &mut session, Action::ApplySearch);
        assert_eq!(state.search.debounced_query(), "ok");
        assert!(!state.ui_state.search_active);

        handle_action(&mut state, &mut session, Action::OpenSearch);
        handle_action(&mut state, &mut session, Action::CloseSearch);
        assert_eq!(state.search.debounced_query(), "");
    }

    #[test]
    fn test_clear_logs() {
        let (mut state, mut session) = test_state();
        session.ingest("one".to_string(), Instant::now());
        state.scroll_up(3);

        handle_action(&mut state, &mut session, Action::ClearLogs);
        assert!(session.buffer().is_empty());
        assert!(state.ui_state.auto_scroll);
    }

    #[test]
    fn test_export_all() {
        let (_, mut session) = test_state();
        session.ingest("a\tb".to_string(), Instant::now());
        session.ingest("c".to_string(), Instant::now());

        let path = std::env::temp_dir().join(format!("tails-export-{}.log", std::process::id()));
        let filename = path.display().to_string();
        assert_eq!(export_all(&filename, &session).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a    b\nc\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unsubscribe_cancels_pending_search() {
        let (mut state, _) = test_state();
        let mut subscription: Option<Subscription> = None;
        state.search_input_char('x', Instant::now());

        unsubscribe(&mut subscription, &mut state);
        assert!(!state.search.is_pending());
        assert!(subscription.is_none());
    }
}

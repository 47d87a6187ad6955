mod action;
mod app;
mod backend;
mod chart;
mod command;
mod config;
mod connection;
mod html;
mod idle;
mod markdown;
mod notify;
mod protocol;
mod render;
mod thinking;
mod timer;
mod ui;
mod ui_state;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arboard::Clipboard;
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use action::Action;
use app::App;
use backend::{TransportCommand, TransportEvent};
use command::KeyParser;
use config::{endpoint_from_origin, Config, DEFAULT_ORIGIN};
use ui::draw;

/// Terminal display surface for an agent's live output.
#[derive(Debug, Parser)]
#[command(name = "display-client", version, about)]
struct Cli {
    /// Origin of the display service; the socket is derived from it
    #[arg(long, env = "DISPLAY_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Show the UI without connecting
    #[arg(short, long)]
    offline: bool,

    /// Log file (stdout belongs to the terminal UI)
    #[arg(long, env = "DISPLAY_CLIENT_LOG")]
    log_file: Option<PathBuf>,
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

const TRANSPORT_SHUTDOWN: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone());

    let endpoint = endpoint_from_origin(&cli.origin)
        .with_context(|| format!("cannot derive display socket from origin {:?}", cli.origin))?;

    // wss needs a process-wide rustls provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = Config::default();
    let mut app = App::new(config, endpoint).offline(cli.offline);

    // Setup terminal
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;

    result
}

fn init_logging(path: Option<PathBuf>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let path = path.unwrap_or_else(|| std::env::temp_dir().join("display-client.log"));

    match File::create(&path) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

async fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let (command_tx, command_rx) = mpsc::channel::<TransportCommand>(8);
    let (event_tx, mut event_rx) = mpsc::channel::<TransportEvent>(256);
    let mut transport = tokio::spawn(backend::run(command_rx, event_tx, app.config.handshake_timeout));

    if let Some(command) = app.start(Instant::now()) {
        send_command(&command_tx, command).await;
    }

    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(app.config.tick_rate_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut clipboard = Clipboard::new().map_err(|err| warn!(error = %err, "clipboard unavailable")).ok();

    while !app.should_quit {
        terminal.draw(|frame| draw(frame, app))?;

        let command = tokio::select! {
            _ = ticker.tick() => app.tick(Instant::now()),
            Some(event) = event_rx.recv() => {
                app.handle_transport(event, Instant::now());
                None
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => match KeyParser::parse(&key) {
                    Some(Action::CopyContent) => {
                        copy_content(app, clipboard.as_mut());
                        None
                    }
                    Some(action) => app.apply(action, Instant::now()),
                    None => None,
                },
                Some(Ok(_)) => None,
                Some(Err(err)) => return Err(err).context("reading terminal events"),
                None => break,
            },
        };

        if let Some(command) = command {
            send_command(&command_tx, command).await;
        }
    }

    // Closing the channel stops the task; give it a moment to close the socket.
    drop(command_tx);
    if tokio::time::timeout(TRANSPORT_SHUTDOWN, &mut transport).await.is_err() {
        warn!("transport task did not stop in time; aborting");
        transport.abort();
    }
    info!("display client exiting");
    Ok(())
}

async fn send_command(tx: &mpsc::Sender<TransportCommand>, command: TransportCommand) {
    if tx.send(command).await.is_err() {
        warn!("transport task is gone; command dropped");
    }
}

fn copy_content(app: &mut App, clipboard: Option<&mut Clipboard>) {
    let now = Instant::now();
    let Some(source) = app.content_source() else {
        app.set_status("Nothing to copy", now);
        return;
    };
    let Some(clipboard) = clipboard else {
        app.set_status("Clipboard unavailable", now);
        return;
    };
    match clipboard.set_text(source) {
        Ok(()) => app.set_status("Copied to clipboard", now),
        Err(err) => {
            warn!(error = %err, "clipboard copy failed");
            app.set_status("Copy failed", now);
        }
    }
}

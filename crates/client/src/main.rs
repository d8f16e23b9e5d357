mod host;
mod settings;
mod tui;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use overnet::{ConnectionState, LossSimulation, OnlineSession};

use host::HeadlessHost;
use settings::ClientSettings;
use tui::{LogBuffer, TuiState};

#[derive(Parser)]
#[command(name = "overnet-client")]
#[command(about = "Overworld client for Overnet servers")]
struct Args {
    #[arg(help = "Server address, optionally with join data (host:port?data)")]
    server: Option<String>,

    #[arg(short, long, help = "TOML settings file")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(long, help = "Directory for cached server assets")]
    cache_root: Option<PathBuf>,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Simulated packet loss percentage (0-100)")]
    loss_percent: Option<f32>,

    #[arg(short, long)]
    tick_rate: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = ClientSettings::load(args.config.as_deref())
        .context("failed to load client settings")?;

    if let Some(username) = args.username {
        settings.session.username = username;
    }
    if let Some(cache_root) = args.cache_root {
        settings.session.cache_root = Some(cache_root);
    }
    if let Some(loss_percent) = args.loss_percent {
        settings.session.processor.loss_simulation = Some(LossSimulation::new(loss_percent));
    }
    if let Some(tick_rate) = args.tick_rate {
        settings.tick_rate = tick_rate;
    }

    let address = args
        .server
        .or_else(|| settings.server.clone())
        .context("no server address given")?;

    let log_buffer = LogBuffer::default();
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if !args.headless {
        logger.target(env_logger::Target::Pipe(Box::new(log_buffer.clone())));
    }
    logger.init();

    let tick = Duration::from_secs_f64(1.0 / settings.tick_rate.max(1) as f64);
    let mut session = OnlineSession::connect(&address, settings.session)
        .with_context(|| format!("failed to connect to {}", address))?;
    log::info!("Connecting to {} as {}", address, session.config().username);

    let running = AtomicBool::new(true);
    let mut host = HeadlessHost::new();

    if args.headless {
        run_headless(&mut session, &mut host, &running, tick);
    } else {
        run_with_tui(&mut session, &mut host, &running, tick, log_buffer)?;
    }

    if session.state() != ConnectionState::Disconnected {
        session.disconnect();
    }
    log::info!(
        "Client shutting down ({} dialogs answered, {} battles fled)",
        host.dialogs_answered,
        host.battles_fled
    );

    Ok(())
}

/// Runs one tick. Returns false once the session is over.
fn step(session: &mut OnlineSession, host: &mut HeadlessHost) -> bool {
    let alive = match session.update(None) {
        Ok(()) => true,
        Err(err) => {
            log::info!("Session ended: {}", err);
            false
        }
    };

    for event in session.drain_events() {
        host.handle(session, event);
    }

    alive && !host.leave_requested
}

fn run_headless(
    session: &mut OnlineSession,
    host: &mut HeadlessHost,
    running: &AtomicBool,
    tick: Duration,
) {
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        if !step(session, host) {
            running.store(false, Ordering::SeqCst);
        }

        if let Some(remaining) = tick.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

fn run_with_tui(
    session: &mut OnlineSession,
    host: &mut HeadlessHost,
    running: &AtomicBool,
    tick: Duration,
    log_buffer: LogBuffer,
) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut tui_state = TuiState::new(log_buffer);

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        if !step(session, host) {
            running.store(false, Ordering::SeqCst);
        }

        terminal.draw(|frame| tui::render(frame, &tui_state, session))?;

        let wait = tick.saturating_sub(started.elapsed());
        if event::poll(wait)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => running.store(false, Ordering::SeqCst),
                KeyCode::PageUp => tui_state.scroll_up(),
                KeyCode::PageDown => tui_state.scroll_down(),
                KeyCode::End => tui_state.scroll_to_bottom(),
                _ => {}
            }
        }
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}

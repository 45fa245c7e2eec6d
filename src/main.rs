mod ui;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use rfocus::audio::{AudioChannel, NullChannel, SinkChannel};
use rfocus::config::{self, AppConfig};
use rfocus::gateway::{HttpRemoteStore, PersistenceGateway, RemoteStore};
use rfocus::logging;
use rfocus::settings::{parse_duration, SettingsOverrides, Theme};
use rfocus::signal::{DesktopNotifier, SystemChime};
use rfocus::{CoordinatorParts, FocusCoordinator};
use std::{io, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

// ============================================================================
// Type Aliases & Constants
// ============================================================================

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
const REDRAW_RATE: Duration = Duration::from_millis(250);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone)]
#[command(author, version, about = "🍅 rfocus - Focus sessions, streaks and ambient sound in your terminal")]
struct Args {
    /// Focus length, e.g. 25m, 1h, 90s
    #[arg(short, long, value_parser = parse_duration)]
    focus: Option<u32>,
    #[arg(short, long, value_parser = parse_duration)]
    short_break: Option<u32>,
    #[arg(short, long, value_parser = parse_duration)]
    long_break: Option<u32>,
    /// Focus sessions before a long break
    #[arg(long)]
    sessions: Option<u32>,
    #[arg(short = 't', long, value_parser = parse_theme)]
    theme: Option<Theme>,
    #[arg(long)]
    no_sound: bool,
    /// Remote store base URL (overrides config.json)
    #[arg(long)]
    remote: Option<String>,
    /// Skip the remote store entirely
    #[arg(long)]
    demo: bool,
    /// Play a local audio file as the ambient track
    #[arg(long)]
    upload: Option<PathBuf>,
    /// Never start the ambient player (headless runs)
    #[arg(long)]
    silent: bool,
    /// Energy level recorded with completed sessions
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    energy: Option<u8>,
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_theme(s: &str) -> std::result::Result<Theme, String> {
    s.parse::<Theme>().map_err(|err| err.to_string())
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            focus_minutes: self.focus,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            sessions_until_long_break: self.sessions,
            theme: self.theme,
            no_sound: self.no_sound,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load();
    if let Some(url) = &args.remote { config.remote_url = Some(url.clone()); }

    let level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    if let Err(err) = logging::init_logging(&level, &config::data_dir()) {
        eprintln!("log_init_error: {err}");
    }
    info!(event = "app_start", version = env!("CARGO_PKG_VERSION"), demo_flag = args.demo);

    let gateway = PersistenceGateway::probe(remote_store(&args, &config)).await;
    let channel: Box<dyn AudioChannel> = if args.silent {
        Box::new(NullChannel::default())
    } else {
        match SinkChannel::open() {
            Ok(channel) => Box::new(channel),
            Err(err) => {
                warn!(event = "audio_output_unavailable", error = %err);
                Box::new(NullChannel::default())
            }
        }
    };
    let mut coordinator = FocusCoordinator::bootstrap(CoordinatorParts {
        gateway,
        channel,
        chime: Box::new(SystemChime),
        notifier: Arc::new(DesktopNotifier),
        sounds_dir: config.sounds_dir.clone(),
        overrides: args.overrides(),
    })
    .await;

    if let Some(energy) = args.energy {
        let _ = coordinator.set_energy_level(Some(energy));
    }
    if let Some(path) = &args.upload {
        let _ = coordinator.register_upload(path);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut coordinator).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    coordinator.shutdown().await;
    res
}

fn remote_store(args: &Args, config: &AppConfig) -> Option<Arc<dyn RemoteStore>> {
    if args.demo {
        return None;
    }
    let (url, token) = config.remote()?;
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    match HttpRemoteStore::new(url, token, timeout) {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(event = "remote_store_unavailable", error = %err);
            None
        }
    }
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, coordinator: &mut FocusCoordinator) -> Result<()> {
    let mut events = EventStream::new();
    let mut ui_state = ui::UiState::default();
    let mut redraw = tokio::time::interval(REDRAW_RATE);

    loop {
        terminal.draw(|f| ui::render(f, coordinator, &ui_state))?;

        tokio::select! {
            wakeup = coordinator.next_wakeup() => coordinator.handle(wakeup),
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if ui::handle_key(key, coordinator, &mut ui_state) {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
            _ = redraw.tick() => {
                coordinator.poll_audio();
                ui_state.animate();
            }
        }
    }
}

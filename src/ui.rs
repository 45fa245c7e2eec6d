use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use rfocus::audio::{AudioState, BUILTIN_TRACKS};
use rfocus::session::format_mmss;
use rfocus::settings::{SettingUpdate, Theme};
use rfocus::signal::ToastLevel;
use rfocus::{FocusCoordinator, Mode, Snapshot};
use std::path::Path;

const VOLUME_STEP: f32 = 0.05;

// ============================================================================
// UI State
// ============================================================================

#[derive(PartialEq, Clone, Copy, Default)]
pub enum Prompt {
    #[default]
    Closed,
    Setting,
    Upload,
}

#[derive(Default)]
pub struct UiState {
    pub prompt: Prompt,
    pub input: String,
    pub animation_frame: u8,
}

impl UiState {
    pub fn animate(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1) % 20;
    }
}

#[derive(Clone, Copy)]
struct Palette {
    focus_color: Color,
    short_break_color: Color,
    long_break_color: Color,
    border_color: Color,
    accent_color: Color,
}

impl Palette {
    fn mode_color(&self, mode: Mode) -> Color {
        match mode {
            Mode::Focus => self.focus_color,
            Mode::ShortBreak => self.short_break_color,
            Mode::LongBreak => self.long_break_color,
        }
    }
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Nord => Palette {
            focus_color: Color::Rgb(136, 192, 255),
            short_break_color: Color::Rgb(255, 20, 60),
            long_break_color: Color::Rgb(0, 255, 100),
            border_color: Color::Rgb(100, 200, 255),
            accent_color: Color::Rgb(255, 100, 255),
        },
        Theme::Dracula => Palette {
            focus_color: Color::Rgb(189, 147, 249),
            short_break_color: Color::Rgb(255, 0, 85),
            long_break_color: Color::Rgb(0, 255, 0),
            border_color: Color::Rgb(200, 100, 255),
            accent_color: Color::Rgb(255, 0, 255),
        },
        Theme::Gruvbox => Palette {
            focus_color: Color::Rgb(254, 128, 25),
            short_break_color: Color::Rgb(255, 50, 0),
            long_break_color: Color::Rgb(255, 255, 0),
            border_color: Color::Rgb(255, 200, 100),
            accent_color: Color::Rgb(255, 150, 0),
        },
        Theme::Solarized => Palette {
            focus_color: Color::Rgb(42, 161, 152),
            short_break_color: Color::Rgb(255, 0, 0),
            long_break_color: Color::Rgb(150, 255, 0),
            border_color: Color::Rgb(100, 200, 255),
            accent_color: Color::Rgb(255, 200, 0),
        },
        Theme::Default => Palette {
            focus_color: Color::Rgb(100, 181, 246),
            short_break_color: Color::Rgb(255, 0, 100),
            long_break_color: Color::Rgb(0, 255, 150),
            border_color: Color::Rgb(0, 200, 255),
            accent_color: Color::Rgb(255, 100, 0),
        },
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Returns true when the user asked to quit.
pub fn handle_key(key: KeyEvent, coordinator: &mut FocusCoordinator, ui: &mut UiState) -> bool {
    if ui.prompt != Prompt::Closed {
        match key.code {
            KeyCode::Char(c) => ui.input.push(c),
            KeyCode::Backspace => { ui.input.pop(); }
            KeyCode::Enter => submit_prompt(coordinator, ui),
            KeyCode::Esc => {
                ui.prompt = Prompt::Closed;
                ui.input.clear();
            }
            _ => {}
        }
        return false;
    }

    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) ||
       (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)) {
        return true;
    }

    match key.code {
        KeyCode::Char(' ') => coordinator.toggle(),
        KeyCode::Char('r') => coordinator.reset(),
        KeyCode::Char('f') => coordinator.set_mode(Mode::Focus),
        KeyCode::Char('s') => coordinator.set_mode(Mode::ShortBreak),
        KeyCode::Char('l') => coordinator.set_mode(Mode::LongBreak),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = (c as u8 - b'1') as usize;
            let _ = coordinator.select_ambient_track(BUILTIN_TRACKS[idx].id);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => coordinator.adjust_volume(VOLUME_STEP),
        KeyCode::Char('-') => coordinator.adjust_volume(-VOLUME_STEP),
        KeyCode::Char('o') => coordinator.toggle_looping(),
        KeyCode::Char('m') => {
            let enabled = coordinator.settings().sound_enabled;
            let _ = coordinator.update_setting(SettingUpdate::SoundEnabled(!enabled));
        }
        KeyCode::Char('t') => {
            let next = coordinator.settings().preferred_theme.next();
            let _ = coordinator.update_setting(SettingUpdate::Theme(next));
        }
        KeyCode::Char('E') => coordinator.cycle_energy_level(),
        KeyCode::Char('e') => {
            ui.prompt = Prompt::Setting;
            ui.input.clear();
        }
        KeyCode::Char('u') => {
            ui.prompt = Prompt::Upload;
            ui.input.clear();
        }
        _ => {}
    }

    false
}

fn submit_prompt(coordinator: &mut FocusCoordinator, ui: &mut UiState) {
    let input = ui.input.trim().to_string();
    if !input.is_empty() {
        match ui.prompt {
            Prompt::Setting => {
                let (key, value) = input.split_once('=').unwrap_or((input.as_str(), ""));
                let _ = coordinator.update_setting_str(key, value);
            }
            Prompt::Upload => {
                let _ = coordinator.register_upload(Path::new(&input));
            }
            Prompt::Closed => {}
        }
    }
    ui.prompt = Prompt::Closed;
    ui.input.clear();
}

// ============================================================================
// UI Rendering
// ============================================================================

pub fn render(f: &mut Frame, coordinator: &FocusCoordinator, ui: &UiState) {
    let snap = coordinator.snapshot();
    let pal = palette(snap.theme);
    let color = pal.mode_color(snap.mode);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(4)])
        .split(f.size());

    // Header
    let mut title = vec![Span::styled(" 🍅 RFOCUS ", Style::default()
        .fg(pal.accent_color).add_modifier(Modifier::BOLD))];
    if snap.is_demo_mode {
        title.push(Span::styled(" DEMO (not saved) ", Style::default()
            .fg(Color::Black).bg(Color::Yellow)));
    }
    let header = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(pal.border_color))
        .title(Line::from(title));
    f.render_widget(header, chunks[0]);

    // Main content
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(3), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(3), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Percentage(10),
        ])
        .split(chunks[1]);

    f.render_widget(
        Paragraph::new(mode_tabs(&snap, &pal)).alignment(Alignment::Center),
        sections[1]
    );

    f.render_widget(
        Paragraph::new(snap.mode.name())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[3]
    );

    f.render_widget(
        Paragraph::new(format_mmss(snap.seconds_remaining))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().padding(Padding::vertical(1))),
        sections[5]
    );

    let status = if snap.is_running {
        format!("{} RUNNING", if ui.animation_frame < 10 { "●" } else { "○" })
    } else {
        format!("⏸  PAUSED{}", ".".repeat((ui.animation_frame / 5) as usize % 4))
    };
    f.render_widget(
        Paragraph::new(status)
            .style(Style::default()
                .fg(if snap.is_running { Color::Green } else { Color::Yellow })
                .add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[7]
    );

    f.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded))
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .percent((snap.progress * 100.0) as u16),
        sections[9]
    );

    let in_cycle = snap.sessions_completed_in_cycle % snap.sessions_until_long_break.max(1);
    let energy = snap.energy_level.map(|e| format!("  •  ⚡ {e}/5")).unwrap_or_default();
    let session_text = format!(
        "Session {} of {}  •  {} completed  •  🔥 streak {}{}",
        in_cycle + 1,
        snap.sessions_until_long_break,
        snap.sessions_completed_in_cycle,
        snap.streak,
        energy
    );
    f.render_widget(
        Paragraph::new(session_text).style(Style::default().fg(Color::Gray)).alignment(Alignment::Center),
        sections[11]
    );

    f.render_widget(
        Paragraph::new(ambient_line(&snap)).style(Style::default().fg(Color::Gray)).alignment(Alignment::Center),
        sections[13]
    );

    if let Some(toast) = coordinator.last_toast() {
        let toast_color = match toast.level {
            ToastLevel::Success => Color::Green,
            ToastLevel::Info => Color::Gray,
            ToastLevel::Warning => Color::Yellow,
            ToastLevel::Error => Color::Red,
        };
        let text = if toast.body.is_empty() {
            toast.title.clone()
        } else {
            format!("{}  {}", toast.title, toast.body)
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(toast_color)).alignment(Alignment::Center),
            sections[15]
        );
    }

    // Controls or prompt
    let footer = match ui.prompt {
        Prompt::Closed => controls(&pal),
        Prompt::Setting => prompt_lines(
            "Setting (key=value)",
            &format!("keys: {}", SettingUpdate::KEYS.join(", ")),
            &ui.input,
        ),
        Prompt::Upload => prompt_lines("Audio file path", "Enter to play, Esc to cancel", &ui.input),
    };
    f.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center).style(Style::default().fg(Color::DarkGray)),
        chunks[2]
    );
}

fn mode_tabs(snap: &Snapshot, pal: &Palette) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, mode) in Mode::ALL.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  │  "));
        }
        let label = match mode {
            Mode::Focus => "[F]ocus",
            Mode::ShortBreak => "[S]hort Break",
            Mode::LongBreak => "[L]ong Break",
        };
        let style = if mode == snap.mode {
            Style::default().fg(pal.mode_color(mode)).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(label, style));
    }
    Line::from(spans)
}

fn ambient_line(snap: &Snapshot) -> String {
    let volume = (snap.volume * 100.0).round() as u32;
    let looping = if snap.looping { "on" } else { "off" };
    match (&snap.audio, &snap.audio_track_name) {
        (AudioState::Playing(_), Some(name)) => {
            format!("♪ {name}  •  vol {volume}%  •  loop {looping}")
        }
        (AudioState::Playing(id), None) => format!("♪ {id}  •  vol {volume}%  •  loop {looping}"),
        (AudioState::Idle, _) => format!(
            "♪ ambient off  •  vol {volume}%  •  loop {looping}  •  sound {}",
            if snap.sound_enabled { "on" } else { "muted" }
        ),
    }
}

fn controls(pal: &Palette) -> Vec<Line<'static>> {
    let key = |text: &'static str| {
        Span::styled(text, Style::default().fg(pal.accent_color).add_modifier(Modifier::BOLD))
    };
    vec![
        Line::from(vec![
            key("Space"), Span::raw(" Start/Pause  •  "),
            key("R"), Span::raw(" Reset  •  "),
            key("F/S/L"), Span::raw(" Mode  •  "),
            key("E"), Span::raw(" Edit setting  •  "),
            key("Q"), Span::raw(" Quit"),
        ]),
        Line::from(vec![
            key("1-5"), Span::raw(" Ambient  •  "),
            key("+/-"), Span::raw(" Volume  •  "),
            key("O"), Span::raw(" Loop  •  "),
            key("U"), Span::raw(" Upload  •  "),
            key("M"), Span::raw(" Mute  •  "),
            key("T"), Span::raw(" Theme  •  "),
            key("Shift-E"), Span::raw(" Energy"),
        ]),
    ]
}

fn prompt_lines(label: &str, hint: &str, input: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(input.to_string(), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("█", Style::default().fg(Color::Green)),
        ]),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
    ]
}

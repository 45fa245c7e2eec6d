use crate::error::{FocusError, Result};
use crate::session::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
pub const SESSIONS_RANGE: RangeInclusive<u32> = 1..=10;

// ============================================================================
// Theme
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Nord,
    Dracula,
    Gruvbox,
    Solarized,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Default,
        Theme::Nord,
        Theme::Dracula,
        Theme::Gruvbox,
        Theme::Solarized,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Nord => "nord",
            Self::Dracula => "dracula",
            Self::Gruvbox => "gruvbox",
            Self::Solarized => "solarized",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl FromStr for Theme {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s.trim().to_lowercase())
            .ok_or_else(|| FocusError::Validation(format!("unknown theme `{s}`")))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Session settings
// ============================================================================

/// Per-user tunables for the focus cycle. One instance per user, persisted
/// through the gateway.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_until_long_break: u32,
    pub sound_enabled: bool,
    pub preferred_theme: Theme,
    pub auto_start_next: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_until_long_break: 4,
            sound_enabled: true,
            preferred_theme: Theme::Default,
            auto_start_next: false,
        }
    }
}

impl SessionSettings {
    pub fn minutes_for(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Focus => self.focus_minutes,
            Mode::ShortBreak => self.short_break_minutes,
            Mode::LongBreak => self.long_break_minutes,
        }
    }

    pub fn duration_secs(&self, mode: Mode) -> u32 {
        self.minutes_for(mode) * 60
    }

    /// Applies a validated edit and reports which mode's duration changed,
    /// if any.
    pub fn apply(&mut self, update: SettingUpdate) -> Result<Option<Mode>> {
        update.validate()?;
        let changed = match update {
            SettingUpdate::FocusMinutes(m) => {
                self.focus_minutes = m;
                Some(Mode::Focus)
            }
            SettingUpdate::ShortBreakMinutes(m) => {
                self.short_break_minutes = m;
                Some(Mode::ShortBreak)
            }
            SettingUpdate::LongBreakMinutes(m) => {
                self.long_break_minutes = m;
                Some(Mode::LongBreak)
            }
            SettingUpdate::SessionsUntilLongBreak(n) => {
                self.sessions_until_long_break = n;
                None
            }
            SettingUpdate::SoundEnabled(b) => {
                self.sound_enabled = b;
                None
            }
            SettingUpdate::Theme(t) => {
                self.preferred_theme = t;
                None
            }
            SettingUpdate::AutoStartNext(b) => {
                self.auto_start_next = b;
                None
            }
        };
        Ok(changed)
    }

    /// Remote records are not trusted to respect the UI bounds.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !MINUTES_RANGE.contains(&self.focus_minutes) {
            self.focus_minutes = defaults.focus_minutes;
        }
        if !MINUTES_RANGE.contains(&self.short_break_minutes) {
            self.short_break_minutes = defaults.short_break_minutes;
        }
        if !MINUTES_RANGE.contains(&self.long_break_minutes) {
            self.long_break_minutes = defaults.long_break_minutes;
        }
        if !SESSIONS_RANGE.contains(&self.sessions_until_long_break) {
            self.sessions_until_long_break = defaults.sessions_until_long_break;
        }
        self
    }
}

// ============================================================================
// Edits
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingUpdate {
    FocusMinutes(u32),
    ShortBreakMinutes(u32),
    LongBreakMinutes(u32),
    SessionsUntilLongBreak(u32),
    SoundEnabled(bool),
    Theme(Theme),
    AutoStartNext(bool),
}

impl SettingUpdate {
    pub const KEYS: [&'static str; 7] = [
        "focus_minutes",
        "short_break_minutes",
        "long_break_minutes",
        "sessions_until_long_break",
        "sound_enabled",
        "theme",
        "auto_start_next",
    ];

    /// Builds an edit from the `key`/`value` pair typed into the UI.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let update = match key.trim() {
            "focus_minutes" | "focusMinutes" => Self::FocusMinutes(parse_u32(value)?),
            "short_break_minutes" | "shortBreakMinutes" => {
                Self::ShortBreakMinutes(parse_u32(value)?)
            }
            "long_break_minutes" | "longBreakMinutes" => Self::LongBreakMinutes(parse_u32(value)?),
            "sessions_until_long_break" | "sessionsUntilLongBreak" => {
                Self::SessionsUntilLongBreak(parse_u32(value)?)
            }
            "sound_enabled" | "soundEnabled" => Self::SoundEnabled(parse_bool(value)?),
            "theme" | "preferred_theme" | "preferredTheme" => Self::Theme(value.parse()?),
            "auto_start_next" | "autoStartNext" => Self::AutoStartNext(parse_bool(value)?),
            other => {
                return Err(FocusError::Validation(format!(
                    "unknown setting `{other}` (expected one of {})",
                    Self::KEYS.join(", ")
                )));
            }
        };
        update.validate()?;
        Ok(update)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::FocusMinutes(m) | Self::ShortBreakMinutes(m) | Self::LongBreakMinutes(m) => {
                if !MINUTES_RANGE.contains(&m) {
                    return Err(FocusError::Validation(format!(
                        "duration must be between {} and {} minutes, got {m}",
                        MINUTES_RANGE.start(),
                        MINUTES_RANGE.end()
                    )));
                }
            }
            Self::SessionsUntilLongBreak(n) => {
                if !SESSIONS_RANGE.contains(&n) {
                    return Err(FocusError::Validation(format!(
                        "sessions until long break must be between {} and {}, got {n}",
                        SESSIONS_RANGE.start(),
                        SESSIONS_RANGE.end()
                    )));
                }
            }
            Self::SoundEnabled(_) | Self::Theme(_) | Self::AutoStartNext(_) => {}
        }
        Ok(())
    }
}

fn parse_u32(value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| FocusError::Validation(format!("`{value}` is not a whole number")))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(FocusError::Validation(format!("`{value}` is not on/off"))),
    }
}

// ============================================================================
// Command-line overrides
// ============================================================================

/// Session-local overrides layered over the loaded settings at startup.
/// They are never written back unless the user edits them later.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub focus_minutes: Option<u32>,
    pub short_break_minutes: Option<u32>,
    pub long_break_minutes: Option<u32>,
    pub sessions_until_long_break: Option<u32>,
    pub theme: Option<Theme>,
    pub no_sound: bool,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut SessionSettings) -> Result<()> {
        if let Some(m) = self.focus_minutes {
            settings.apply(SettingUpdate::FocusMinutes(m))?;
        }
        if let Some(m) = self.short_break_minutes {
            settings.apply(SettingUpdate::ShortBreakMinutes(m))?;
        }
        if let Some(m) = self.long_break_minutes {
            settings.apply(SettingUpdate::LongBreakMinutes(m))?;
        }
        if let Some(n) = self.sessions_until_long_break {
            settings.apply(SettingUpdate::SessionsUntilLongBreak(n))?;
        }
        if let Some(t) = self.theme {
            settings.preferred_theme = t;
        }
        if self.no_sound {
            settings.sound_enabled = false;
        }
        Ok(())
    }
}

/// Parses `25m`, `1h`, `90s`, `1h30m` or a bare number of minutes into whole
/// minutes, rounding partial minutes up.
pub fn parse_duration(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim().to_lowercase();
    if let Ok(m) = s.parse::<f64>() {
        return whole_minutes(m);
    }

    let mut total = 0.0;
    let mut num = String::new();

    for c in s.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'h' => { total += num.parse::<f64>().map_err(|_| "Invalid hours")? * 60.0; num.clear(); }
            'm' => { total += num.parse::<f64>().map_err(|_| "Invalid minutes")?; num.clear(); }
            's' => { total += num.parse::<f64>().map_err(|_| "Invalid seconds")? / 60.0; num.clear(); }
            _ => return Err("Invalid format".into()),
        }
    }
    if !num.is_empty() {
        return Err("Missing unit after number".into());
    }

    whole_minutes(total)
}

fn whole_minutes(total: f64) -> std::result::Result<u32, String> {
    if total <= 0.0 {
        return Err("Duration must be > 0".into());
    }
    let minutes = total.ceil() as u32;
    if !MINUTES_RANGE.contains(&minutes) {
        return Err(format!(
            "Duration must be between {} and {} minutes",
            MINUTES_RANGE.start(),
            MINUTES_RANGE.end()
        ));
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_cycle() {
        let s = SessionSettings::default();
        assert_eq!(
            (s.focus_minutes, s.short_break_minutes, s.long_break_minutes),
            (25, 5, 15)
        );
        assert_eq!(s.sessions_until_long_break, 4);
        assert!(s.sound_enabled);
        assert!(!s.auto_start_next);
    }

    #[test]
    fn apply_reports_changed_mode() {
        let mut s = SessionSettings::default();
        assert_eq!(s.apply(SettingUpdate::FocusMinutes(30)).unwrap(), Some(Mode::Focus));
        assert_eq!(s.duration_secs(Mode::Focus), 1800);
        assert_eq!(s.apply(SettingUpdate::SessionsUntilLongBreak(2)).unwrap(), None);
    }

    #[test]
    fn out_of_range_edit_leaves_settings_untouched() {
        let mut s = SessionSettings::default();
        let err = s.apply(SettingUpdate::LongBreakMinutes(0)).unwrap_err();
        assert!(matches!(err, FocusError::Validation(_)));
        assert_eq!(s, SessionSettings::default());
    }

    #[test]
    fn parse_accepts_both_key_styles() {
        assert_eq!(
            SettingUpdate::parse("focusMinutes", "30").unwrap(),
            SettingUpdate::FocusMinutes(30)
        );
        assert_eq!(
            SettingUpdate::parse("sound_enabled", "off").unwrap(),
            SettingUpdate::SoundEnabled(false)
        );
        assert_eq!(
            SettingUpdate::parse("theme", "Nord").unwrap(),
            SettingUpdate::Theme(Theme::Nord)
        );
        assert!(SettingUpdate::parse("volume", "3").is_err());
        assert!(SettingUpdate::parse("focus_minutes", "61").is_err());
    }

    #[test]
    fn sanitized_replaces_out_of_bounds_values() {
        let s = SessionSettings {
            focus_minutes: 0,
            sessions_until_long_break: 99,
            ..SessionSettings::default()
        }
        .sanitized();
        assert_eq!(s.focus_minutes, 25);
        assert_eq!(s.sessions_until_long_break, 4);
    }

    #[test]
    fn overrides_do_not_touch_unset_fields() {
        let mut s = SessionSettings::default();
        SettingsOverrides {
            focus_minutes: Some(50),
            no_sound: true,
            ..Default::default()
        }
        .apply(&mut s)
        .unwrap();
        assert_eq!(s.focus_minutes, 50);
        assert_eq!(s.short_break_minutes, 5);
        assert!(!s.sound_enabled);
    }

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration("25m"), Ok(25));
        assert_eq!(parse_duration("1h"), Ok(60));
        assert_eq!(parse_duration("90s"), Ok(2));
        assert_eq!(parse_duration("45"), Ok(45));
        assert!(parse_duration("2h").is_err());
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("ten").is_err());
    }

    #[test]
    fn theme_cycles_through_all() {
        let mut t = Theme::Default;
        for _ in 0..Theme::ALL.len() {
            t = t.next();
        }
        assert_eq!(t, Theme::Default);
        assert_eq!("dracula".parse::<Theme>().unwrap(), Theme::Dracula);
    }
}

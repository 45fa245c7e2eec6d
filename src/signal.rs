//! User-facing notifications: the toast sink and the one-shot completion
//! signal fired when a countdown runs out.

use crate::session::Mode;
use notify_rust::{Notification, Urgency};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub body: String,
}

impl Toast {
    pub fn new(level: ToastLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Fire-and-forget sink for user-visible messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: &Toast);
}

/// Desktop notifications via the session's notification daemon.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, toast: &Toast) {
        // Info toasts only go to the status line.
        let urgency = match toast.level {
            ToastLevel::Info => return,
            ToastLevel::Error => Urgency::Critical,
            ToastLevel::Warning => Urgency::Normal,
            ToastLevel::Success => Urgency::Low,
        };
        let _ = Notification::new()
            .summary(&toast.title)
            .body(&toast.body)
            .appname("rfocus")
            .icon("alarm-clock")
            .urgency(urgency)
            .show();
    }
}

/// The audible part of the completion signal.
pub trait Chime: Send {
    fn ring(&mut self);
}

/// Plays a stock freedesktop sound with whatever player is installed.
pub struct SystemChime;

impl Chime for SystemChime {
    fn ring(&mut self) {
        std::thread::spawn(|| {
            for (cmd, file) in [
                ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
                ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
                ("aplay", "/usr/share/sounds/generic.wav"),
            ] {
                if Path::new(file).exists() {
                    let _ = Command::new(cmd)
                        .arg(file)
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .spawn();
                    break;
                }
            }
        });
    }
}

/// What a completion looked like, for the caller to surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub toast: Toast,
    pub chimed: bool,
}

pub struct CompletionSignal {
    chime: Box<dyn Chime>,
    fired: u64,
}

impl CompletionSignal {
    pub fn new(chime: Box<dyn Chime>) -> Self {
        Self { chime, fired: 0 }
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Fires once per completed interval. The visual part always happens;
    /// the chime only when sound is enabled.
    pub fn fire(&mut self, finished: Mode, next: Mode, sound_enabled: bool) -> Completion {
        self.fired += 1;
        if sound_enabled {
            self.chime.ring();
        }
        debug!(event = "completion_signal", finished = %finished, chimed = sound_enabled);
        Completion {
            toast: completion_toast(finished, next),
            chimed: sound_enabled,
        }
    }
}

fn completion_toast(finished: Mode, next: Mode) -> Toast {
    let (title, body) = match (finished, next) {
        (Mode::Focus, Mode::LongBreak) => ("Long Break Time! 🌴", "Great work! Take a longer break."),
        (Mode::Focus, _) => ("Break Time! ☕", "Time for a short break."),
        _ => ("Back to Work! 🎯", "Let's focus on your next session."),
    };
    Toast::new(ToastLevel::Success, title, body)
}

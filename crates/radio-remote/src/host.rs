//! Shell-backed host: press bookkeeping plus configured tool commands.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use station_player::shell::run_logged;
use station_player::{ButtonId, HostEffect, PlaybackHost, PlayerConfig, PressTracker};

#[derive(Debug, Default)]
struct PressState {
    pressed_at: Option<Instant>,
    claimed: bool,
}

/// Per-button down/up bookkeeping fed from the input stream.
#[derive(Debug, Default)]
pub struct PressBook {
    presses: Mutex<HashMap<ButtonId, PressState>>,
}

impl PressBook {
    fn lock(&self) -> MutexGuard<'_, HashMap<ButtonId, PressState>> {
        self.presses.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Start a new physical press on `button`.
    pub fn press_down(&self, button: &ButtonId) {
        let mut presses = self.lock();
        let press = presses.entry(button.clone()).or_default();
        press.pressed_at = Some(Instant::now());
        press.claimed = false;
    }

    /// End the press and return how long it was held (at least 1 ms).
    pub fn release(&self, button: &ButtonId) -> Duration {
        let held = self
            .lock()
            .get_mut(button)
            .and_then(|press| press.pressed_at.take())
            .map(|at| at.elapsed())
            .unwrap_or_default();
        held.max(Duration::from_millis(1))
    }
}

impl PressTracker for PressBook {
    fn pressed_duration(&self, button: &ButtonId) -> Option<Duration> {
        self.lock()
            .get(button)
            .and_then(|press| press.pressed_at)
            .map(|at| at.elapsed())
    }

    fn is_action_claimed(&self, button: &ButtonId) -> bool {
        self.lock().get(button).is_some_and(|press| press.claimed)
    }

    fn claim_action(&self, button: &ButtonId) -> bool {
        let mut presses = self.lock();
        let press = presses.entry(button.clone()).or_default();
        !std::mem::replace(&mut press.claimed, true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct StatusRecord<'a> {
    now_playing: Option<&'a str>,
    at_ms: u64,
}

pub struct ShellHost {
    presses: PressBook,
    audio_control: String,
    kill_command: String,
    format: StatusFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ShellHost {
    pub fn new(config: &PlayerConfig, format: StatusFormat) -> Self {
        Self::with_writer(config, format, Box::new(std::io::stdout()))
    }

    pub fn with_writer(
        config: &PlayerConfig,
        format: StatusFormat,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            presses: PressBook::default(),
            audio_control: config.audio_control.clone(),
            kill_command: config.audio_player_kill.clone(),
            format,
            out: Mutex::new(out),
        }
    }

    pub fn presses(&self) -> &PressBook {
        &self.presses
    }

    fn render(&self, text: &str) -> String {
        match self.format {
            StatusFormat::Text => text.to_string(),
            StatusFormat::Json => {
                let at_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                let record = StatusRecord {
                    now_playing: (!text.is_empty()).then_some(text),
                    at_ms,
                };
                serde_json::to_string(&record).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "status encode failed");
                    String::new()
                })
            }
        }
    }
}

impl PressTracker for ShellHost {
    fn pressed_duration(&self, button: &ButtonId) -> Option<Duration> {
        self.presses.pressed_duration(button)
    }

    fn is_action_claimed(&self, button: &ButtonId) -> bool {
        self.presses.is_action_claimed(button)
    }

    fn claim_action(&self, button: &ButtonId) -> bool {
        self.presses.claim_action(button)
    }
}

impl PlaybackHost for ShellHost {
    fn stop_other_playback(&self) {
        run_logged(&self.kill_command);
    }

    fn print_status(&self, text: &str) {
        let line = self.render(text);
        let mut out = self.out.lock().unwrap_or_else(|err| err.into_inner());
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "status write failed");
        }
    }

    fn side_effect(&self, effect: HostEffect) {
        match effect {
            HostEffect::Unmute => {
                if self.audio_control.trim().is_empty() {
                    return;
                }
                run_logged(&format!("{} on", self.audio_control));
            }
            other => tracing::debug!(?other, "side effect ignored"),
        }
    }
}

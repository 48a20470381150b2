use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// Fixed delays driving press classification and session handoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timings {
    /// Hold time after which a press counts as long.
    pub long_press: Duration,
    /// Poll interval of the deferred long-press check.
    pub poll_interval: Duration,
    /// Pause after stopping an old session before starting a new one.
    pub settle_delay: Duration,
    /// Delay after process start before the unmute side effect.
    pub unmute_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
            settle_delay: Duration::from_millis(200),
            unmute_delay: Duration::from_millis(500),
        }
    }
}

/// External tool invocations and timings, overridable from `config.txt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Mixer command prefix; `on` is appended to unmute.
    pub audio_control: String,
    /// Player command; the quoted source is appended.
    pub audio_player: String,
    /// Command that terminates the player.
    pub audio_player_kill: String,
    pub timings: Timings,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_control: "amixer set Master -q".to_string(),
            audio_player: "cvlc --play-and-exit".to_string(),
            audio_player_kill: "pkill -TERM vlc".to_string(),
            timings: Timings::default(),
        }
    }
}

impl PlayerConfig {
    /// Apply `key=value` lines on top of the defaults.
    pub fn parse(text: &str) -> Self {
        let mut cfg = Self::default();
        for raw in text.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            cfg.apply(key.trim(), value.trim());
        }
        cfg
    }

    /// Load overrides from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?path, "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("read config {:?}", path)),
        };
        tracing::info!(path = ?path, "config loaded");
        Ok(Self::parse(&raw))
    }

    fn apply(&mut self, key: &str, value: &str) {
        tracing::debug!(key, value, "config entry");
        match key {
            "audiocontrol" => self.audio_control = value.to_string(),
            "audioplayer" => self.audio_player = value.to_string(),
            "audioplayerkill" => self.audio_player_kill = value.to_string(),
            "longpressms" => set_millis(&mut self.timings.long_press, key, value),
            "pollms" => set_millis(&mut self.timings.poll_interval, key, value),
            "settlems" => set_millis(&mut self.timings.settle_delay, key, value),
            "unmutems" => set_millis(&mut self.timings.unmute_delay, key, value),
            _ => tracing::debug!(key, "ignoring unknown config key"),
        }
    }
}

fn set_millis(slot: &mut Duration, key: &str, value: &str) {
    match value.parse::<u64>() {
        Ok(ms) => *slot = Duration::from_millis(ms),
        Err(_) => tracing::warn!(key, value, "config value is not a millisecond count"),
    }
}

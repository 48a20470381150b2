//! Capabilities the embedding host provides to the playback core.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque identity of a physical control.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ButtonId(Arc<str>);

impl ButtonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ButtonId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ButtonId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hardware or display side effects the core may request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostEffect {
    /// Restore audio output after a previous abrupt kill may have left it muted.
    Unmute,
}

/// Debounced press bookkeeping owned by the host.
pub trait PressTracker: Send + Sync {
    /// Time the button has been held so far, or `None` once it is released.
    fn pressed_duration(&self, button: &ButtonId) -> Option<Duration>;

    /// Whether the current physical press has already been classified.
    fn is_action_claimed(&self, button: &ButtonId) -> bool;

    /// Mark the current press as classified. Returns `true` for the first
    /// caller only.
    fn claim_action(&self, button: &ButtonId) -> bool;
}

/// Playback-related side effects the host performs on behalf of the core.
pub trait PlaybackHost: Send + Sync {
    /// Stop any audio that may have been started outside this controller.
    fn stop_other_playback(&self);

    /// Show the "now playing" text. An empty string clears the display.
    fn print_status(&self, text: &str);

    fn side_effect(&self, effect: HostEffect);
}

/// Full host capability set.
pub trait Host: PressTracker + PlaybackHost {}

impl<T: PressTracker + PlaybackHost> Host for T {}

//! Single-button station player.
//!
//! One control cycles forward (short press) and backward (long press) through
//! a station list, playing exactly one station at a time through an external
//! player process. The host supplies button signals and side effects through
//! the traits in [`host`]; [`controller::RadioController`] is the entry point.

pub mod config;
pub mod controller;
pub mod coordinator;
pub mod cursor;
pub mod error;
pub mod host;
pub mod press;
pub mod shell;
pub mod stations;
pub mod status;
pub mod supervisor;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PlayerConfig, Timings};
pub use controller::RadioController;
pub use error::PlayerError;
pub use host::{ButtonId, HostEffect, PlaybackHost, PressTracker};
pub use press::ButtonEvent;
pub use stations::{StationEntry, StationList};
pub use status::StatusSnapshot;

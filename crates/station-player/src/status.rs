use serde::Serialize;

use crate::coordinator::CoordinatorPhase;
use crate::stations::StationEntry;

/// Status shown when navigation is attempted without any stations.
pub const NO_STATIONS: &str = "no stations";

/// Point-in-time view of the controller for hosts and logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Status line of the selected station while a session is starting or
    /// playing.
    pub now_playing: Option<String>,
    /// Zero-based index of the selected station.
    pub index: Option<usize>,
    /// Number of stations in the list.
    pub total: usize,
    pub phase: CoordinatorPhase,
}

/// `"<label> <position>/<total>"` with a one-based position.
pub fn status_line(entry: &StationEntry, index: usize, total: usize) -> String {
    format!("{} {}/{}", entry.label(), index + 1, total)
}

impl StatusSnapshot {
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            CoordinatorPhase::Starting | CoordinatorPhase::Playing
        )
    }
}

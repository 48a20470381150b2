//! Station cursor: current position in the list with wraparound.

use crate::error::PlayerError;
use crate::host::ButtonId;
use crate::stations::{StationEntry, StationList};

/// Position in the station list plus the button that last moved it.
///
/// `index` stays within `0..len` whenever the list is non-empty. A fresh
/// cursor sits on the last entry so the first advance lands on index 0.
#[derive(Debug, Default)]
pub struct StationCursor {
    index: usize,
    last_button: Option<ButtonId>,
}

impl StationCursor {
    pub fn new(list: &StationList) -> Self {
        Self {
            index: list.len().saturating_sub(1),
            last_button: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_button(&self) -> Option<&ButtonId> {
        self.last_button.as_ref()
    }

    /// Rewind to the end of the list when a different button is pressed.
    ///
    /// Returns `true` when the cursor was reset.
    pub fn reset_if_button_changed(&mut self, button: &ButtonId, list: &StationList) -> bool {
        if self.last_button.as_ref() == Some(button) {
            return false;
        }
        self.index = list.len().saturating_sub(1);
        self.last_button = Some(button.clone());
        true
    }

    pub fn advance<'a>(&mut self, list: &'a StationList) -> Result<&'a StationEntry, PlayerError> {
        let len = list.len();
        if len == 0 {
            return Err(PlayerError::EmptyList);
        }
        self.index = (self.index + 1) % len;
        list.get(self.index).ok_or(PlayerError::EmptyList)
    }

    pub fn rewind<'a>(&mut self, list: &'a StationList) -> Result<&'a StationEntry, PlayerError> {
        let len = list.len();
        if len == 0 {
            return Err(PlayerError::EmptyList);
        }
        self.index = (self.index % len + len - 1) % len;
        list.get(self.index).ok_or(PlayerError::EmptyList)
    }
}

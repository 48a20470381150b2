//! Single-button radio controller.
//!
//! Owns the station list, the cursor and the coordinator for one playback
//! slot. [`RadioController::handle_button`] is the host's entry point and
//! never blocks beyond the navigation mutex.
//!
//! An optional second list serves presses the host flags as long. Both lists
//! share one cursor.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Timings;
use crate::coordinator::{CoordinatorPhase, PlaybackCoordinator, PlaybackRequest};
use crate::cursor::StationCursor;
use crate::host::{ButtonId, Host, PlaybackHost, PressTracker};
use crate::press::{ButtonEvent, PressClassifier, PressOutcome};
use crate::stations::StationList;
use crate::status::{NO_STATIONS, StatusSnapshot, status_line};
use crate::supervisor::ProcessSupervisor;
use crate::task::WorkGroup;

/// Which station list a press navigates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListChoice {
    Primary,
    Long,
}

#[derive(Clone, Copy, Debug)]
struct Selection {
    list: ListChoice,
    index: usize,
}

/// Cursor and selection, guarded together by one mutex.
struct Navigation {
    cursor: StationCursor,
    selected: Option<Selection>,
    /// Set by `shutdown`; no further playback is dispatched.
    closed: bool,
}

struct ControllerInner {
    stations: StationList,
    long_stations: Option<StationList>,
    nav: Mutex<Navigation>,
    classifier: PressClassifier,
    coordinator: PlaybackCoordinator,
    host: Arc<dyn PlaybackHost>,
    work: WorkGroup,
}

#[derive(Clone)]
pub struct RadioController {
    inner: Arc<ControllerInner>,
}

impl RadioController {
    pub fn new<H: Host + 'static>(
        stations: StationList,
        host: Arc<H>,
        supervisor: Arc<dyn ProcessSupervisor>,
        timings: Timings,
    ) -> Self {
        let work = WorkGroup::new();
        let tracker: Arc<dyn PressTracker> = host.clone();
        let playback_host: Arc<dyn PlaybackHost> = host;
        let classifier = PressClassifier::new(tracker, timings.clone(), work.clone());
        let coordinator =
            PlaybackCoordinator::new(playback_host.clone(), supervisor, timings, work.clone());
        let cursor = StationCursor::new(&stations);
        Self {
            inner: Arc::new(ControllerInner {
                stations,
                long_stations: None,
                nav: Mutex::new(Navigation {
                    cursor,
                    selected: None,
                    closed: false,
                }),
                classifier,
                coordinator,
                host: playback_host,
                work,
            }),
        }
    }

    /// Use `long_stations` for presses the host reports as long.
    ///
    /// Must be called before the controller is cloned or used.
    pub fn with_long_stations(mut self, long_stations: StationList) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.long_stations = Some(long_stations),
            None => tracing::warn!("controller already shared; long station list ignored"),
        }
        self
    }

    /// Feed one raw press signal from the host. Returns immediately.
    pub fn handle_button(&self, event: ButtonEvent) {
        let list = if event.long_press && self.inner.long_stations.is_some() {
            ListChoice::Long
        } else {
            ListChoice::Primary
        };
        {
            let mut nav = self.inner.nav();
            if nav
                .cursor
                .reset_if_button_changed(&event.button, self.inner.list(list))
            {
                tracing::debug!(button = %event.button, "new button; cursor reset");
            }
        }
        let inner = self.inner.clone();
        let button = event.button.clone();
        self.inner
            .classifier
            .classify(event, move |outcome| inner.dispatch(&button, list, outcome));
    }

    /// Stop the live session, if any, and cancel a handoff in flight.
    pub fn stop(&self) -> bool {
        self.inner.coordinator.stop()
    }

    /// Refuse further presses, stop playback and wait for the drain.
    ///
    /// Returns `true` when everything wound down within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.inner.nav().closed = true;
        self.inner.coordinator.stop();
        self.inner.work.wait(timeout)
    }

    pub fn status(&self) -> StatusSnapshot {
        let phase = self.inner.coordinator.phase();
        let selected = self.inner.nav().selected;
        let list = selected.map_or(ListChoice::Primary, |sel| sel.list);
        let stations = self.inner.list(list);
        let total = stations.len();
        let now_playing = match phase {
            CoordinatorPhase::Starting | CoordinatorPhase::Playing => selected.and_then(|sel| {
                stations
                    .get(sel.index)
                    .map(|entry| status_line(entry, sel.index, total))
            }),
            CoordinatorPhase::Idle | CoordinatorPhase::Stopping => None,
        };
        StatusSnapshot {
            now_playing,
            index: selected.map(|sel| sel.index),
            total,
            phase,
        }
    }

    pub fn stations(&self) -> &StationList {
        &self.inner.stations
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.inner.coordinator
    }

    /// Wait for press checks, handoffs and sessions to finish.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        self.inner.work.wait(timeout)
    }
}

impl ControllerInner {
    fn nav(&self) -> MutexGuard<'_, Navigation> {
        self.nav.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn list(&self, choice: ListChoice) -> &StationList {
        match (choice, &self.long_stations) {
            (ListChoice::Long, Some(long)) => long,
            _ => &self.stations,
        }
    }

    fn dispatch(&self, button: &ButtonId, list: ListChoice, outcome: PressOutcome) {
        let mut nav = self.nav();
        if nav.closed {
            tracing::debug!(button = %button, ?outcome, "controller closed; press ignored");
            return;
        }
        let stations = self.list(list);
        if stations.is_empty() {
            tracing::warn!(button = %button, "no stations to play");
            self.host.print_status(NO_STATIONS);
            return;
        }
        let Some(ticket) = self.coordinator.try_begin_handoff() else {
            tracing::info!(button = %button, ?outcome, "handoff in progress; press dropped");
            return;
        };
        let moved = match outcome {
            PressOutcome::Advance => nav.cursor.advance(stations),
            PressOutcome::Rewind => nav.cursor.rewind(stations),
        };
        let station = match moved {
            Ok(entry) => entry.clone(),
            Err(e) => {
                tracing::warn!(button = %button, error = %e, "navigation failed");
                self.host.print_status(NO_STATIONS);
                return;
            }
        };
        let index = nav.cursor.index();
        nav.selected = Some(Selection { list, index });
        let status = status_line(&station, index, stations.len());
        tracing::info!(button = %button, ?outcome, ?list, station = %station.label(), index, "station selected");
        self.coordinator
            .start(ticket, PlaybackRequest { station, status });
    }
}

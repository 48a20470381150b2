//! Playback session coordinator.
//!
//! Owns the single playback slot. A request first stops whatever is playing,
//! waits the settle delay, registers a fresh session as live and launches the
//! player. Each session is observed by two watchers:
//!
//! - the stop-watcher waits on the session's stop channel, releases the live
//!   registration if it still holds it and kills the process unless it has
//!   already exited;
//! - the exit-watcher waits for natural termination and, while the session is
//!   still live, feeds [`StopReason::ProcessExited`] into the same channel so
//!   the stop-watcher runs the teardown.
//!
//! Registration is only ever cleared through [`SessionToken`] comparison, so a
//! stale session can never clear a newer one. Only one handoff may be in
//! flight; further requests are dropped until it registers its session. A
//! stop that arrives while a handoff is in flight cancels it before the
//! player is launched.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::config::Timings;
use crate::host::{HostEffect, PlaybackHost};
use crate::stations::StationEntry;
use crate::supervisor::{PlayerProcess, ProcessSupervisor, StreamKind, drain_lines};
use crate::task::{self, WorkGroup, WorkGuard, spawn_supervised};

/// Identity of one playback attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SessionToken {
    instance: u64,
}

impl SessionToken {
    pub fn instance(&self) -> u64 {
        self.instance
    }
}

/// Why a session's stop channel fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A newer request is taking over the slot.
    Replaced,
    /// Stop requested from outside the controller.
    External,
    /// The player exited on its own.
    ProcessExited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorPhase {
    Idle,
    Starting,
    Playing,
    Stopping,
}

/// One station to play plus the status text to show while it plays.
#[derive(Clone, Debug)]
pub struct PlaybackRequest {
    pub station: StationEntry,
    pub status: String,
}

struct LiveSession {
    token: SessionToken,
    stop_tx: Sender<StopReason>,
}

#[derive(Default)]
struct CoordinatorState {
    live: Option<LiveSession>,
    handoff_in_progress: bool,
    /// Set by `stop()` during a handoff; checked before registration.
    stop_requested: bool,
}

struct Inner {
    state: Mutex<CoordinatorState>,
    host: Arc<dyn PlaybackHost>,
    supervisor: Arc<dyn ProcessSupervisor>,
    timings: Timings,
    next_instance: AtomicU64,
    work: WorkGroup,
    /// Units held by session watchers only; drives the `Stopping` phase.
    sessions: WorkGroup,
}

/// Handle to the coordinator; cheap to clone.
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<Inner>,
}

/// Proof that the caller won the single handoff slot.
///
/// Dropping an unused ticket, including during unwinding, frees the slot.
pub struct HandoffTicket {
    inner: Arc<Inner>,
    armed: bool,
}

impl PlaybackCoordinator {
    pub fn new(
        host: Arc<dyn PlaybackHost>,
        supervisor: Arc<dyn ProcessSupervisor>,
        timings: Timings,
        work: WorkGroup,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CoordinatorState::default()),
                host,
                supervisor,
                timings,
                next_instance: AtomicU64::new(0),
                work,
                sessions: WorkGroup::new(),
            }),
        }
    }

    /// Claim the handoff slot, or `None` when another handoff is in flight.
    pub fn try_begin_handoff(&self) -> Option<HandoffTicket> {
        let mut state = self.inner.state();
        if state.handoff_in_progress {
            tracing::debug!("handoff already in progress; dropping request");
            return None;
        }
        state.handoff_in_progress = true;
        state.stop_requested = false;
        Some(HandoffTicket {
            inner: self.inner.clone(),
            armed: true,
        })
    }

    /// Run the handoff for `request` on a supervised task. Returns at once.
    pub fn start(&self, ticket: HandoffTicket, request: PlaybackRequest) {
        let inner = self.inner.clone();
        spawn_supervised("handoff", self.inner.work.add(), move || {
            inner.handoff(ticket, request)
        });
    }

    /// Claim the slot and start `request`. Returns `false` if it was dropped.
    pub fn request_playback(&self, request: PlaybackRequest) -> bool {
        match self.try_begin_handoff() {
            Some(ticket) => {
                self.start(ticket, request);
                true
            }
            None => {
                tracing::info!(station = %request.station.label(), "request dropped");
                false
            }
        }
    }

    /// Signal the live session to stop and cancel any handoff in flight.
    ///
    /// Returns `false` when there was nothing to stop.
    pub fn stop(&self) -> bool {
        let mut state = self.inner.state();
        let cancelled = state.handoff_in_progress;
        if cancelled {
            tracing::debug!("external stop; cancelling handoff");
            state.stop_requested = true;
        }
        match state.live.as_ref() {
            Some(live) => {
                tracing::debug!(instance = live.token.instance, "external stop");
                let _ = live.stop_tx.try_send(StopReason::External);
                true
            }
            None => cancelled,
        }
    }

    pub fn phase(&self) -> CoordinatorPhase {
        let state = self.inner.state();
        if state.handoff_in_progress {
            CoordinatorPhase::Starting
        } else if state.live.is_some() {
            CoordinatorPhase::Playing
        } else if self.inner.sessions.outstanding() > 0 {
            CoordinatorPhase::Stopping
        } else {
            CoordinatorPhase::Idle
        }
    }

    pub fn live_session(&self) -> Option<SessionToken> {
        self.inner.state().live.as_ref().map(|live| live.token)
    }

    /// Whether `token` still owns the playback slot.
    pub fn is_live(&self, token: SessionToken) -> bool {
        self.inner.is_live(token)
    }

    pub fn handoff_in_progress(&self) -> bool {
        self.inner.state().handoff_in_progress
    }

    /// Block until all handoffs and sessions have finished.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        self.inner.work.wait(timeout)
    }
}

impl HandoffTicket {
    fn release(&mut self, state: &mut CoordinatorState) {
        if self.armed {
            state.handoff_in_progress = false;
            self.armed = false;
        }
    }
}

impl Drop for HandoffTicket {
    fn drop(&mut self) {
        if self.armed {
            let inner = self.inner.clone();
            self.release(&mut inner.state());
        }
    }
}

/// Shared per-session bookkeeping between the two watchers.
struct Session {
    token: SessionToken,
    pid: u32,
    exited: AtomicBool,
    completion: Mutex<Option<WorkGuard>>,
}

impl Session {
    /// Mark the session's unit of work done. Only the first call has effect.
    fn complete(&self) {
        let guard = self
            .completion
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take();
        if guard.is_some() {
            tracing::debug!(instance = self.token.instance, "session complete");
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn is_live(&self, token: SessionToken) -> bool {
        self.state()
            .live
            .as_ref()
            .is_some_and(|live| live.token == token)
    }

    /// Clear the live registration if `token` still holds it.
    fn release_if_live(&self, token: SessionToken) -> bool {
        let mut state = self.state();
        if state.live.as_ref().is_some_and(|live| live.token == token) {
            state.live = None;
            true
        } else {
            false
        }
    }

    fn handoff(self: Arc<Self>, mut ticket: HandoffTicket, request: PlaybackRequest) {
        let previous = self
            .state()
            .live
            .as_ref()
            .map(|live| (live.token, live.stop_tx.clone()));
        match previous {
            Some((token, stop_tx)) => {
                tracing::debug!(instance = token.instance, "stopping previous session");
                let _ = stop_tx.try_send(StopReason::Replaced);
            }
            None => {
                tracing::debug!("no live session; stopping other playback");
                self.host.stop_other_playback();
            }
        }
        std::thread::sleep(self.timings.settle_delay);
        self.host.print_status(&request.status);

        let token = SessionToken {
            instance: self.next_instance.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        {
            let mut state = self.state();
            if std::mem::take(&mut state.stop_requested) {
                ticket.release(&mut state);
                drop(state);
                tracing::info!(station = %request.station.label(), "handoff cancelled by stop");
                self.host.print_status("");
                return;
            }
            state.live = Some(LiveSession {
                token,
                stop_tx: stop_tx.clone(),
            });
            ticket.release(&mut state);
        }
        tracing::info!(
            instance = token.instance,
            station = %request.station.label(),
            "starting playback"
        );

        let started = task::run_guarded("player-start", || {
            self.supervisor.start(&request.station.source)
        })
        .and_then(|result| result);
        let process = match started {
            Ok(process) => process,
            Err(e) => {
                tracing::warn!(instance = token.instance, error = %e, "player did not start");
                self.release_if_live(token);
                self.host.print_status("");
                return;
            }
        };
        self.launch_session(token, stop_tx, stop_rx, process);
    }

    fn launch_session(
        self: &Arc<Self>,
        token: SessionToken,
        stop_tx: Sender<StopReason>,
        stop_rx: Receiver<StopReason>,
        process: PlayerProcess,
    ) {
        let PlayerProcess {
            pid,
            stdout,
            stderr,
            exit,
        } = process;
        let instance = token.instance;
        let session = Arc::new(Session {
            token,
            pid,
            exited: AtomicBool::new(false),
            completion: Mutex::new(Some(self.work.add())),
        });
        tracing::debug!(instance, pid, "player running");

        for (kind, reader) in [(StreamKind::Stdout, stdout), (StreamKind::Stderr, stderr)] {
            let Some(reader) = reader else { continue };
            spawn_supervised(kind.as_str(), self.work.add(), move || {
                if let Err(e) = drain_lines(reader, kind, instance) {
                    tracing::warn!(instance, error = %e, "output drain ended");
                }
            });
        }

        {
            let inner = self.clone();
            spawn_supervised("unmute", self.work.add(), move || {
                std::thread::sleep(inner.timings.unmute_delay);
                tracing::debug!(instance, "unmute");
                inner.host.side_effect(HostEffect::Unmute);
            });
        }

        {
            let inner = self.clone();
            let session = session.clone();
            let session_unit = self.sessions.add();
            spawn_supervised("stop-watcher", self.work.add(), move || {
                let _session_unit = session_unit;
                let reason = stop_rx.recv().unwrap_or(StopReason::External);
                if inner.release_if_live(session.token) {
                    tracing::debug!(instance, ?reason, "session released");
                }
                if session.exited.load(Ordering::SeqCst) {
                    tracing::debug!(instance, "playback has finished");
                } else {
                    tracing::debug!(instance, ?reason, "playback being killed");
                    inner.supervisor.terminate(session.pid);
                }
                session.complete();
            });
        }

        {
            let inner = self.clone();
            let started_at = Instant::now();
            let session_unit = self.sessions.add();
            spawn_supervised("exit-watcher", self.work.add(), move || {
                let _session_unit = session_unit;
                let report = exit.wait();
                session.exited.store(true, Ordering::SeqCst);
                tracing::debug!(
                    instance,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    success = report.success,
                    detail = %report.detail,
                    "player exited"
                );
                if inner.is_live(session.token) {
                    // A full channel means a stop is already pending.
                    let _ = stop_tx.try_send(StopReason::ProcessExited);
                } else {
                    session.complete();
                }
            });
        }
    }
}

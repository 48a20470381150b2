//! Deterministic fakes shared by unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::config::Timings;
use crate::error::PlayerError;
use crate::host::{ButtonId, HostEffect, PlaybackHost, PressTracker};
use crate::supervisor::{ExitReport, PlayerProcess, ProcessExit, ProcessSupervisor};

pub(crate) fn fast_timings() -> Timings {
    Timings {
        long_press: Duration::from_millis(60),
        poll_interval: Duration::from_millis(5),
        settle_delay: Duration::from_millis(10),
        unmute_delay: Duration::from_millis(5),
    }
}

/// Poll `cond` for up to two seconds.
pub(crate) fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Default)]
struct FakePress {
    down_at: Option<Instant>,
    claimed: bool,
}

/// Host that records every call and keeps simple press bookkeeping.
#[derive(Default)]
pub(crate) struct RecordingHost {
    statuses: Mutex<Vec<String>>,
    effects: Mutex<Vec<HostEffect>>,
    stop_other: AtomicUsize,
    presses: Mutex<HashMap<ButtonId, FakePress>>,
}

impl RecordingHost {
    pub(crate) fn press_down(&self, button: &ButtonId) {
        let mut presses = self.presses.lock().unwrap();
        let press = presses.entry(button.clone()).or_default();
        press.down_at = Some(Instant::now());
        press.claimed = false;
    }

    pub(crate) fn release(&self, button: &ButtonId) -> Duration {
        let mut presses = self.presses.lock().unwrap();
        presses
            .get_mut(button)
            .and_then(|press| press.down_at.take())
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    pub(crate) fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub(crate) fn effects(&self) -> Vec<HostEffect> {
        self.effects.lock().unwrap().clone()
    }

    pub(crate) fn stop_other_calls(&self) -> usize {
        self.stop_other.load(Ordering::SeqCst)
    }
}

impl PressTracker for RecordingHost {
    fn pressed_duration(&self, button: &ButtonId) -> Option<Duration> {
        let presses = self.presses.lock().unwrap();
        presses
            .get(button)
            .and_then(|press| press.down_at)
            .map(|at| at.elapsed())
    }

    fn is_action_claimed(&self, button: &ButtonId) -> bool {
        let presses = self.presses.lock().unwrap();
        presses.get(button).is_some_and(|press| press.claimed)
    }

    fn claim_action(&self, button: &ButtonId) -> bool {
        let mut presses = self.presses.lock().unwrap();
        let press = presses.entry(button.clone()).or_default();
        !std::mem::replace(&mut press.claimed, true)
    }
}

impl PlaybackHost for RecordingHost {
    fn stop_other_playback(&self) {
        self.stop_other.fetch_add(1, Ordering::SeqCst);
    }

    fn print_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn side_effect(&self, effect: HostEffect) {
        self.effects.lock().unwrap().push(effect);
    }
}

/// Supervisor whose processes run until terminated or finished by the test.
/// Pids start at 1 and count up per successful start.
#[derive(Default)]
pub(crate) struct FakeSupervisor {
    started: Mutex<Vec<String>>,
    terminated: Mutex<Vec<u32>>,
    running: Mutex<HashMap<u32, Sender<ExitReport>>>,
    last_pid: AtomicU32,
    fail: AtomicBool,
    panic: AtomicBool,
    stubborn: AtomicBool,
}

impl FakeSupervisor {
    pub(crate) fn fail_starts(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_start(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    /// While set, `terminate` is recorded but the process keeps running.
    pub(crate) fn ignore_terminate(&self, stubborn: bool) {
        self.stubborn.store(stubborn, Ordering::SeqCst);
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub(crate) fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }

    /// Let process `pid` exit on its own.
    pub(crate) fn finish(&self, pid: u32) {
        self.exit(
            pid,
            ExitReport {
                success: true,
                detail: "exit status: 0".to_string(),
            },
        );
    }

    fn exit(&self, pid: u32, report: ExitReport) {
        if let Some(tx) = self.running.lock().unwrap().remove(&pid) {
            let _ = tx.send(report);
        }
    }
}

struct FakeExit(crossbeam_channel::Receiver<ExitReport>);

impl ProcessExit for FakeExit {
    fn wait(self: Box<Self>) -> ExitReport {
        self.0.recv().unwrap_or(ExitReport {
            success: false,
            detail: "supervisor dropped".to_string(),
        })
    }
}

impl ProcessSupervisor for FakeSupervisor {
    fn start(&self, source: &str) -> Result<PlayerProcess, PlayerError> {
        if self.panic.load(Ordering::SeqCst) {
            panic!("fake supervisor exploded");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlayerError::Start {
                command: format!("fake \"{source}\""),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake player missing"),
            });
        }
        let pid = self.last_pid.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.running.lock().unwrap().insert(pid, tx);
        self.started.lock().unwrap().push(source.to_string());
        Ok(PlayerProcess {
            pid,
            stdout: Some(Box::new(Cursor::new(b"buffering\n".to_vec()))),
            stderr: Some(Box::new(Cursor::new(b"core libvlc: noise\n".to_vec()))),
            exit: Box::new(FakeExit(rx)),
        })
    }

    fn terminate(&self, pid: u32) {
        self.terminated.lock().unwrap().push(pid);
        if self.stubborn.load(Ordering::SeqCst) {
            return;
        }
        self.exit(
            pid,
            ExitReport {
                success: false,
                detail: "signal: 15 (SIGTERM)".to_string(),
            },
        );
    }
}

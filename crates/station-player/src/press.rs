//! Short/long press disambiguation.
//!
//! A press-down schedules a deferred check that polls the host until the
//! long-press threshold. A release dispatches a short press synchronously.
//! Both paths go through [`PressTracker::claim_action`], so whichever claims
//! first wins and each physical press yields exactly one outcome.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Timings;
use crate::host::{ButtonId, PressTracker};
use crate::task::{WorkGroup, spawn_supervised};

/// Decision for one physical press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// Short press: move to the next station.
    Advance,
    /// Long press: move to the previous station.
    Rewind,
}

/// Raw press signal delivered by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    /// Set when the host itself already judged the press to be long.
    pub long_press: bool,
    /// Held duration; zero while the button is still down.
    pub held: Duration,
}

impl ButtonEvent {
    /// Button went down; duration not yet known.
    pub fn down(button: ButtonId) -> Self {
        Self {
            button,
            long_press: false,
            held: Duration::ZERO,
        }
    }

    /// Button released after `held`.
    pub fn release(button: ButtonId, held: Duration) -> Self {
        Self {
            button,
            long_press: false,
            held: held.max(Duration::from_millis(1)),
        }
    }

    /// Release that the host reports as a long press.
    pub fn long_release(button: ButtonId, held: Duration) -> Self {
        Self {
            long_press: true,
            ..Self::release(button, held)
        }
    }

    pub fn is_still_held(&self) -> bool {
        self.held.is_zero()
    }
}

pub struct PressClassifier {
    tracker: Arc<dyn PressTracker>,
    timings: Timings,
    work: WorkGroup,
}

impl PressClassifier {
    pub fn new(tracker: Arc<dyn PressTracker>, timings: Timings, work: WorkGroup) -> Self {
        Self {
            tracker,
            timings,
            work,
        }
    }

    /// Classify `event`, calling `dispatch` at most once for this press.
    ///
    /// Never blocks: a press-down only schedules the deferred check.
    pub fn classify<F>(&self, event: ButtonEvent, dispatch: F)
    where
        F: FnOnce(PressOutcome) + Send + 'static,
    {
        if event.is_still_held() {
            let tracker = self.tracker.clone();
            let timings = self.timings.clone();
            let button = event.button;
            spawn_supervised("long-press-check", self.work.add(), move || {
                if await_long_press(tracker.as_ref(), &button, &timings) {
                    tracing::debug!(button = %button, "long press");
                    dispatch(PressOutcome::Rewind);
                }
            });
            return;
        }

        let outcome = if event.long_press {
            PressOutcome::Rewind
        } else {
            PressOutcome::Advance
        };
        if self.tracker.claim_action(&event.button) {
            tracing::debug!(button = %event.button, ?outcome, held_ms = event.held.as_millis() as u64, "press released");
            dispatch(outcome);
        } else {
            tracing::debug!(button = %event.button, "press already handled");
        }
    }
}

/// Poll until the press has been held past the threshold. Returns `true` if
/// this check claimed the press as long.
///
/// The held duration only grows for one physical press, so a shorter reading
/// means the button was released and pressed again; that newer press has its
/// own check.
fn await_long_press(tracker: &dyn PressTracker, button: &ButtonId, timings: &Timings) -> bool {
    let mut last_held = Duration::ZERO;
    loop {
        if tracker.is_action_claimed(button) {
            return false;
        }
        let Some(held) = tracker.pressed_duration(button) else {
            return false;
        };
        if held < last_held {
            tracing::debug!(button = %button, "press replaced; long-press check abandoned");
            return false;
        }
        if held >= timings.long_press {
            break;
        }
        last_held = held;
        std::thread::sleep(timings.poll_interval.min(timings.long_press - held));
    }
    tracker.claim_action(button)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingHost, fast_timings, wait_until};
    use std::sync::Mutex;
    use std::time::Instant;

    struct Fixture {
        host: Arc<RecordingHost>,
        classifier: PressClassifier,
        work: WorkGroup,
        outcomes: Arc<Mutex<Vec<PressOutcome>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_timings(fast_timings())
        }

        fn with_timings(timings: Timings) -> Self {
            let host = Arc::new(RecordingHost::default());
            let work = WorkGroup::new();
            let classifier = PressClassifier::new(host.clone(), timings, work.clone());
            Self {
                host,
                classifier,
                work,
                outcomes: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn classify(&self, event: ButtonEvent) {
            let outcomes = self.outcomes.clone();
            self.classifier
                .classify(event, move |outcome| outcomes.lock().unwrap().push(outcome));
        }

        fn outcomes(&self) -> Vec<PressOutcome> {
            self.outcomes.lock().unwrap().clone()
        }
    }

    #[test]
    fn quick_release_dispatches_advance_once() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");

        fx.host.press_down(&button);
        fx.classify(ButtonEvent::down(button.clone()));
        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::release(button.clone(), held));

        assert!(fx.work.wait(Duration::from_secs(2)));
        assert_eq!(fx.outcomes(), [PressOutcome::Advance]);
    }

    #[test]
    fn hold_past_threshold_dispatches_rewind_once() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");

        fx.host.press_down(&button);
        fx.classify(ButtonEvent::down(button.clone()));
        assert!(wait_until(|| !fx.outcomes().is_empty()));

        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::release(button.clone(), held));

        assert!(fx.work.wait(Duration::from_secs(2)));
        assert_eq!(fx.outcomes(), [PressOutcome::Rewind]);
    }

    #[test]
    fn repeated_release_reports_are_ignored() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");

        fx.host.press_down(&button);
        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::release(button.clone(), held));
        fx.classify(ButtonEvent::release(button.clone(), held));

        assert_eq!(fx.outcomes(), [PressOutcome::Advance]);
    }

    #[test]
    fn host_reported_long_release_rewinds() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");

        fx.host.press_down(&button);
        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::long_release(button, held));

        assert_eq!(fx.outcomes(), [PressOutcome::Rewind]);
    }

    #[test]
    fn each_physical_press_gets_its_own_outcome() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");

        for _ in 0..3 {
            fx.host.press_down(&button);
            fx.classify(ButtonEvent::down(button.clone()));
            let held = fx.host.release(&button);
            fx.classify(ButtonEvent::release(button.clone(), held));
        }

        assert!(fx.work.wait(Duration::from_secs(2)));
        assert_eq!(fx.outcomes(), [PressOutcome::Advance; 3]);
    }

    #[test]
    fn press_down_returns_without_waiting() {
        let fx = Fixture::new();
        let button = ButtonId::from("1");
        fx.host.press_down(&button);

        let started = Instant::now();
        fx.classify(ButtonEvent::down(button.clone()));
        assert!(started.elapsed() < fast_timings().long_press);

        fx.host.release(&button);
        assert!(fx.work.wait(Duration::from_secs(2)));
        assert!(fx.outcomes().is_empty());
    }

    #[test]
    fn release_event_never_reports_zero_duration() {
        let event = ButtonEvent::release(ButtonId::from("x"), Duration::ZERO);
        assert!(!event.is_still_held());
        assert!(ButtonEvent::down(ButtonId::from("x")).is_still_held());
    }

    #[test]
    fn quick_repress_is_not_claimed_by_earlier_check() {
        let fx = Fixture::with_timings(Timings {
            long_press: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            ..fast_timings()
        });
        let button = ButtonId::from("1");

        fx.host.press_down(&button);
        fx.classify(ButtonEvent::down(button.clone()));
        std::thread::sleep(Duration::from_millis(100));
        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::release(button.clone(), held));

        // Pressed again at once, then held past the first press's deadline
        // but well short of the threshold.
        fx.host.press_down(&button);
        fx.classify(ButtonEvent::down(button.clone()));
        std::thread::sleep(Duration::from_millis(130));
        let held = fx.host.release(&button);
        fx.classify(ButtonEvent::release(button.clone(), held));

        assert!(fx.work.wait(Duration::from_secs(2)));
        assert_eq!(fx.outcomes(), [PressOutcome::Advance, PressOutcome::Advance]);
    }
}

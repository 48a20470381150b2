use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use station_player::supervisor::ShellSupervisor;
use station_player::{ButtonEvent, PlaybackHost, PlayerConfig, RadioController, StationList};

use crate::cli::Args;
use crate::host::{PressBook, ShellHost, StatusFormat};
use crate::input::{InputCommand, parse_line};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Load configuration, wire the controller to stdin and run until EOF or `quit`.
pub fn run(args: &Args) -> Result<()> {
    let stations = StationList::load(&args.stations)?;
    let config = PlayerConfig::load(&args.config_path())?;
    tracing::info!(
        stations = stations.len(),
        player = %config.audio_player,
        kill = %config.audio_player_kill,
        "radio-remote starting"
    );

    let format = if args.json_status {
        StatusFormat::Json
    } else {
        StatusFormat::Text
    };
    let host = Arc::new(ShellHost::new(&config, format));
    let supervisor = Arc::new(ShellSupervisor::new(
        config.audio_player.clone(),
        config.audio_player_kill.clone(),
    ));
    let mut controller = RadioController::new(stations, host.clone(), supervisor, config.timings);
    if let Some(path) = &args.long_stations {
        controller = controller.with_long_stations(StationList::load(path)?);
    }

    {
        let controller = controller.clone();
        ctrlc::set_handler(move || {
            tracing::info!("interrupted");
            shutdown(&controller);
            std::process::exit(130);
        })
        .context("install ctrl-c handler")?;
    }

    let lines = spawn_stdin_reader()?;
    while let Ok(line) = lines.recv() {
        match parse_line(&line) {
            Ok(Some(command)) => {
                if !apply(&controller, host.as_ref(), command) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(line = %line.trim(), error = %e, "ignoring input"),
        }
    }

    shutdown(&controller);
    Ok(())
}

/// Feed one command to the controller. Returns `false` to end the loop.
pub fn apply(controller: &RadioController, host: &ShellHost, command: InputCommand) -> bool {
    let presses: &PressBook = host.presses();
    match command {
        InputCommand::Down(button) => {
            presses.press_down(&button);
            controller.handle_button(ButtonEvent::down(button));
        }
        InputCommand::Up(button) => {
            let held = presses.release(&button);
            controller.handle_button(ButtonEvent::release(button, held));
        }
        InputCommand::Long(button) => {
            presses.press_down(&button);
            let held = presses.release(&button);
            controller.handle_button(ButtonEvent::long_release(button, held));
        }
        InputCommand::Click(button) => {
            presses.press_down(&button);
            controller.handle_button(ButtonEvent::down(button.clone()));
            let held = presses.release(&button);
            controller.handle_button(ButtonEvent::release(button, held));
        }
        InputCommand::Stop => {
            if !controller.stop() {
                tracing::info!("nothing playing");
            }
        }
        InputCommand::Status => {
            let status = controller.status();
            tracing::info!(?status, "status requested");
            host.print_status(status.now_playing.as_deref().unwrap_or_default());
        }
        InputCommand::Quit => return false,
    }
    true
}

fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            tracing::debug!("stdin closed");
        })
        .context("spawn stdin reader")?;
    Ok(rx)
}

fn shutdown(controller: &RadioController) {
    if !controller.shutdown(DRAIN_TIMEOUT) {
        tracing::warn!("playback did not wind down in time");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use station_player::Timings;
    use station_player::coordinator::CoordinatorPhase;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    fn fixture() -> (RadioController, Arc<ShellHost>, SharedBuf) {
        let config = PlayerConfig {
            audio_control: String::new(),
            audio_player: "exec sleep 30 #".to_string(),
            audio_player_kill: String::new(),
            timings: Timings {
                long_press: Duration::from_millis(100),
                poll_interval: Duration::from_millis(5),
                settle_delay: Duration::from_millis(5),
                unmute_delay: Duration::from_millis(5),
            },
        };
        let buf = SharedBuf::default();
        let host = Arc::new(ShellHost::with_writer(
            &config,
            StatusFormat::Text,
            Box::new(buf.clone()),
        ));
        let supervisor = Arc::new(ShellSupervisor::new(
            config.audio_player.clone(),
            config.audio_player_kill.clone(),
        ));
        let controller = RadioController::new(
            StationList::parse("A=urlA\nB=urlB\n"),
            host.clone(),
            supervisor,
            config.timings.clone(),
        );
        (controller, host, buf)
    }

    #[test]
    fn click_plays_and_stop_returns_to_idle() {
        let (controller, host, buf) = fixture();

        assert!(apply(
            &controller,
            &host,
            parse_line("click 1").unwrap().unwrap()
        ));
        assert!(wait_until(
            || controller.status().phase == CoordinatorPhase::Playing
        ));
        assert_eq!(controller.status().now_playing.as_deref(), Some("A 1/2"));

        assert!(apply(&controller, &host, InputCommand::Stop));
        assert!(controller.wait_for_drain(Duration::from_secs(3)));
        assert_eq!(controller.status().phase, CoordinatorPhase::Idle);

        assert!(!apply(&controller, &host, InputCommand::Quit));
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(text.starts_with("A 1/2\n"));
    }

    #[test]
    fn shutdown_right_after_click_leaves_no_player_behind() {
        let (controller, host, _buf) = fixture();

        assert!(apply(&controller, &host, InputCommand::Click("1".into())));
        assert!(controller.shutdown(Duration::from_secs(3)));

        let status = controller.status();
        assert_eq!(status.phase, CoordinatorPhase::Idle);
        assert!(status.now_playing.is_none());
        assert!(controller.coordinator().live_session().is_none());

        apply(&controller, &host, InputCommand::Click("1".into()));
        assert!(controller.wait_for_drain(Duration::from_secs(3)));
        assert_eq!(controller.status().phase, CoordinatorPhase::Idle);
    }
}

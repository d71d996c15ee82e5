use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel as xch;
use shutter_core::error::ShutterError;
use shutter_core::{WizardCfg, run_wizard};
use shutter_traits::{Cover, CoverCommand, CoverState, DeviceStateEvent, ManualClock};

/// Cover that "travels" by advancing a manual clock, then reports the endpoint.
struct ScriptedCover {
    clock: ManualClock,
    tx: xch::Sender<DeviceStateEvent>,
    open_time: Duration,
    close_time: Duration,
    /// Close leg never reports its endpoint.
    close_stalls: bool,
    log: Arc<Mutex<Vec<CoverCommand>>>,
}

impl Cover for ScriptedCover {
    fn send(&mut self, command: CoverCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.log.lock().unwrap().push(command);
        match command {
            CoverCommand::Open => {
                self.tx.send(DeviceStateEvent::new(CoverState::Opening))?;
                self.clock.advance(self.open_time);
                self.tx
                    .send(DeviceStateEvent::with_position(CoverState::Open, 100))?;
            }
            CoverCommand::Close => {
                self.tx.send(DeviceStateEvent::new(CoverState::Closing))?;
                if !self.close_stalls {
                    self.clock.advance(self.close_time);
                    self.tx
                        .send(DeviceStateEvent::with_position(CoverState::Closed, 0))?;
                }
            }
            CoverCommand::Stop => {}
        }
        Ok(())
    }

    fn supports_stop(&self) -> bool {
        true
    }
}

struct Rig {
    cover: ScriptedCover,
    rx: xch::Receiver<DeviceStateEvent>,
    clock: ManualClock,
    log: Arc<Mutex<Vec<CoverCommand>>>,
}

fn rig(open_ms: u64, close_ms: u64, close_stalls: bool) -> Rig {
    let (tx, rx) = xch::unbounded();
    let clock = ManualClock::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    Rig {
        cover: ScriptedCover {
            clock: clock.clone(),
            tx,
            open_time: Duration::from_millis(open_ms),
            close_time: Duration::from_millis(close_ms),
            close_stalls,
            log: log.clone(),
        },
        rx,
        clock,
        log,
    }
}

#[test]
fn measures_both_legs_rounded_to_a_tenth() {
    let mut r = rig(20_340, 18_460, false);
    let cfg = WizardCfg {
        timeout: Duration::from_secs(1),
    };
    let report = run_wizard(&mut r.cover, &r.rx, &r.clock, &cfg, None).unwrap();
    assert_eq!(report.time_to_open, Duration::from_millis(20_300));
    assert_eq!(report.time_to_close, Duration::from_millis(18_500));
    assert!(!report.degraded);
    assert_eq!(
        *r.log.lock().unwrap(),
        vec![CoverCommand::Open, CoverCommand::Close, CoverCommand::Open]
    );

    let cal = report.to_calibration().unwrap();
    assert_eq!(cal.time_to_open(), Duration::from_millis(20_300));
}

#[test]
fn skips_pre_open_when_already_open() {
    let mut r = rig(10_000, 10_000, false);
    let report = run_wizard(
        &mut r.cover,
        &r.rx,
        &r.clock,
        &WizardCfg::default(),
        Some(CoverState::Open),
    )
    .unwrap();
    assert_eq!(report.time_to_close, Duration::from_secs(10));
    assert_eq!(
        *r.log.lock().unwrap(),
        vec![CoverCommand::Close, CoverCommand::Open]
    );
}

#[test]
fn stalled_leg_degrades_to_the_timeout() {
    let mut r = rig(10_000, 10_000, true);
    let cfg = WizardCfg {
        timeout: Duration::from_millis(50),
    };
    let report = run_wizard(&mut r.cover, &r.rx, &r.clock, &cfg, None).unwrap();
    assert!(report.degraded);
    assert_eq!(report.time_to_close, Duration::from_millis(50));
    assert_eq!(report.time_to_open, Duration::from_secs(10));
}

#[test]
fn closed_event_stream_is_an_error() {
    let (tx, rx) = xch::unbounded::<DeviceStateEvent>();
    drop(tx);
    let mut r = rig(1_000, 1_000, false);
    let err = run_wizard(
        &mut r.cover,
        &rx,
        &r.clock,
        &WizardCfg::default(),
        Some(CoverState::Open),
    )
    .expect_err("no events can arrive");
    assert!(matches!(
        err.downcast_ref::<ShutterError>(),
        Some(ShutterError::DeviceCommandFailed(_))
    ));
}

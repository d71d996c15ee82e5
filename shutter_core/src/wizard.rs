//! Travel-time calibration wizard.
//!
//! Drives the cover end to end and times each leg against device events:
//! make sure it starts fully open, time a full close, then time a full open.
//! A leg that never reports its endpoint within the timeout is recorded as
//! the timeout itself (worst case) and the report is flagged `degraded`;
//! the wizard never hangs and never fails just because a device is slow.

use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use eyre::WrapErr;
use shutter_traits::{Clock, Cover, CoverCommand, CoverState, DeviceStateEvent};

use crate::calibration::{MIN_TRAVEL, TravelCalibration};
use crate::error::{Result, ShutterError};
use crate::hw_error::map_hw_error;

/// Per-leg wait used when nothing else is configured.
pub const DEFAULT_LEG_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardCfg {
    /// Longest wait for each endpoint.
    pub timeout: Duration,
}

impl Default for WizardCfg {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LEG_TIMEOUT,
        }
    }
}

/// Measured travel times, rounded to 0.1 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReport {
    pub time_to_open: Duration,
    pub time_to_close: Duration,
    /// At least one leg timed out and was recorded as the timeout.
    pub degraded: bool,
}

impl CalibrationReport {
    /// Constants for the controller. Legs that rounded to zero are raised to
    /// `MIN_TRAVEL`.
    pub fn to_calibration(&self) -> std::result::Result<TravelCalibration, ShutterError> {
        TravelCalibration::new(
            self.time_to_open.max(MIN_TRAVEL),
            self.time_to_close.max(MIN_TRAVEL),
        )
    }
}

enum Leg {
    Reached,
    TimedOut,
}

/// Run the three wizard steps.
///
/// `initial_state` is the device's last known state; when it is already
/// `Open` the pre-open step is skipped. Elapsed time is measured with
/// `clock`, while waits use real-time deadlines.
pub fn run_wizard<C: Cover + ?Sized>(
    cover: &mut C,
    events: &xch::Receiver<DeviceStateEvent>,
    clock: &dyn Clock,
    cfg: &WizardCfg,
    initial_state: Option<CoverState>,
) -> Result<CalibrationReport> {
    if initial_state == Some(CoverState::Open) {
        tracing::debug!("cover already open; skipping pre-open");
    } else {
        tracing::info!("opening cover before measuring");
        send(cover, CoverCommand::Open).wrap_err("pre-open")?;
        if let Leg::TimedOut = wait_for(events, CoverState::Open, cfg.timeout)? {
            tracing::warn!(
                timeout_s = cfg.timeout.as_secs_f64(),
                "cover did not report open; measuring anyway"
            );
        }
    }

    let (time_to_close, close_degraded) =
        measure(cover, events, clock, cfg, CoverCommand::Close, CoverState::Closed)?;
    let (time_to_open, open_degraded) =
        measure(cover, events, clock, cfg, CoverCommand::Open, CoverState::Open)?;

    let report = CalibrationReport {
        time_to_open,
        time_to_close,
        degraded: close_degraded || open_degraded,
    };
    tracing::info!(
        time_to_open_s = report.time_to_open.as_secs_f64(),
        time_to_close_s = report.time_to_close.as_secs_f64(),
        degraded = report.degraded,
        "calibration measured"
    );
    Ok(report)
}

fn measure<C: Cover + ?Sized>(
    cover: &mut C,
    events: &xch::Receiver<DeviceStateEvent>,
    clock: &dyn Clock,
    cfg: &WizardCfg,
    command: CoverCommand,
    want: CoverState,
) -> Result<(Duration, bool)> {
    // Stale events from the previous leg must not end this one early.
    for _ in events.try_iter() {}
    let start = clock.now();
    send(cover, command).wrap_err_with(|| format!("measuring {want:?}"))?;
    match wait_for(events, want, cfg.timeout)? {
        Leg::Reached => {
            let elapsed = clock.elapsed_since(start);
            Ok((round_to_tenth(elapsed), false))
        }
        Leg::TimedOut => {
            tracing::warn!(
                state = ?want,
                timeout_s = cfg.timeout.as_secs_f64(),
                "endpoint not reported in time; using timeout as travel time"
            );
            Ok((cfg.timeout, true))
        }
    }
}

fn wait_for(
    events: &xch::Receiver<DeviceStateEvent>,
    want: CoverState,
    timeout: Duration,
) -> Result<Leg> {
    let deadline = Instant::now() + timeout;
    loop {
        match events.recv_deadline(deadline) {
            Ok(ev) if ev.state == want => return Ok(Leg::Reached),
            Ok(ev) => tracing::trace!(state = ?ev.state, "waiting"),
            Err(xch::RecvTimeoutError::Timeout) => return Ok(Leg::TimedOut),
            Err(xch::RecvTimeoutError::Disconnected) => {
                return Err(eyre::Report::new(ShutterError::DeviceCommandFailed(
                    "device event stream closed".into(),
                )));
            }
        }
    }
}

fn send<C: Cover + ?Sized>(cover: &mut C, command: CoverCommand) -> Result<()> {
    cover
        .send(command)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
}

fn round_to_tenth(d: Duration) -> Duration {
    let tenths = (d.as_millis() + 50) / 100;
    Duration::from_millis(u64::try_from(tenths * 100).unwrap_or(u64::MAX))
}

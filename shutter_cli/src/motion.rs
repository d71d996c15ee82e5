//! Open / close / move / stop through the controller service.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use shutter_config::{Config, Cover};
use shutter_core::{Direction, Position, ShutterService, TravelCalibration, build_controller};

use crate::{device, state};

/// Slack on top of the slowest full travel before a wait gives up.
const WAIT_MARGIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Open,
    Close,
    To(Position),
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct MotionOutcome {
    pub position: Position,
    pub direction: Option<Direction>,
    pub elapsed: Duration,
    /// Reached idle before the wait timeout.
    pub settled: bool,
    pub interrupted: bool,
}

pub fn default_timeout(calibration: &TravelCalibration) -> Duration {
    calibration
        .time_to_open()
        .max(calibration.time_to_close())
        .saturating_mul(2)
        + WAIT_MARGIN
}

/// Restore the last position of `cover`, run `motion`, wait for it to
/// settle, persist.
///
/// The believed position is saved even when the command itself failed, so
/// the next run starts from the best estimate.
pub fn run(
    cfg: &Config,
    cover: &Cover,
    calibration: TravelCalibration,
    motion: Motion,
    timeout: Option<Duration>,
) -> eyre::Result<MotionOutcome> {
    let state_path = cover.state_path.as_deref().map(Path::new);
    let restored = match state_path {
        Some(p) => state::load(p)?,
        None => None,
    };
    let initial = match restored {
        Some(st) => st.position()?,
        None => Position::CLOSED,
    };
    tracing::info!(
        name = %cover.name,
        position = %initial,
        restored = restored.is_some(),
        "starting position"
    );

    let dev = device::open(cfg, cover, restored.map(|st| st.position))?;
    let controller = build_controller(dev.cover, calibration, Some(initial), None);
    let service = ShutterService::spawn(controller, dev.events);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let handle = service.handle();
        let flag = interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
            tracing::warn!("interrupted; stopping shutter");
            if let Err(e) = handle.stop() {
                tracing::warn!(error = %e, "stop after interrupt failed");
            }
        }) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let started = Instant::now();
    let outcome = drive(&service, motion, timeout.unwrap_or_else(|| default_timeout(&calibration)));
    let position = service.shutdown()?;

    if let Some(p) = state_path {
        state::save(p, position)?;
    }

    let (direction, settled) = outcome?;
    Ok(MotionOutcome {
        position,
        direction,
        elapsed: started.elapsed(),
        settled,
        interrupted: interrupted.load(Ordering::Relaxed),
    })
}

fn drive(
    service: &ShutterService,
    motion: Motion,
    timeout: Duration,
) -> eyre::Result<(Option<Direction>, bool)> {
    match motion {
        Motion::Open => service.open()?,
        Motion::Close => service.close()?,
        Motion::To(target) => service.set_position(target)?,
        Motion::Stop => service.stop()?,
    }
    let direction = service.status()?.direction;
    let settled = service.wait_idle(timeout)?.is_some();
    if !settled {
        tracing::warn!(timeout_ms = timeout.as_millis(), "movement did not settle in time; stopping");
        service.stop()?;
    }
    Ok((direction, settled))
}

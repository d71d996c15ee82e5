//! Movement controller: the single owner of a shutter's believed state.
//!
//! All mutations go through `&mut self`, so one controller instance is
//! serialized by construction. Time comes from the injected `Clock`; nothing
//! here sleeps or spawns. Whoever owns the controller calls [`poll`] once
//! [`next_deadline`] has passed (see `ShutterService`) and forwards device
//! events to [`handle_event`].
//!
//! [`poll`]: ShutterController::poll
//! [`next_deadline`]: ShutterController::next_deadline
//! [`handle_event`]: ShutterController::handle_event

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use shutter_traits::{Clock, Cover, CoverCommand, CoverState, DeviceStateEvent};

use crate::calibration::TravelCalibration;
use crate::error::Result;
use crate::estimator::estimate;
use crate::hw_error::map_hw_error;
use crate::position::{Direction, Position};
use crate::scheduler::StopScheduler;
use crate::status::ShutterStatus;
use crate::tracker::{MovementState, MovementTracker};

pub struct ShutterController<C: Cover> {
    cover: C,
    calibration: TravelCalibration,
    clock: Arc<dyn Clock + Send + Sync>,
    tracker: MovementTracker,
    scheduler: StopScheduler<Position>,
    /// Last state the device reported; reset when we command a new movement.
    reported: Option<CoverState>,
}

impl<C: Cover> core::fmt::Debug for ShutterController<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShutterController")
            .field("calibration", &self.calibration)
            .field("state", self.tracker.state())
            .field("pending_stop", &self.scheduler.is_pending())
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}

impl<C: Cover> ShutterController<C> {
    pub fn new(
        cover: C,
        calibration: TravelCalibration,
        initial: Position,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            cover,
            calibration,
            clock,
            tracker: MovementTracker::new(initial),
            scheduler: StopScheduler::new(),
            reported: None,
        }
    }

    pub fn open(&mut self) -> Result<()> {
        self.move_to(Position::OPEN)
    }

    pub fn close(&mut self) -> Result<()> {
        self.move_to(Position::CLOSED)
    }

    /// Drive toward `target`, stopping the device once the estimate gets there.
    ///
    /// A request for the target already being approached is a no-op. Anything
    /// else finalizes the current segment first. If the direction command is
    /// refused the controller stays `Idle` at the finalized position.
    pub fn set_position(&mut self, target: Position) -> Result<()> {
        self.move_to(target)
    }

    fn move_to(&mut self, target: Position) -> Result<()> {
        if self.tracker.movement().is_some_and(|m| m.target == target) {
            tracing::debug!(target = %target, "already moving to target");
            return Ok(());
        }

        let from = self.finalize()?;
        let Some(direction) = Direction::between(from, target) else {
            tracing::debug!(position = %from, "already at target; nothing to do");
            return Ok(());
        };

        self.send(direction.command())
            .wrap_err_with(|| format!("starting movement to {target}"))?;
        self.reported = None;

        let now = self.clock.now();
        if self.tracker.start(now, target).is_some() {
            let travel = self.calibration.travel_time(direction, from, target);
            self.scheduler.arm(now, travel, target);
            tracing::info!(
                from = %from,
                target = %target,
                direction = direction.as_str(),
                travel_ms = u64::try_from(travel.as_millis()).unwrap_or(u64::MAX),
                "movement start"
            );
        }
        Ok(())
    }

    /// Halt wherever the shutter is now.
    ///
    /// Always sends a settle command when one applies, even if the controller
    /// believes it is idle: the device may have been moved by something else.
    pub fn stop(&mut self) -> Result<()> {
        let position = self.halt()?;
        tracing::info!(position = %position, "stopped");
        Ok(())
    }

    /// Feed a device state change.
    ///
    /// Every event updates the last reported state. Only non-transient events
    /// carrying a coarse position of exactly 0 or 100 resynchronize: the
    /// pending stop is cancelled and the believed position snaps to the
    /// endpoint. Returns whether a resync happened.
    pub fn handle_event(&mut self, event: DeviceStateEvent) -> bool {
        self.reported = Some(event.state);
        if event.state.is_transient() {
            return false;
        }
        let endpoint = match event.coarse_position {
            Some(0) => Position::CLOSED,
            Some(100) => Position::OPEN,
            _ => return false,
        };
        let believed = self.current_position();
        self.scheduler.cancel();
        let previous = self.tracker.settle_at(endpoint);
        tracing::info!(
            endpoint = %endpoint,
            believed = %believed,
            was_moving = previous.is_some(),
            "endpoint resync"
        );
        true
    }

    /// Fire the pending stop if its deadline has passed.
    ///
    /// The believed position becomes the segment target and the device gets
    /// its settle command, endpoint targets included: a motor without limit
    /// switches keeps running until told otherwise. Returns whether a stop
    /// fired.
    pub fn poll(&mut self) -> Result<bool> {
        let now = self.clock.now();
        let Some(ticket) = self.scheduler.due(now) else {
            return Ok(false);
        };
        let Some(target) = self.scheduler.fire(ticket) else {
            return Ok(false);
        };
        let previous = self.tracker.settle_at(target);
        tracing::debug!(position = %target, "scheduled stop fired");
        if let Some(cmd) = self.settle_command(previous.map(|m| m.direction)) {
            self.send(cmd).wrap_err("settling at target")?;
        }
        Ok(true)
    }

    /// Instant at which the pending stop becomes due.
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Time left until the pending stop; zero when overdue.
    pub fn time_until_stop(&self) -> Option<Duration> {
        self.scheduler.remaining(self.clock.now())
    }

    /// Live believed position. Always available, even after a failed command.
    pub fn current_position(&self) -> Position {
        estimate(self.tracker.state(), &self.calibration, self.clock.now())
    }

    #[inline]
    pub fn state(&self) -> &MovementState {
        self.tracker.state()
    }

    pub fn is_moving(&self) -> bool {
        self.tracker.is_moving()
    }

    pub fn is_opening(&self) -> bool {
        self.tracker.direction() == Some(Direction::Opening)
    }

    pub fn is_closing(&self) -> bool {
        self.tracker.direction() == Some(Direction::Closing)
    }

    /// Idle at 0.
    pub fn is_closed(&self) -> bool {
        self.tracker.idle_position() == Some(Position::CLOSED)
    }

    pub fn has_pending_stop(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn reported_state(&self) -> Option<CoverState> {
        self.reported
    }

    pub fn calibration(&self) -> TravelCalibration {
        self.calibration
    }

    pub fn status(&self) -> ShutterStatus {
        let movement = self.tracker.movement();
        ShutterStatus {
            position: self.current_position(),
            direction: movement.map(|m| m.direction),
            target: movement.map(|m| m.target),
            pending_stop: self.time_until_stop(),
        }
    }

    /// Replace the travel times. Any in-flight movement is finalized with the
    /// old constants first; the new ones apply even if that settle fails.
    pub fn reconfigure(&mut self, calibration: TravelCalibration) -> Result<()> {
        let finalized = self.finalize();
        self.calibration = calibration;
        tracing::info!(
            time_to_open_ms = u64::try_from(calibration.time_to_open().as_millis()).unwrap_or(u64::MAX),
            time_to_close_ms = u64::try_from(calibration.time_to_close().as_millis()).unwrap_or(u64::MAX),
            "calibration replaced"
        );
        finalized.map(|_| ())
    }

    /// Teardown: cancel the pending stop and freeze the estimate without
    /// talking to the device. Returns the position to persist.
    pub fn shutdown(&mut self) -> Position {
        let position = self.current_position();
        self.scheduler.cancel();
        self.tracker.settle_at(position);
        tracing::debug!(position = %position, "controller shut down");
        position
    }

    /// Collapse an in-flight segment into `Idle` and settle the device.
    /// No-op when already idle. Returns the believed position.
    fn finalize(&mut self) -> Result<Position> {
        match self.tracker.idle_position() {
            Some(position) => Ok(position),
            None => self.halt(),
        }
    }

    fn halt(&mut self) -> Result<Position> {
        let position = self.current_position();
        self.scheduler.cancel();
        let previous = self.tracker.settle_at(position);
        if let Some(cmd) = self.settle_command(previous.map(|m| m.direction)) {
            self.send(cmd).wrap_err("settling device")?;
        }
        Ok(position)
    }

    /// Command that halts the device.
    ///
    /// Native stop when available. Binary devices get a best-effort reverse
    /// pulse against the last reported motion (or, if nothing was reported
    /// since our command, against `commanded`). This can overshoot or
    /// undershoot; there is no guarantee the device halts exactly.
    fn settle_command(&self, commanded: Option<Direction>) -> Option<CoverCommand> {
        if self.cover.supports_stop() {
            return Some(CoverCommand::Stop);
        }
        match self.reported {
            Some(CoverState::Opening) => Some(CoverCommand::Close),
            Some(CoverState::Closing) => Some(CoverCommand::Open),
            Some(_) => None,
            None => commanded.map(Direction::reverse_command),
        }
    }

    fn send(&mut self, command: CoverCommand) -> Result<()> {
        tracing::debug!(?command, "device command");
        self.cover.send(command).map_err(|e| {
            let mapped = map_hw_error(&*e);
            tracing::warn!(?command, error = %mapped, "device command failed");
            eyre::Report::new(mapped)
        })
    }
}

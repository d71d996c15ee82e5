//! Type-state builder for `Shutter` and generic `build_controller` constructor.
//!
//! The builder enforces at compile time that a cover and a calibration are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use shutter_traits::{Clock, Cover, MonotonicClock};

use crate::calibration::TravelCalibration;
use crate::controller::ShutterController;
use crate::error::{BuildError, Result};
use crate::position::Position;

/// Boxed cover accepted by the dynamic builder. `Send` so the controller can
/// move onto a `ShutterService` thread.
pub type DynCover = Box<dyn Cover + Send>;

/// Dynamically dispatched controller produced by `ShutterControllerBuilder`.
pub type Shutter = ShutterController<DynCover>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Shutter`.
pub struct ShutterControllerBuilder<K, T> {
    cover: Option<DynCover>,
    calibration: Option<TravelCalibration>,
    initial: Option<Position>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _k: PhantomData<K>,
    _t: PhantomData<T>,
}

impl Default for ShutterControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            cover: None,
            calibration: None,
            initial: None,
            clock: None,
            _k: PhantomData,
            _t: PhantomData,
        }
    }
}

impl Shutter {
    /// Start building a controller around a boxed cover.
    pub fn builder() -> ShutterControllerBuilder<Missing, Missing> {
        ShutterControllerBuilder::default()
    }
}

fn into_clock(clock: Option<Box<dyn Clock + Send + Sync>>) -> Arc<dyn Clock + Send + Sync> {
    match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    }
}

impl<K, T> ShutterControllerBuilder<K, T> {
    /// Fallible build available in any type-state; returns a `BuildError` for
    /// missing pieces.
    pub fn try_build(self) -> Result<Shutter> {
        let cover = self
            .cover
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCover))?;
        let calibration = self
            .calibration
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCalibration))?;
        Ok(ShutterController::new(
            cover,
            calibration,
            self.initial.unwrap_or(Position::CLOSED),
            into_clock(self.clock),
        ))
    }

    /// Last known position to start from (restart recovery). Defaults to closed.
    pub fn with_initial_position(mut self, position: Position) -> Self {
        self.initial = Some(position);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<T> ShutterControllerBuilder<Missing, T> {
    pub fn with_cover(
        self,
        cover: impl Cover + Send + 'static,
    ) -> ShutterControllerBuilder<Set, T> {
        ShutterControllerBuilder {
            cover: Some(Box::new(cover)),
            calibration: self.calibration,
            initial: self.initial,
            clock: self.clock,
            _k: PhantomData,
            _t: PhantomData,
        }
    }
}

impl<K> ShutterControllerBuilder<K, Missing> {
    pub fn with_calibration(
        self,
        calibration: TravelCalibration,
    ) -> ShutterControllerBuilder<K, Set> {
        ShutterControllerBuilder {
            cover: self.cover,
            calibration: Some(calibration),
            initial: self.initial,
            clock: self.clock,
            _k: PhantomData,
            _t: PhantomData,
        }
    }
}

impl ShutterControllerBuilder<Set, Set> {
    /// Build the controller. Only available once cover and calibration are set.
    pub fn build(self) -> Result<Shutter> {
        self.try_build()
    }
}

/// Build a statically dispatched controller from a concrete cover.
pub fn build_controller<C: Cover>(
    cover: C,
    calibration: TravelCalibration,
    initial: Option<Position>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> ShutterController<C> {
    ShutterController::new(
        cover,
        calibration,
        initial.unwrap_or(Position::CLOSED),
        into_clock(clock),
    )
}

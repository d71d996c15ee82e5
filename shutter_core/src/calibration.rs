//! Per-device travel-time calibration.

use std::time::Duration;

use crate::error::ShutterError;
use crate::position::{Direction, Position};

/// Shortest travel time accepted for either direction.
pub const MIN_TRAVEL: Duration = Duration::from_millis(100);

/// Full-range travel times, measured from fully closed to fully open and back.
///
/// Both values are strictly positive; the constructors reject anything else so
/// the travel-time math downstream never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelCalibration {
    time_to_open: Duration,
    time_to_close: Duration,
}

impl TravelCalibration {
    pub fn new(time_to_open: Duration, time_to_close: Duration) -> Result<Self, ShutterError> {
        if time_to_open.is_zero() {
            return Err(ShutterError::InvalidCalibration(
                "time_to_open must be > 0".into(),
            ));
        }
        if time_to_close.is_zero() {
            return Err(ShutterError::InvalidCalibration(
                "time_to_close must be > 0".into(),
            ));
        }
        Ok(Self {
            time_to_open,
            time_to_close,
        })
    }

    /// Build from seconds as stored in config files.
    pub fn from_secs_f64(time_to_open: f64, time_to_close: f64) -> Result<Self, ShutterError> {
        Self::new(
            secs_to_duration("time_to_open", time_to_open)?,
            secs_to_duration("time_to_close", time_to_close)?,
        )
    }

    #[inline]
    pub fn time_to_open(&self) -> Duration {
        self.time_to_open
    }

    #[inline]
    pub fn time_to_close(&self) -> Duration {
        self.time_to_close
    }

    /// Time to traverse 0..=100 in the given direction.
    #[inline]
    pub fn full_travel(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Opening => self.time_to_open,
            Direction::Closing => self.time_to_close,
        }
    }

    /// Time to travel from `from` to `to` at the rate of `direction`.
    pub fn travel_time(&self, direction: Direction, from: Position, to: Position) -> Duration {
        let fraction = f64::from(from.distance(to)) / 100.0;
        self.full_travel(direction).mul_f64(fraction)
    }
}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration, ShutterError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ShutterError::InvalidCalibration(format!(
            "{name} must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ShutterError::InvalidCalibration(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: u8) -> Position {
        Position::new(v).unwrap()
    }

    #[test]
    fn rejects_non_positive_times() {
        assert!(TravelCalibration::from_secs_f64(0.0, 10.0).is_err());
        assert!(TravelCalibration::from_secs_f64(10.0, -1.0).is_err());
        assert!(TravelCalibration::from_secs_f64(f64::NAN, 10.0).is_err());
        assert!(TravelCalibration::new(Duration::ZERO, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn travel_time_scales_with_distance() {
        let cal = TravelCalibration::from_secs_f64(30.0, 20.0).unwrap();
        assert_eq!(
            cal.travel_time(Direction::Opening, pos(0), pos(50)),
            Duration::from_secs(15)
        );
        assert_eq!(
            cal.travel_time(Direction::Closing, pos(100), pos(25)),
            Duration::from_secs(15)
        );
        assert_eq!(
            cal.travel_time(Direction::Opening, pos(40), pos(40)),
            Duration::ZERO
        );
    }
}

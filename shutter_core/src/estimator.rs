//! Dead-reckoning position estimate.

use std::time::Instant;

use crate::calibration::TravelCalibration;
use crate::position::{Direction, Position};
use crate::tracker::{Movement, MovementState};

/// Believed position at `now`.
///
/// Idle states return the stored position. Moving states add (or subtract)
/// `elapsed / full_travel * 100` to the start position, rounded to the
/// nearest percent and clamped to `0..=100`. A `now` before the segment start
/// counts as zero elapsed.
pub fn estimate(state: &MovementState, calib: &TravelCalibration, now: Instant) -> Position {
    match state {
        MovementState::Idle { position } => *position,
        MovementState::Moving(m) => estimate_movement(m, calib, now),
    }
}

pub fn estimate_movement(m: &Movement, calib: &TravelCalibration, now: Instant) -> Position {
    let elapsed = now.saturating_duration_since(m.started);
    let full = calib.full_travel(m.direction);
    let delta = elapsed.as_secs_f64() / full.as_secs_f64() * 100.0;
    let start = f64::from(m.start_position.get());
    let raw = match m.direction {
        Direction::Opening => start + delta,
        Direction::Closing => start - delta,
    };
    Position::from_estimate(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pos(v: u8) -> Position {
        Position::new(v).unwrap()
    }

    fn moving(direction: Direction, started: Instant, from: u8, to: u8) -> MovementState {
        MovementState::Moving(Movement {
            direction,
            started,
            start_position: pos(from),
            target: pos(to),
        })
    }

    #[test]
    fn idle_returns_stored_position() {
        let cal = TravelCalibration::from_secs_f64(30.0, 20.0).unwrap();
        let st = MovementState::Idle { position: pos(42) };
        assert_eq!(estimate(&st, &cal, Instant::now()), pos(42));
    }

    #[test]
    fn opening_halfway_through_a_half_move() {
        let cal = TravelCalibration::from_secs_f64(30.0, 20.0).unwrap();
        let t0 = Instant::now();
        let st = moving(Direction::Opening, t0, 0, 50);
        assert_eq!(estimate(&st, &cal, t0 + Duration::from_millis(7_500)), pos(25));
        assert_eq!(estimate(&st, &cal, t0 + Duration::from_secs(15)), pos(50));
    }

    #[test]
    fn closing_uses_close_rate_and_clamps_at_zero() {
        let cal = TravelCalibration::from_secs_f64(30.0, 20.0).unwrap();
        let t0 = Instant::now();
        let st = moving(Direction::Closing, t0, 60, 0);
        assert_eq!(estimate(&st, &cal, t0 + Duration::from_secs(2)), pos(50));
        assert_eq!(estimate(&st, &cal, t0 + Duration::from_secs(60)), pos(0));
    }

    #[test]
    fn time_before_start_counts_as_zero() {
        let cal = TravelCalibration::from_secs_f64(10.0, 10.0).unwrap();
        let t0 = Instant::now() + Duration::from_secs(5);
        let st = moving(Direction::Opening, t0, 20, 90);
        assert_eq!(estimate(&st, &cal, Instant::now()), pos(20));
    }
}

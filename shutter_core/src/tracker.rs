//! Believed movement state of a shutter.
//!
//! `MovementState` is the single source of truth for where the controller
//! thinks the shutter is. Direction, start time, start position and target
//! only exist together inside `Moving`, so there is no way to have one set
//! without the others.

use std::time::Instant;

use crate::position::{Direction, Position};

/// One in-flight movement segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub direction: Direction,
    pub started: Instant,
    pub start_position: Position,
    pub target: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    /// Not moving; `position` is authoritative.
    Idle { position: Position },
    /// In flight; the position must be estimated from elapsed time.
    Moving(Movement),
}

impl MovementState {
    pub fn movement(&self) -> Option<&Movement> {
        match self {
            MovementState::Idle { .. } => None,
            MovementState::Moving(m) => Some(m),
        }
    }
}

/// Owns the `MovementState` and enforces its transition rules.
#[derive(Debug, Clone)]
pub struct MovementTracker {
    state: MovementState,
}

impl MovementTracker {
    pub fn new(position: Position) -> Self {
        Self {
            state: MovementState::Idle { position },
        }
    }

    #[inline]
    pub fn state(&self) -> &MovementState {
        &self.state
    }

    #[inline]
    pub fn movement(&self) -> Option<&Movement> {
        self.state.movement()
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        matches!(self.state, MovementState::Moving(_))
    }

    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.movement().map(|m| m.direction)
    }

    /// Stored position when idle, `None` while moving.
    pub fn idle_position(&self) -> Option<Position> {
        match self.state {
            MovementState::Idle { position } => Some(position),
            MovementState::Moving(_) => None,
        }
    }

    /// Start a segment from the idle position toward `target`.
    ///
    /// Returns `None` (and leaves the state untouched) when the tracker is
    /// already moving or the target equals the current position. Callers
    /// collapse any running segment with [`settle_at`](Self::settle_at) first.
    pub fn start(&mut self, started: Instant, target: Position) -> Option<Movement> {
        let MovementState::Idle { position } = self.state else {
            debug_assert!(false, "start() called while a movement is in flight");
            return None;
        };
        let direction = Direction::between(position, target)?;
        let movement = Movement {
            direction,
            started,
            start_position: position,
            target,
        };
        self.state = MovementState::Moving(movement);
        Some(movement)
    }

    /// Collapse to `Idle` at `position`, returning the segment that was in
    /// flight, if any.
    pub fn settle_at(&mut self, position: Position) -> Option<Movement> {
        let previous = self.state.movement().copied();
        self.state = MovementState::Idle { position };
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: u8) -> Position {
        Position::new(v).unwrap()
    }

    #[test]
    fn start_records_direction_and_origin() {
        let mut t = MovementTracker::new(pos(30));
        let now = Instant::now();
        let m = t.start(now, pos(80)).expect("should start");
        assert_eq!(m.direction, Direction::Opening);
        assert_eq!(m.start_position, pos(30));
        assert_eq!(m.target, pos(80));
        assert!(t.is_moving());
        assert_eq!(t.idle_position(), None);
    }

    #[test]
    fn start_to_current_position_is_a_no_op() {
        let mut t = MovementTracker::new(pos(45));
        assert!(t.start(Instant::now(), pos(45)).is_none());
        assert_eq!(t.idle_position(), Some(pos(45)));
    }

    #[test]
    fn settle_returns_previous_segment() {
        let mut t = MovementTracker::new(pos(90));
        let m = t.start(Instant::now(), pos(10)).unwrap();
        assert_eq!(m.direction, Direction::Closing);
        assert_eq!(t.settle_at(pos(60)), Some(m));
        assert_eq!(t.idle_position(), Some(pos(60)));
        assert_eq!(t.settle_at(pos(0)), None);
    }
}

//! Point-in-time view of a controller for presentation layers.

use std::time::Duration;

use crate::position::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutterStatus {
    /// Believed position at the time of the snapshot.
    pub position: Position,
    /// Set while a movement is in flight.
    pub direction: Option<Direction>,
    pub target: Option<Position>,
    /// Time until the scheduled stop fires, if one is armed.
    pub pending_stop: Option<Duration>,
}

impl ShutterStatus {
    pub fn is_moving(&self) -> bool {
        self.direction.is_some()
    }

    pub fn is_opening(&self) -> bool {
        self.direction == Some(Direction::Opening)
    }

    pub fn is_closing(&self) -> bool {
        self.direction == Some(Direction::Closing)
    }

    pub fn is_closed(&self) -> bool {
        !self.is_moving() && self.position == Position::CLOSED
    }
}

//! Position and travel direction types.

use shutter_traits::CoverCommand;

use crate::error::ShutterError;

/// Shutter position in percent: 0 = fully closed, 100 = fully open.
///
/// Always within `0..=100`. Requested targets go through [`Position::new`],
/// which rejects out-of-range values; only estimates are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position(u8);

impl Position {
    pub const CLOSED: Position = Position(0);
    pub const OPEN: Position = Position(100);

    pub fn new(value: u8) -> Result<Self, ShutterError> {
        if value > 100 {
            return Err(ShutterError::InvalidTarget(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// Round and clamp an estimated value into range. Non-finite input maps
    /// to closed so a readout is always available.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_estimate(value: f64) -> Self {
        if !value.is_finite() {
            return Self::CLOSED;
        }
        let clamped = value.round().clamp(0.0, 100.0);
        Self(clamped as u8)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// True at either physical extreme.
    #[inline]
    pub fn is_endpoint(self) -> bool {
        self == Self::CLOSED || self == Self::OPEN
    }

    /// Distance between two positions in percent.
    #[inline]
    pub fn distance(self, other: Position) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl TryFrom<i64> for Position {
    type Error = ShutterError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ShutterError::InvalidTarget(value))
    }
}

impl From<Position> for u8 {
    fn from(p: Position) -> Self {
        p.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an in-flight movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Opening,
    Closing,
}

impl Direction {
    /// Direction needed to get from `from` to `to`; `None` when already there.
    pub fn between(from: Position, to: Position) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Direction::Opening),
            std::cmp::Ordering::Less => Some(Direction::Closing),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Device command that drives this direction.
    pub fn command(self) -> CoverCommand {
        match self {
            Direction::Opening => CoverCommand::Open,
            Direction::Closing => CoverCommand::Close,
        }
    }

    /// Device command that drives the opposite way.
    pub fn reverse_command(self) -> CoverCommand {
        match self {
            Direction::Opening => CoverCommand::Close,
            Direction::Closing => CoverCommand::Open,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Opening => "opening",
            Direction::Closing => "closing",
        }
    }
}

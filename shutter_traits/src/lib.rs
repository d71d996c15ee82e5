pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Coarse command accepted by a binary shutter device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
}

/// Discrete state reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverState {
    Opening,
    Closing,
    Open,
    Closed,
    Stopped,
}

impl CoverState {
    /// True for the two in-motion states.
    pub fn is_transient(self) -> bool {
        matches!(self, CoverState::Opening | CoverState::Closing)
    }
}

/// State change emitted by a device adapter.
///
/// `coarse_position` is only meaningful at the physical extremes: `Some(0)`
/// means fully closed and `Some(100)` fully open. Anything else is ignored for
/// resynchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStateEvent {
    pub state: CoverState,
    pub coarse_position: Option<u8>,
}

impl DeviceStateEvent {
    pub fn new(state: CoverState) -> Self {
        Self {
            state,
            coarse_position: None,
        }
    }

    pub fn with_position(state: CoverState, coarse_position: u8) -> Self {
        Self {
            state,
            coarse_position: Some(coarse_position),
        }
    }
}

/// Command sink for a physical (or simulated) shutter.
///
/// Events flow the other way on a channel owned by whoever constructs the
/// adapter; the trait only covers the outbound half.
pub trait Cover {
    fn send(&mut self, command: CoverCommand)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Whether the device halts on `CoverCommand::Stop`.
    fn supports_stop(&self) -> bool;
}

impl<T: Cover + ?Sized> Cover for Box<T> {
    fn send(
        &mut self,
        command: CoverCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(command)
    }

    fn supports_stop(&self) -> bool {
        (**self).supports_stop()
    }
}

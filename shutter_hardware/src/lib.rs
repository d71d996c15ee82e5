//! Device adapters implementing `shutter_traits::Cover`.
//!
//! - `SimulatedCover`: in-process physics model, always available.
//! - `RelayCover` (feature `hardware`, Linux): GPIO relays via `rppal`.
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod relay;

pub use sim::{SimParams, SimProbe, SimulatedCover};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use relay::{RelayCover, RelayPins};

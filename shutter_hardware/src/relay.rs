//! Two-relay shutter motor on Raspberry Pi GPIO, with optional limit switches.
//!
//! One relay drives the motor up, the other down; both off means stopped.
//! The relays are interlocked in software: the opposite relay is always
//! released before one is energized. Limit switches, when wired, are polled
//! on a background thread and reported as endpoint events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use shutter_traits::{Cover, CoverCommand, CoverState, DeviceStateEvent};

use crate::error::HwError;

#[derive(Debug, Clone, Copy)]
pub struct RelayPins {
    pub open_relay: u8,
    pub close_relay: u8,
    pub open_limit: Option<u8>,
    pub close_limit: Option<u8>,
    /// Relay board energizes on a low level.
    pub active_low: bool,
    /// Limit switch reads low when pressed.
    pub limit_active_low: bool,
    pub poll: Duration,
}

struct Relays {
    open: OutputPin,
    close: OutputPin,
    active_low: bool,
}

impl Relays {
    fn set(pin: &mut OutputPin, on: bool, active_low: bool) {
        if on != active_low {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }

    fn release_all(&mut self) {
        Self::set(&mut self.open, false, self.active_low);
        Self::set(&mut self.close, false, self.active_low);
    }

    fn drive_open(&mut self) {
        Self::set(&mut self.close, false, self.active_low);
        Self::set(&mut self.open, true, self.active_low);
    }

    fn drive_close(&mut self) {
        Self::set(&mut self.open, false, self.active_low);
        Self::set(&mut self.close, true, self.active_low);
    }
}

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

pub struct RelayCover {
    relays: Arc<Mutex<Relays>>,
    events: xch::Sender<DeviceStateEvent>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl RelayCover {
    pub fn new(pins: RelayPins) -> Result<(Self, xch::Receiver<DeviceStateEvent>), HwError> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut relays = Relays {
            open: gpio.get(pins.open_relay).map_err(gpio_err)?.into_output(),
            close: gpio.get(pins.close_relay).map_err(gpio_err)?.into_output(),
            active_low: pins.active_low,
        };
        relays.release_all();
        let relays = Arc::new(Mutex::new(relays));

        let open_limit = pins
            .open_limit
            .map(|p| gpio.get(p).map(|pin| pin.into_input_pullup()))
            .transpose()
            .map_err(gpio_err)?;
        let close_limit = pins
            .close_limit
            .map(|p| gpio.get(p).map(|pin| pin.into_input_pullup()))
            .transpose()
            .map_err(gpio_err)?;

        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let join_handle = if open_limit.is_some() || close_limit.is_some() {
            let watcher = LimitWatcher {
                open_limit,
                close_limit,
                active_low: pins.limit_active_low,
                relays: relays.clone(),
                events: tx.clone(),
            };
            let stop = shutdown.clone();
            let poll = pins.poll.max(Duration::from_millis(1));
            Some(std::thread::spawn(move || watcher.run(&stop, poll)))
        } else {
            None
        };

        tracing::info!(
            open_relay = pins.open_relay,
            close_relay = pins.close_relay,
            limits = join_handle.is_some(),
            "relay cover ready"
        );
        Ok((
            Self {
                relays,
                events: tx,
                shutdown,
                join_handle,
            },
            rx,
        ))
    }
}

impl Cover for RelayCover {
    fn send(
        &mut self,
        command: CoverCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut relays = self
            .relays
            .lock()
            .map_err(|_| HwError::Gpio("relay state poisoned".into()))?;
        let state = match command {
            CoverCommand::Open => {
                relays.drive_open();
                CoverState::Opening
            }
            CoverCommand::Close => {
                relays.drive_close();
                CoverState::Closing
            }
            CoverCommand::Stop => {
                relays.release_all();
                CoverState::Stopped
            }
        };
        tracing::debug!(?command, "relay command");
        let _ = self.events.send(DeviceStateEvent::new(state));
        Ok(())
    }

    fn supports_stop(&self) -> bool {
        true
    }
}

impl Drop for RelayCover {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut relays) = self.relays.lock() {
            relays.release_all();
        }
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "limit watcher thread panicked during shutdown");
            }
        }
    }
}

struct LimitWatcher {
    open_limit: Option<InputPin>,
    close_limit: Option<InputPin>,
    active_low: bool,
    relays: Arc<Mutex<Relays>>,
    events: xch::Sender<DeviceStateEvent>,
}

impl LimitWatcher {
    fn pressed(pin: Option<&InputPin>, active_low: bool) -> bool {
        pin.is_some_and(|p| p.is_low() == active_low)
    }

    fn run(self, shutdown: &AtomicBool, poll: Duration) {
        let mut was_open = false;
        let mut was_closed = false;
        while !shutdown.load(Ordering::Relaxed) {
            let is_open = Self::pressed(self.open_limit.as_ref(), self.active_low);
            let is_closed = Self::pressed(self.close_limit.as_ref(), self.active_low);
            if is_open && !was_open {
                self.arrived(CoverState::Open, 100);
            }
            if is_closed && !was_closed {
                self.arrived(CoverState::Closed, 0);
            }
            was_open = is_open;
            was_closed = is_closed;
            std::thread::sleep(poll);
        }
        tracing::trace!("limit watcher exiting cleanly");
    }

    fn arrived(&self, state: CoverState, position: u8) {
        if let Ok(mut relays) = self.relays.lock() {
            relays.release_all();
        }
        tracing::debug!(?state, "limit switch pressed");
        let _ = self
            .events
            .send(DeviceStateEvent::with_position(state, position));
    }
}

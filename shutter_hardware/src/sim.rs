//! Simulated binary shutter.
//!
//! A physics thread moves a true position at fixed travel rates and reports
//! state changes the way a real cover integration would: `Opening`/`Closing`
//! when motion starts, `Open`/`Closed` with a coarse position at the limits,
//! `Stopped` when halted in between. The controller never sees the true
//! position; tests read it through a `SimProbe`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use shutter_traits::{Cover, CoverCommand, CoverState, DeviceStateEvent};

use crate::error::HwError;

#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub time_to_open: Duration,
    pub time_to_close: Duration,
    /// True starting position in percent.
    pub initial_position: u8,
    /// Honor `CoverCommand::Stop`. Without it, a command against the current
    /// motion halts the motor (relay interlock behavior).
    pub supports_stop: bool,
    /// Physics step.
    pub tick: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            time_to_open: Duration::from_secs(20),
            time_to_close: Duration::from_secs(20),
            initial_position: 0,
            supports_stop: true,
            tick: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Up,
    Down,
}

#[derive(Debug)]
struct SimState {
    position: f64,
    motion: Option<Motion>,
    last_update: Instant,
}

struct Shared {
    params: SimParams,
    state: Mutex<SimState>,
    events: xch::Sender<DeviceStateEvent>,
    failing: AtomicBool,
    shutdown: AtomicBool,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, SimState>, HwError> {
        self.state
            .lock()
            .map_err(|_| HwError::Gpio("simulator state poisoned".into()))
    }

    fn emit(&self, ev: DeviceStateEvent) {
        // Nobody listening is fine; the simulator keeps running.
        let _ = self.events.send(ev);
    }

    /// Integrate motion up to `now`, emitting the endpoint event on arrival.
    fn advance(&self, st: &mut SimState, now: Instant) {
        let dt = now.saturating_duration_since(st.last_update);
        st.last_update = now;
        let Some(motion) = st.motion else {
            return;
        };
        let full = match motion {
            Motion::Up => self.params.time_to_open,
            Motion::Down => self.params.time_to_close,
        };
        let delta = dt.as_secs_f64() / full.as_secs_f64() * 100.0;
        match motion {
            Motion::Up => {
                st.position = (st.position + delta).min(100.0);
                if st.position >= 100.0 {
                    st.motion = None;
                    tracing::trace!("sim reached open limit");
                    self.emit(DeviceStateEvent::with_position(CoverState::Open, 100));
                }
            }
            Motion::Down => {
                st.position = (st.position - delta).max(0.0);
                if st.position <= 0.0 {
                    st.motion = None;
                    tracing::trace!("sim reached closed limit");
                    self.emit(DeviceStateEvent::with_position(CoverState::Closed, 0));
                }
            }
        }
    }

    fn drive(&self, st: &mut SimState, want: Motion) {
        let at_limit = match want {
            Motion::Up => st.position >= 100.0,
            Motion::Down => st.position <= 0.0,
        };
        if at_limit {
            // Already there; report the endpoint again like a real cover would.
            self.emit(match want {
                Motion::Up => DeviceStateEvent::with_position(CoverState::Open, 100),
                Motion::Down => DeviceStateEvent::with_position(CoverState::Closed, 0),
            });
            return;
        }
        match st.motion {
            Some(m) if m == want => {}
            Some(_) if !self.params.supports_stop => self.halt(st),
            _ => {
                st.motion = Some(want);
                self.emit(DeviceStateEvent::new(match want {
                    Motion::Up => CoverState::Opening,
                    Motion::Down => CoverState::Closing,
                }));
            }
        }
    }

    fn halt(&self, st: &mut SimState) {
        if st.motion.take().is_some() {
            self.emit(DeviceStateEvent::new(CoverState::Stopped));
        }
    }
}

/// Cloneable read-only view of the simulator's true position.
#[derive(Clone)]
pub struct SimProbe {
    shared: Arc<Shared>,
}

impl SimProbe {
    /// True position in percent, unrounded.
    pub fn position_exact(&self) -> f64 {
        self.shared
            .state
            .lock()
            .map(|st| st.position)
            .unwrap_or(f64::NAN)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn position(&self) -> u8 {
        self.position_exact().round().clamp(0.0, 100.0) as u8
    }

    pub fn is_moving(&self) -> bool {
        self.shared
            .state
            .lock()
            .map(|st| st.motion.is_some())
            .unwrap_or(false)
    }
}

pub struct SimulatedCover {
    shared: Arc<Shared>,
    join_handle: Option<JoinHandle<()>>,
}

impl SimulatedCover {
    /// Start the physics thread. Returns the cover and its event stream.
    pub fn spawn(params: SimParams) -> (Self, xch::Receiver<DeviceStateEvent>) {
        let (tx, rx) = xch::unbounded();
        let shared = Arc::new(Shared {
            params,
            state: Mutex::new(SimState {
                position: f64::from(params.initial_position.min(100)),
                motion: None,
                last_update: Instant::now(),
            }),
            events: tx,
            failing: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });
        let bg = shared.clone();
        let tick = params.tick.max(Duration::from_millis(1));
        let join_handle = std::thread::spawn(move || {
            while !bg.shutdown.load(Ordering::Relaxed) {
                if let Ok(mut st) = bg.state.lock() {
                    bg.advance(&mut st, Instant::now());
                }
                std::thread::sleep(tick);
            }
            tracing::trace!("sim physics thread exiting cleanly");
        });
        (
            Self {
                shared,
                join_handle: Some(join_handle),
            },
            rx,
        )
    }

    pub fn probe(&self) -> SimProbe {
        SimProbe {
            shared: self.shared.clone(),
        }
    }

    /// When set, every command is rejected.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::Relaxed);
    }

    /// Last state in device terms, e.g. to seed the calibration wizard.
    pub fn current_state(&self) -> CoverState {
        let Ok(st) = self.shared.state.lock() else {
            return CoverState::Stopped;
        };
        match st.motion {
            Some(Motion::Up) => CoverState::Opening,
            Some(Motion::Down) => CoverState::Closing,
            None if st.position >= 100.0 => CoverState::Open,
            None if st.position <= 0.0 => CoverState::Closed,
            None => CoverState::Stopped,
        }
    }

    fn apply(&self, command: CoverCommand) -> Result<(), HwError> {
        if self.shared.failing.load(Ordering::Relaxed) {
            return Err(HwError::CommandRejected(format!("{command:?}")));
        }
        let mut st = self.shared.lock()?;
        self.shared.advance(&mut st, Instant::now());
        match command {
            CoverCommand::Open => self.shared.drive(&mut st, Motion::Up),
            CoverCommand::Close => self.shared.drive(&mut st, Motion::Down),
            CoverCommand::Stop if self.shared.params.supports_stop => self.shared.halt(&mut st),
            CoverCommand::Stop => return Err(HwError::Unsupported("stop")),
        }
        Ok(())
    }
}

impl Cover for SimulatedCover {
    fn send(
        &mut self,
        command: CoverCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::trace!(?command, "sim command");
        self.apply(command).map_err(Into::into)
    }

    fn supports_stop(&self) -> bool {
        self.shared.params.supports_stop
    }
}

impl Drop for SimulatedCover {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "sim physics thread panicked during shutdown");
            }
        }
    }
}

//! Device construction from config.

use std::time::Duration;

use crossbeam_channel::Receiver;
use eyre::WrapErr;
use shutter_config::{Backend, Config, Cover};
use shutter_core::builder::DynCover;
use shutter_hardware::{SimParams, SimulatedCover};
use shutter_traits::{CoverState, DeviceStateEvent};

/// Every simulated command fails when set (any non-empty value).
pub const SIM_FAIL_ENV: &str = "SHUTTER_TEST_SIM_FAIL";

pub struct Device {
    pub cover: DynCover,
    pub events: Receiver<DeviceStateEvent>,
    /// Device-reported state at startup, when the backend knows it.
    pub initial_state: Option<CoverState>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("initial_state", &self.initial_state)
            .finish_non_exhaustive()
    }
}

/// Open the backend of `cover`. `true_position` seeds the simulator so it
/// agrees with the restored belief across runs.
pub fn open(cfg: &Config, cover: &Cover, true_position: Option<u8>) -> eyre::Result<Device> {
    match cover.backend {
        Backend::Simulated => Ok(open_sim(cfg, cover, true_position)),
        Backend::Relay => open_relay(cfg, cover),
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s.max(0.0))
}

fn open_sim(cfg: &Config, cover: &Cover, true_position: Option<u8>) -> Device {
    let params = SimParams {
        time_to_open: secs(
            cfg.simulation
                .time_to_open
                .unwrap_or(cover.calibration.time_to_open),
        ),
        time_to_close: secs(
            cfg.simulation
                .time_to_close
                .unwrap_or(cover.calibration.time_to_close),
        ),
        initial_position: true_position.unwrap_or(cfg.simulation.initial_position),
        supports_stop: cover.supports_stop,
        ..SimParams::default()
    };
    let (sim, events) = SimulatedCover::spawn(params);
    if std::env::var_os(SIM_FAIL_ENV).is_some_and(|v| !v.is_empty()) {
        tracing::warn!("{SIM_FAIL_ENV} set; simulated device rejects all commands");
        sim.set_failing(true);
    }
    let initial_state = Some(sim.current_state());
    tracing::info!(
        name = %cover.name,
        position = params.initial_position,
        supports_stop = params.supports_stop,
        "simulated cover ready"
    );
    Device {
        cover: Box::new(sim),
        events,
        initial_state,
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_relay(cfg: &Config, cover: &Cover) -> eyre::Result<Device> {
    use shutter_hardware::{RelayCover, RelayPins};

    let pins = cover
        .pins
        .as_ref()
        .ok_or_else(|| eyre::eyre!("relay backend requires [pins] for cover {:?}", cover.name))?;
    let (relay, events) = RelayCover::new(RelayPins {
        open_relay: pins.open_relay,
        close_relay: pins.close_relay,
        open_limit: pins.open_limit,
        close_limit: pins.close_limit,
        active_low: cfg.relay.active_low,
        limit_active_low: cfg.relay.limit_active_low,
        poll: Duration::from_millis(cfg.relay.poll_ms),
    })
    .wrap_err("open relay pins")?;
    tracing::info!(
        name = %cover.name,
        open_relay = pins.open_relay,
        close_relay = pins.close_relay,
        "relay cover ready"
    );
    Ok(Device {
        cover: Box::new(relay),
        events,
        initial_state: None,
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_relay(_cfg: &Config, cover: &Cover) -> eyre::Result<Device> {
    Err(eyre::eyre!(
        "relay backend for cover {:?} is not available in this build (enable the `hardware` feature on Linux)",
        cover.name
    ))
    .wrap_err("open relay pins")
}

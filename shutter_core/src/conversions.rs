//! Conversions bridging `shutter_config` types to `shutter_core` types.

use std::time::Duration;

use crate::calibration::TravelCalibration;
use crate::error::ShutterError;
use crate::wizard::{CalibrationReport, WizardCfg};

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&shutter_config::CalibrationCfg> for TravelCalibration {
    type Error = ShutterError;

    fn try_from(c: &shutter_config::CalibrationCfg) -> Result<Self, Self::Error> {
        Self::from_secs_f64(c.time_to_open, c.time_to_close)
    }
}

impl From<TravelCalibration> for shutter_config::CalibrationCfg {
    fn from(c: TravelCalibration) -> Self {
        Self {
            time_to_open: c.time_to_open().as_secs_f64(),
            time_to_close: c.time_to_close().as_secs_f64(),
        }
    }
}

impl From<&CalibrationReport> for shutter_config::CalibrationCfg {
    fn from(r: &CalibrationReport) -> Self {
        Self {
            time_to_open: r.time_to_open.as_secs_f64(),
            time_to_close: r.time_to_close.as_secs_f64(),
        }
    }
}

// ── Wizard ───────────────────────────────────────────────────────────────────

impl From<&shutter_config::WizardCfg> for WizardCfg {
    fn from(c: &shutter_config::WizardCfg) -> Self {
        Self {
            timeout: Duration::from_secs(c.timeout_s),
        }
    }
}

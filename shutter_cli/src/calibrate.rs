//! `calibrate`: measure travel times against each selected cover in turn.

use std::path::Path;

use eyre::WrapErr;
use serde::Serialize;
use shutter_config::{CalibrationCfg, CalibrationRow, CalibrationTable, Config, Cover};
use shutter_core::{CalibrationReport, Position, WizardCfg, run_wizard};
use shutter_traits::MonotonicClock;

use crate::{device, state};

/// `[calibration]` for a single-cover config.
#[derive(Serialize)]
struct CalibrationFile {
    calibration: CalibrationCfg,
}

/// `[[covers]]` entries for a cover-list config.
#[derive(Serialize)]
struct CoversFile {
    covers: Vec<CoverCalibration>,
}

#[derive(Serialize)]
struct CoverCalibration {
    name: String,
    calibration: CalibrationCfg,
}

/// Run the wizard over `covers` one after another, then write the measured
/// times to `out`. A failing cover stops the run before any file is written.
pub fn run(
    cfg: &Config,
    covers: &[Cover],
    out: Option<&Path>,
) -> eyre::Result<Vec<(String, CalibrationReport)>> {
    let mut reports = Vec::with_capacity(covers.len());
    for cover in covers {
        let report =
            calibrate_one(cfg, cover).wrap_err_with(|| format!("calibrating cover {:?}", cover.name))?;
        reports.push((cover.name.clone(), report));
    }

    if let Some(path) = out {
        write_output(path, !cfg.covers.is_empty(), &reports)?;
        tracing::info!(path = %path.display(), covers = reports.len(), "calibration written");
    }
    Ok(reports)
}

fn calibrate_one(cfg: &Config, cover: &Cover) -> eyre::Result<CalibrationReport> {
    let state_path = cover.state_path.as_deref().map(Path::new);
    let restored = match state_path {
        Some(p) => state::load(p)?,
        None => None,
    };
    let mut dev = device::open(cfg, cover, restored.map(|st| st.position))?;
    let wizard = WizardCfg::from(&cfg.wizard);
    tracing::info!(name = %cover.name, timeout_s = wizard.timeout.as_secs(), "calibration started");

    let report = run_wizard(
        &mut dev.cover,
        &dev.events,
        &MonotonicClock::new(),
        &wizard,
        dev.initial_state,
    )?;
    // Validates the measured values before anything is written.
    report.to_calibration()?;

    if report.degraded {
        tracing::warn!(name = %cover.name, "calibration degraded: a leg timed out; check the device and rerun");
    } else if let Some(p) = state_path {
        // The wizard's last leg ends fully open.
        state::save(p, Position::OPEN)?;
    }
    Ok(report)
}

fn write_output(
    path: &Path,
    cover_list: bool,
    reports: &[(String, CalibrationReport)],
) -> eyre::Result<()> {
    let bytes = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
        let rows = reports
            .iter()
            .map(|(name, r)| {
                let cal = CalibrationCfg::from(r);
                CalibrationRow {
                    name: name.clone(),
                    time_to_open: cal.time_to_open,
                    time_to_close: cal.time_to_close,
                }
            })
            .collect();
        CalibrationTable::from_rows(rows)?.to_csv()?
    } else if cover_list {
        let file = CoversFile {
            covers: reports
                .iter()
                .map(|(name, r)| CoverCalibration {
                    name: name.clone(),
                    calibration: CalibrationCfg::from(r),
                })
                .collect(),
        };
        toml::to_string(&file).wrap_err("serialize calibration")?.into_bytes()
    } else {
        let (_, report) = reports
            .first()
            .ok_or_else(|| eyre::eyre!("no cover was calibrated"))?;
        let file = CalibrationFile {
            calibration: CalibrationCfg::from(report),
        };
        toml::to_string(&file).wrap_err("serialize calibration")?.into_bytes()
    };
    shutter_core::atomic::write_atomic(path, &bytes)
        .wrap_err_with(|| format!("write calibration to {path:?}"))
}

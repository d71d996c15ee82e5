#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration import for the shutter controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The calibration CSV loader enforces headers and holds one row of travel
//!   times per cover, looked up by cover name.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Calibration CSV schema.
///
/// Expected headers:
/// name,time_to_open,time_to_close
///
/// Example:
/// name,time_to_open,time_to_close
/// Living room,20.0,18.5
/// Bedroom,31.2,29.9
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibrationRow {
    pub name: String,
    pub time_to_open: f64,
    pub time_to_close: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process physics simulation (default; no hardware needed).
    #[default]
    Simulated,
    /// GPIO relays plus optional limit switches.
    Relay,
}

/// One cover as written in `[cover]` or a `[[covers]]` entry.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoverCfg {
    pub name: String,
    /// Device halts on a native Stop command. When false the controller
    /// falls back to a reverse pulse.
    pub supports_stop: bool,
    pub backend: Backend,
    /// Travel times of this cover; the top-level `[calibration]` otherwise.
    pub calibration: Option<CalibrationCfg>,
    /// State file of this cover; the `[state] path` otherwise (single cover only).
    pub state_path: Option<String>,
    /// Relay pins of this cover; the top-level `[pins]` otherwise (single cover only).
    pub pins: Option<Pins>,
}

impl Default for CoverCfg {
    fn default() -> Self {
        Self {
            name: "shutter".into(),
            supports_stop: true,
            backend: Backend::Simulated,
            calibration: None,
            state_path: None,
            pins: None,
        }
    }
}

/// A cover with every fallback applied; what the commands operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct Cover {
    pub name: String,
    pub supports_stop: bool,
    pub backend: Backend,
    pub calibration: CalibrationCfg,
    pub state_path: Option<String>,
    pub pins: Option<Pins>,
}

/// Full-range travel times in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct CalibrationCfg {
    pub time_to_open: f64,
    pub time_to_close: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WizardCfg {
    /// Longest wait for each endpoint during calibration, in seconds.
    pub timeout_s: u64,
}

impl Default for WizardCfg {
    fn default() -> Self {
        Self { timeout_s: 60 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StateCfg {
    /// Where the last settled position is persisted between runs.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Physical travel times of the simulated motor, in seconds. Defaults to
    /// the calibrated ones when absent.
    pub time_to_open: Option<f64>,
    pub time_to_close: Option<f64>,
    /// True position the simulated shutter starts at.
    pub initial_position: u8,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            time_to_open: None,
            time_to_close: None,
            initial_position: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub open_relay: u8,
    pub close_relay: u8,
    pub open_limit: Option<u8>,
    pub close_limit: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayCfg {
    /// Relays are energized by a low level when true.
    pub active_low: bool,
    /// Limit switches read low when pressed when true.
    pub limit_active_low: bool,
    /// Limit switch polling interval in milliseconds.
    pub poll_ms: u64,
}

impl Default for RelayCfg {
    fn default() -> Self {
        Self {
            active_low: false,
            limit_active_low: true,
            poll_ms: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Either a single `[cover]` (the default cover when absent) or a list of
/// `[[covers]]`, never both.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cover: Option<CoverCfg>,
    #[serde(default)]
    pub covers: Vec<CoverCfg>,
    /// Travel times shared by covers that carry none of their own.
    #[serde(default)]
    pub calibration: Option<CalibrationCfg>,
    #[serde(default)]
    pub wizard: WizardCfg,
    #[serde(default)]
    pub state: StateCfg,
    #[serde(default)]
    pub simulation: SimulationCfg,
    /// Relay pins of a single cover.
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub relay: RelayCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn check_travel(key: &str, secs: f64) -> eyre::Result<()> {
    if !secs.is_finite() || secs <= 0.0 {
        eyre::bail!("{key} must be a positive number of seconds, got {secs}");
    }
    if secs > 3600.0 {
        eyre::bail!("{key} is unreasonably large (>1h)");
    }
    Ok(())
}

impl Config {
    fn cover_key(&self, idx: usize) -> String {
        if self.covers.is_empty() {
            "cover".into()
        } else {
            format!("covers[{idx}]")
        }
    }

    fn declared_covers(&self) -> eyre::Result<Vec<CoverCfg>> {
        match (&self.cover, self.covers.is_empty()) {
            (Some(_), false) => eyre::bail!("use either [cover] or [[covers]], not both"),
            (Some(c), true) => Ok(vec![c.clone()]),
            (None, true) => Ok(vec![CoverCfg::default()]),
            (None, false) => Ok(self.covers.clone()),
        }
    }

    /// Every configured cover in declaration order, fallbacks applied.
    pub fn covers(&self) -> eyre::Result<Vec<Cover>> {
        let declared = self.declared_covers()?;
        let single = declared.len() == 1;
        if !single && self.state.path.is_some() {
            eyre::bail!("[state] path cannot be shared by several covers; set state_path per cover");
        }

        let mut out: Vec<Cover> = Vec::with_capacity(declared.len());
        for (idx, c) in declared.into_iter().enumerate() {
            let key = self.cover_key(idx);
            let name = c.name.trim().to_string();
            if name.is_empty() {
                eyre::bail!("{key}.name must not be empty");
            }
            if out.iter().any(|o| o.name == name) {
                eyre::bail!("cover name {name:?} is used more than once");
            }
            let calibration = c.calibration.or(self.calibration).ok_or_else(|| {
                eyre::eyre!("cover {name:?} has no travel times; add [calibration] or {key}.calibration")
            })?;
            out.push(Cover {
                name,
                supports_stop: c.supports_stop,
                backend: c.backend,
                calibration,
                state_path: c.state_path.or_else(|| single.then(|| self.state.path.clone()).flatten()),
                pins: c.pins.or_else(|| single.then_some(self.pins).flatten()),
            });
        }
        Ok(out)
    }

    /// The covers named by `name`, or all of them when `name` is `None`.
    pub fn select_covers(&self, name: Option<&str>) -> eyre::Result<Vec<Cover>> {
        let all = self.covers()?;
        let Some(wanted) = name.map(str::trim) else {
            return Ok(all);
        };
        let names = all.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");
        match all.iter().find(|c| c.name == wanted) {
            Some(c) => Ok(vec![c.clone()]),
            None => eyre::bail!("no cover named {wanted:?}; configured covers: {names}"),
        }
    }

    /// The one cover a movement acts on: `name`, or the only cover configured.
    pub fn cover(&self, name: Option<&str>) -> eyre::Result<Cover> {
        let mut picked = self.select_covers(name)?;
        if picked.len() > 1 {
            let names = picked.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ");
            eyre::bail!("several covers are configured ({names}); name the one to act on");
        }
        picked
            .pop()
            .ok_or_else(|| eyre::eyre!("no cover is configured"))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Calibration
        if let Some(cal) = &self.calibration {
            check_travel("calibration.time_to_open", cal.time_to_open)?;
            check_travel("calibration.time_to_close", cal.time_to_close)?;
        }

        // Covers
        for (idx, c) in self.covers.iter().chain(self.cover.iter()).enumerate() {
            if let Some(cal) = &c.calibration {
                let key = self.cover_key(idx);
                check_travel(&format!("{key}.calibration.time_to_open"), cal.time_to_open)?;
                check_travel(&format!("{key}.calibration.time_to_close"), cal.time_to_close)?;
            }
        }
        let covers = self.covers()?;
        let mut state_paths = Vec::new();
        let mut relay_pins: Vec<(u8, &str)> = Vec::new();
        for cover in &covers {
            if let Some(p) = cover.state_path.as_deref() {
                if state_paths.contains(&p) {
                    eyre::bail!("state_path {p:?} is used by more than one cover");
                }
                state_paths.push(p);
            }
            if cover.backend == Backend::Relay {
                let Some(pins) = &cover.pins else {
                    eyre::bail!(
                        "[pins] is required when cover.backend = \"relay\" (cover {:?})",
                        cover.name
                    );
                };
                if pins.open_relay == pins.close_relay {
                    eyre::bail!("pins.open_relay and pins.close_relay must differ");
                }
                let used = [Some(pins.open_relay), Some(pins.close_relay), pins.open_limit, pins.close_limit];
                for pin in used.into_iter().flatten() {
                    if let Some((_, other)) = relay_pins.iter().find(|(p, _)| *p == pin) {
                        eyre::bail!("pin {pin} is used by both {other:?} and {:?}", cover.name);
                    }
                    relay_pins.push((pin, cover.name.as_str()));
                }
            }
        }
        if !relay_pins.is_empty() && self.relay.poll_ms == 0 {
            eyre::bail!("relay.poll_ms must be >= 1");
        }

        // Wizard
        if self.wizard.timeout_s == 0 {
            eyre::bail!("wizard.timeout_s must be >= 1");
        }
        if self.wizard.timeout_s > 60 * 60 {
            eyre::bail!("wizard.timeout_s is unreasonably large (>1h)");
        }

        // Simulation
        if let Some(t) = self.simulation.time_to_open {
            check_travel("simulation.time_to_open", t)?;
        }
        if let Some(t) = self.simulation.time_to_close {
            check_travel("simulation.time_to_close", t)?;
        }
        if self.simulation.initial_position > 100 {
            eyre::bail!("simulation.initial_position must be in [0, 100]");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}

/// Travel times keyed by cover name, as imported from CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    rows: BTreeMap<String, CalibrationCfg>,
}

impl CalibrationTable {
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.is_empty() {
            eyre::bail!("calibration table has no rows");
        }
        let mut out = BTreeMap::new();
        for (idx, row) in rows.into_iter().enumerate() {
            let name = row.name.trim().to_string();
            if name.is_empty() {
                eyre::bail!("calibration row {} has an empty name", idx + 2);
            }
            check_travel(&format!("row {} time_to_open", idx + 2), row.time_to_open)?;
            check_travel(&format!("row {} time_to_close", idx + 2), row.time_to_close)?;
            let cfg = CalibrationCfg {
                time_to_open: row.time_to_open,
                time_to_close: row.time_to_close,
            };
            if out.insert(name.clone(), cfg).is_some() {
                eyre::bail!("calibration table lists {name:?} more than once");
            }
        }
        Ok(Self { rows: out })
    }

    pub fn get(&self, name: &str) -> Option<&CalibrationCfg> {
        self.rows.get(name.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CalibrationCfg)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The table in the same CSV layout `load_calibration_csv` reads.
    pub fn to_csv(&self) -> eyre::Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for (name, cal) in self.iter() {
            wtr.serialize(CalibrationRow {
                name: name.to_string(),
                time_to_open: cal.time_to_open,
                time_to_close: cal.time_to_close,
            })
            .map_err(|e| eyre::eyre!("write calibration row {name:?}: {e}"))?;
        }
        wtr.into_inner()
            .map_err(|e| eyre::eyre!("flush calibration CSV: {e}"))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<CalibrationRow>> for CalibrationTable {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<CalibrationTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["name", "time_to_open", "time_to_close"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'name,time_to_open,time_to_close', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    CalibrationTable::try_from(rows)
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod calibrate;
mod cli;
mod device;
mod error_fmt;
mod logging;
mod motion;
mod state;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use shutter_config::{CalibrationTable, Config, Cover};
use shutter_core::{CalibrationReport, Position, TravelCalibration};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::motion::{Motion, MotionOutcome};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    // Plain (no color, no spantrace) reports; humanize() does the explaining.
    let _ = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install();

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("error: {err:#}\n\n{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = shutter_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Calibration CSV from `--calibration`, loaded once for every cover.
struct CsvOverride {
    path: PathBuf,
    table: CalibrationTable,
}

/// Travel times of `cover`, replaced by the CSV row of the same name when a
/// CSV was given.
fn resolve_calibration(
    cover: &Cover,
    csv: Option<&CsvOverride>,
) -> eyre::Result<TravelCalibration> {
    let row = match csv {
        Some(csv) => {
            let row = csv.table.get(&cover.name).copied().ok_or_else(|| {
                eyre::eyre!(
                    "calibration CSV {} has no row named {:?}",
                    csv.path.display(),
                    cover.name
                )
            })?;
            tracing::info!(name = %cover.name, "calibration overridden from CSV");
            row
        }
        None => cover.calibration,
    };
    Ok(TravelCalibration::try_from(&row)?)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(command = cli.cmd.name(), config = %cli.config.display(), "starting");

    let csv = match cli.calibration.as_deref() {
        Some(path) => Some(CsvOverride {
            path: path.to_path_buf(),
            table: shutter_config::load_calibration_csv(path)?,
        }),
        None => None,
    };
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    let selected = cli.cover.as_deref();

    let motion = match &cli.cmd {
        Commands::Open => Motion::Open,
        Commands::Close => Motion::Close,
        Commands::Stop => Motion::Stop,
        Commands::Move { position } => Motion::To(Position::try_from(*position)?),
        Commands::Calibrate { out } => {
            let covers = cfg.select_covers(selected)?;
            let reports = calibrate::run(&cfg, &covers, out.as_deref())?;
            print_calibration(&reports, cli.json);
            return Ok(());
        }
        Commands::Status => {
            print_status(&cfg.select_covers(selected)?, cli.json)?;
            return Ok(());
        }
        Commands::SelfCheck => {
            for cover in cfg.select_covers(selected)? {
                let calibration = resolve_calibration(&cover, csv.as_ref())?;
                // Constructing the device is the check; it is dropped right away.
                drop(device::open(&cfg, &cover, None)?);
                tracing::info!(
                    name = %cover.name,
                    time_to_open_s = calibration.time_to_open().as_secs_f64(),
                    time_to_close_s = calibration.time_to_close().as_secs_f64(),
                    "self-check passed"
                );
            }
            println!("OK");
            return Ok(());
        }
    };

    let cover = cfg.cover(selected)?;
    let calibration = resolve_calibration(&cover, csv.as_ref())?;
    let outcome = motion::run(&cfg, &cover, calibration, motion, timeout)?;
    print_outcome(cli.cmd.name(), &cover.name, &outcome, cli.json);
    Ok(())
}

fn print_outcome(command: &str, name: &str, outcome: &MotionOutcome, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "command": command,
                "name": name,
                "position": outcome.position.get(),
                "direction": outcome.direction.map(|d| d.as_str()),
                "elapsed_ms": u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
                "settled": outcome.settled,
                "interrupted": outcome.interrupted,
            })
        );
    } else {
        println!("move complete: position={}", outcome.position);
        if !outcome.settled {
            println!("warning: movement did not settle before the timeout; stopped");
        }
    }
}

fn print_calibration(reports: &[(String, CalibrationReport)], json_mode: bool) {
    for (name, report) in reports {
        let open_s = report.time_to_open.as_secs_f64();
        let close_s = report.time_to_close.as_secs_f64();
        if json_mode {
            println!(
                "{}",
                json!({
                    "name": name,
                    "time_to_open": open_s,
                    "time_to_close": close_s,
                    "degraded": report.degraded,
                })
            );
        } else {
            println!(
                "{name}: calibration complete: time_to_open={open_s:.1}s time_to_close={close_s:.1}s{}",
                if report.degraded { " (degraded)" } else { "" }
            );
        }
    }
}

fn print_status(covers: &[Cover], json_mode: bool) -> eyre::Result<()> {
    for cover in covers {
        let saved = match cover.state_path.as_deref() {
            Some(p) => state::load(Path::new(p))?,
            None => None,
        };
        if json_mode {
            println!(
                "{}",
                json!({
                    "name": cover.name,
                    "position": saved.map(|s| s.position),
                    "updated_unix_ms": saved.map(|s| s.updated_unix_ms),
                })
            );
        } else {
            match saved {
                Some(s) => println!("{}: position={}", cover.name, s.position),
                None => println!("{}: position=unknown", cover.name),
            }
        }
    }
    Ok(())
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Position estimation and movement control for binary shutters (hardware-agnostic).
//!
//! The device only understands open, close and (sometimes) stop, and only
//! reports when it is moving or sitting at an endpoint. This crate turns that
//! into a continuous 0..=100 position by dead reckoning against per-device
//! travel times, and drives arbitrary targets by stopping the device once the
//! estimate arrives. All hardware goes through `shutter_traits::Cover`.
//!
//! ## Architecture
//!
//! - **Position**: `Position` (0 = closed, 100 = open) and `Direction` (`position`)
//! - **Calibration**: full-range travel times (`calibration`)
//! - **Tracking**: `MovementState` sum type, `Idle` or `Moving` (`tracker`)
//! - **Estimation**: pure dead-reckoning function (`estimator`)
//! - **Scheduling**: generation-guarded single-slot stop (`scheduler`)
//! - **Control**: `ShutterController` orchestrates the above (`controller`)
//! - **Threading**: `ShutterService` runs a controller on its own thread (`service`)
//! - **Calibration wizard**: measures travel times against a device (`wizard`)
//!
//! Endpoint reports from the device always override the estimate.

pub mod atomic;
pub mod builder;
pub mod calibration;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod hw_error;
pub mod mocks;
pub mod position;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod tracker;
pub mod wizard;

pub use builder::{Shutter, ShutterControllerBuilder, build_controller};
pub use calibration::{MIN_TRAVEL, TravelCalibration};
pub use controller::ShutterController;
pub use error::{BuildError, Report, Result, ShutterError};
pub use estimator::estimate;
pub use position::{Direction, Position};
pub use service::{ShutterHandle, ShutterService};
pub use status::ShutterStatus;
pub use tracker::{Movement, MovementState};
pub use wizard::{CalibrationReport, WizardCfg, run_wizard};

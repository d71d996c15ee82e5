//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use shutter_core::error::{BuildError, ShutterError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCover => {
                "What happened: No cover device was provided to the controller.\nLikely causes: The device failed to initialize or was not wired into the builder.\nHow to fix: Ensure the backend in [cover] starts and is passed via with_cover(...).".to_string()
            }
            BuildError::MissingCalibration => {
                "What happened: Travel times were not set.\nLikely causes: The builder was not given a calibration.\nHow to fix: Provide [calibration] in the config or run `shutter calibrate`.".to_string()
            }
        };
    }

    if let Some(se) = err.downcast_ref::<ShutterError>() {
        return match se {
            ShutterError::InvalidTarget(p) => format!(
                "What happened: Target position {p} is out of range.\nLikely causes: A typo in --position.\nHow to fix: Use a value from 0 (closed) to 100 (open)."
            ),
            ShutterError::InvalidCalibration(msg) => format!(
                "What happened: Invalid calibration ({msg}).\nLikely causes: Zero or missing travel times in the config or CSV.\nHow to fix: Run `shutter calibrate --out FILE` and copy the result into the config."
            ),
            ShutterError::DeviceCommandFailed(msg) => format!(
                "What happened: The shutter did not accept a command ({msg}).\nLikely causes: Relay wiring, power, or GPIO permissions.\nHow to fix: Check [pins] and the relay board, then retry. The last estimated position was saved."
            ),
            ShutterError::DeviceTimeout => "What happened: The device did not respond in time.\nLikely causes: Power loss or a stuck relay.\nHow to fix: Check the device and retry.".to_string(),
            ShutterError::ServiceStopped => "What happened: The controller stopped unexpectedly.\nLikely causes: An internal panic; see logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail.".to_string(),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open relay pins") {
        return "What happened: Failed to initialize relay pins.\nLikely causes: Incorrect pin numbers, a build without the `hardware` feature, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration")
        || (lower.contains("pins") && lower.contains("requires"))
    {
        return "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] (open_relay, close_relay, ...) for the relay backend, or out-of-range values.\nHow to fix: Edit the TOML config and try again.".to_string();
    }

    if lower.contains("name the one to act on") || lower.contains("no cover named") {
        return "What happened: The command does not name a configured cover.\nLikely causes: Several covers are configured, or a typo in --cover.\nHow to fix: Pass --cover NAME with a name from [[covers]]; `status` lists them.".to_string();
    }

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'name,time_to_open,time_to_close'."
            .to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for controller errors; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use shutter_core::error::ShutterError;
    match err.downcast_ref::<ShutterError>() {
        Some(ShutterError::InvalidTarget(_)) => 3,
        Some(ShutterError::InvalidCalibration(_)) => 4,
        Some(ShutterError::DeviceCommandFailed(_)) => 5,
        Some(ShutterError::DeviceTimeout) => 6,
        Some(ShutterError::ServiceStopped) => 7,
        None => 1,
    }
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    use shutter_core::error::{BuildError, ShutterError};
    if let Some(se) = err.downcast_ref::<ShutterError>() {
        return match se {
            ShutterError::InvalidTarget(_) => "InvalidTarget",
            ShutterError::InvalidCalibration(_) => "InvalidCalibration",
            ShutterError::DeviceCommandFailed(_) => "DeviceCommandFailed",
            ShutterError::DeviceTimeout => "DeviceTimeout",
            ShutterError::ServiceStopped => "ServiceStopped",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_core::error::ShutterError;

    #[test]
    fn typed_errors_keep_their_exit_code_through_context() {
        let err = eyre::Report::new(ShutterError::DeviceCommandFailed("relay".into()))
            .wrap_err("send Open");
        assert_eq!(exit_code_for_error(&err), 5);
        assert_eq!(reason_name(&err), "DeviceCommandFailed");
    }

    #[test]
    fn cover_selection_errors_point_at_the_flag() {
        let err = eyre::eyre!("several covers are configured (a, b); name the one to act on");
        assert!(humanize(&err).contains("--cover NAME"));
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn csv_header_errors_are_explained() {
        let err = eyre::eyre!("calibration CSV must have headers 'name,time_to_open,time_to_close', got: a,b");
        assert!(humanize(&err).contains("Expected 'name,time_to_open,time_to_close'"));
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn json_errors_carry_reason_and_message() {
        let err = eyre::Report::new(ShutterError::InvalidTarget(150));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "InvalidTarget");
        assert!(v["message"].as_str().unwrap().contains("150"));
    }
}

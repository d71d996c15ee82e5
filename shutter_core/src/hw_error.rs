//! Maps `Box<dyn Error>` from the `Cover` trait boundary to typed `ShutterError`.
//!
//! The traits in `shutter_traits` use `Box<dyn Error + Send + Sync>` so any
//! adapter can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `shutter_hardware::HwError`.

use crate::error::ShutterError;

/// Map a trait-boundary error to a typed `ShutterError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ShutterError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<shutter_hardware::error::HwError>() {
            return match hw {
                shutter_hardware::error::HwError::Timeout => ShutterError::DeviceTimeout,
                other => ShutterError::DeviceCommandFailed(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        ShutterError::DeviceTimeout
    } else {
        ShutterError::DeviceCommandFailed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_become_command_failures() {
        let e = std::io::Error::other("relay stuck");
        assert_eq!(
            map_hw_error(&e),
            ShutterError::DeviceCommandFailed("relay stuck".into())
        );
    }

    #[test]
    fn timeout_text_maps_to_device_timeout() {
        let e = std::io::Error::other("bus timeout after 50ms");
        assert_eq!(map_hw_error(&e), ShutterError::DeviceTimeout);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_are_downcast() {
        let e = shutter_hardware::error::HwError::Timeout;
        assert_eq!(map_hw_error(&e), ShutterError::DeviceTimeout);
        let e = shutter_hardware::error::HwError::Unsupported("stop");
        assert!(matches!(
            map_hw_error(&e),
            ShutterError::DeviceCommandFailed(_)
        ));
    }
}

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    if let Ok(cfg) = shutter_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A config that validates must also yield usable covers.
            let covers = cfg.covers().expect("validated config resolves its covers");
            assert!(!covers.is_empty());
            for cover in covers {
                assert!(cover.calibration.time_to_open > 0.0);
                assert!(cover.calibration.time_to_close > 0.0);
            }
        }
    }
});

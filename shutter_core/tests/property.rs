use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use shutter_core::mocks::RecordingCover;
use shutter_core::{Position, ShutterController, TravelCalibration};
use shutter_traits::ManualClock;

prop_compose! {
    fn calibration_strategy()(
        open_ms in 500u64..120_000,
        close_ms in 500u64..120_000,
    ) -> TravelCalibration {
        TravelCalibration::new(
            Duration::from_millis(open_ms),
            Duration::from_millis(close_ms),
        ).unwrap()
    }
}

proptest! {
    #[test]
    fn estimate_moves_monotonically_toward_target(
        cal in calibration_strategy(),
        start in 0u8..=100,
        target in 0u8..=100,
        steps in proptest::collection::vec(1u64..2_000, 1..60),
    ) {
        let clock = ManualClock::new();
        let cover = RecordingCover::new(true);
        let start = Position::new(start).unwrap();
        let target = Position::new(target).unwrap();
        let mut c = ShutterController::new(cover, cal, start, Arc::new(clock.clone()));
        c.set_position(target).unwrap();

        let lo = start.min(target);
        let hi = start.max(target);
        let mut prev = c.current_position();
        prop_assert_eq!(prev, start);
        for ms in steps {
            clock.advance(Duration::from_millis(ms));
            c.poll().unwrap();
            let p = c.current_position();
            prop_assert!(p >= lo && p <= hi, "{} outside [{}, {}]", p, lo, hi);
            prop_assert!(p.distance(target) <= prev.distance(target));
            prev = p;
        }
    }

    #[test]
    fn scheduled_stop_lands_exactly_on_target(
        cal in calibration_strategy(),
        start in 0u8..=100,
        target in 0u8..=100,
    ) {
        let clock = ManualClock::new();
        let cover = RecordingCover::new(false);
        let start = Position::new(start).unwrap();
        let target = Position::new(target).unwrap();
        let mut c = ShutterController::new(cover, cal, start, Arc::new(clock.clone()));
        c.set_position(target).unwrap();
        if let Some(left) = c.time_until_stop() {
            clock.advance(left);
            prop_assert!(c.poll().unwrap());
        }
        prop_assert!(!c.is_moving());
        prop_assert!(!c.has_pending_stop());
        prop_assert_eq!(c.current_position(), target);
    }

    #[test]
    fn rounded_estimates_stay_in_range(raw in proptest::num::f64::ANY) {
        let p = Position::from_estimate(raw).get();
        prop_assert!(p <= 100);
    }
}

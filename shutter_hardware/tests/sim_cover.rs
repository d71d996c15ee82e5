use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use rstest::rstest;
use shutter_hardware::error::HwError;
use shutter_hardware::{SimParams, SimulatedCover};
use shutter_traits::{Cover, CoverCommand, CoverState, DeviceStateEvent};

fn params(open_ms: u64, close_ms: u64, initial: u8, supports_stop: bool) -> SimParams {
    SimParams {
        time_to_open: Duration::from_millis(open_ms),
        time_to_close: Duration::from_millis(close_ms),
        initial_position: initial,
        supports_stop,
        tick: Duration::from_millis(2),
    }
}

fn wait_for(
    rx: &xch::Receiver<DeviceStateEvent>,
    state: CoverState,
    timeout: Duration,
) -> Option<DeviceStateEvent> {
    let deadline = Instant::now() + timeout;
    while let Ok(ev) = rx.recv_deadline(deadline) {
        if ev.state == state {
            return Some(ev);
        }
    }
    None
}

#[test]
fn full_open_reports_motion_then_endpoint() {
    let (mut cover, rx) = SimulatedCover::spawn(params(100, 100, 0, true));
    let probe = cover.probe();
    cover.send(CoverCommand::Open).unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(100)).unwrap(),
        DeviceStateEvent::new(CoverState::Opening)
    );
    let ev = wait_for(&rx, CoverState::Open, Duration::from_secs(2)).expect("open endpoint");
    assert_eq!(ev.coarse_position, Some(100));
    assert_eq!(probe.position(), 100);
    assert!(!probe.is_moving());
}

#[test]
fn native_stop_halts_midway() {
    let (mut cover, rx) = SimulatedCover::spawn(params(1_000, 1_000, 0, true));
    let probe = cover.probe();
    cover.send(CoverCommand::Open).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    cover.send(CoverCommand::Stop).unwrap();
    assert!(wait_for(&rx, CoverState::Stopped, Duration::from_millis(100)).is_some());
    let p = probe.position();
    assert!((15..=60).contains(&p), "stopped at {p}");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(probe.position(), p);
}

#[test]
fn reverse_pulse_halts_a_binary_device() {
    let (mut cover, rx) = SimulatedCover::spawn(params(1_000, 1_000, 100, false));
    let probe = cover.probe();
    cover.send(CoverCommand::Close).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    cover.send(CoverCommand::Open).unwrap();
    assert!(wait_for(&rx, CoverState::Stopped, Duration::from_millis(100)).is_some());
    assert!(!probe.is_moving());
    assert!(probe.position() < 100);
}

#[rstest]
#[case(CoverCommand::Open, 100, CoverState::Open)]
#[case(CoverCommand::Close, 0, CoverState::Closed)]
fn command_at_limit_reports_the_endpoint(
    #[case] command: CoverCommand,
    #[case] at: u8,
    #[case] expected: CoverState,
) {
    let (mut cover, rx) = SimulatedCover::spawn(params(100, 100, at, true));
    cover.send(command).unwrap();
    let ev = rx.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(ev.state, expected);
    assert_eq!(ev.coarse_position, Some(at));
}

#[test]
fn failing_sim_rejects_commands() {
    let (mut cover, _rx) = SimulatedCover::spawn(params(100, 100, 0, true));
    cover.set_failing(true);
    let err = cover.send(CoverCommand::Open).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::CommandRejected(_))
    ));
    assert!(!cover.probe().is_moving());
}

#[test]
fn drop_joins_physics_thread() {
    for _ in 0..10 {
        let (mut cover, _rx) = SimulatedCover::spawn(params(50, 50, 0, true));
        cover.send(CoverCommand::Open).unwrap();
        drop(cover);
    }
}

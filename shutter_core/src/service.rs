//! Controller on its own thread.
//!
//! `ShutterService` owns a `ShutterController` on a dedicated thread and
//! serializes everything that can touch it: requests from handles, device
//! events, and the scheduled-stop timer all arrive through one
//! `crossbeam_channel::select!`. Pending device events are drained before a
//! due stop fires so an endpoint report always wins over the estimate.
//!
//! The thread is shut down and joined when the service is dropped; the
//! pending stop is cancelled with it. The timer runs in real time, so the
//! controller should use a real clock (`MonotonicClock`).

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use shutter_traits::{Cover, DeviceStateEvent};

use crate::calibration::TravelCalibration;
use crate::controller::ShutterController;
use crate::error::{Result, ShutterError};
use crate::position::Position;
use crate::status::ShutterStatus;

/// How often `wait_idle` re-checks the controller.
const IDLE_POLL: Duration = Duration::from_millis(10);

enum Request {
    Move {
        target: Position,
        reply: xch::Sender<Result<()>>,
    },
    Stop {
        reply: xch::Sender<Result<()>>,
    },
    Status {
        reply: xch::Sender<ShutterStatus>,
    },
    Reconfigure {
        calibration: TravelCalibration,
        reply: xch::Sender<Result<()>>,
    },
    Shutdown {
        reply: xch::Sender<Position>,
    },
}

/// Cloneable sender side of a running service.
#[derive(Debug, Clone)]
pub struct ShutterHandle {
    tx: xch::Sender<Request>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Request::Move { .. } => "Move",
            Request::Stop { .. } => "Stop",
            Request::Status { .. } => "Status",
            Request::Reconfigure { .. } => "Reconfigure",
            Request::Shutdown { .. } => "Shutdown",
        };
        f.write_str(name)
    }
}

impl ShutterHandle {
    fn call<T>(&self, make: impl FnOnce(xch::Sender<T>) -> Request) -> Result<T> {
        let (reply, rx) = xch::bounded(1);
        self.tx
            .send(make(reply))
            .map_err(|_| eyre::Report::new(ShutterError::ServiceStopped))?;
        rx.recv()
            .map_err(|_| eyre::Report::new(ShutterError::ServiceStopped))
    }

    pub fn open(&self) -> Result<()> {
        self.set_position(Position::OPEN)
    }

    pub fn close(&self) -> Result<()> {
        self.set_position(Position::CLOSED)
    }

    pub fn set_position(&self, target: Position) -> Result<()> {
        self.call(|reply| Request::Move { target, reply })?
    }

    pub fn stop(&self) -> Result<()> {
        self.call(|reply| Request::Stop { reply })?
    }

    pub fn status(&self) -> Result<ShutterStatus> {
        self.call(|reply| Request::Status { reply })
    }

    pub fn reconfigure(&self, calibration: TravelCalibration) -> Result<()> {
        self.call(|reply| Request::Reconfigure { calibration, reply })?
    }

    /// Block until the controller is idle or `timeout` elapses.
    ///
    /// Returns the idle status, or `None` if still moving at the deadline.
    pub fn wait_idle(&self, timeout: Duration) -> Result<Option<ShutterStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status()?;
            if !status.is_moving() {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(IDLE_POLL.min(deadline - now));
        }
    }
}

pub struct ShutterService {
    handle: ShutterHandle,
    join_handle: Option<JoinHandle<()>>,
}

impl ShutterService {
    /// Move `controller` onto a new thread fed by `events`.
    pub fn spawn<C: Cover + Send + 'static>(
        controller: ShutterController<C>,
        events: xch::Receiver<DeviceStateEvent>,
    ) -> Self {
        let (tx, rx) = xch::unbounded();
        let join_handle = std::thread::spawn(move || run(controller, &rx, events));
        Self {
            handle: ShutterHandle { tx },
            join_handle: Some(join_handle),
        }
    }

    /// A cloneable handle, e.g. for a Ctrl-C handler.
    pub fn handle(&self) -> ShutterHandle {
        self.handle.clone()
    }

    pub fn open(&self) -> Result<()> {
        self.handle.open()
    }

    pub fn close(&self) -> Result<()> {
        self.handle.close()
    }

    pub fn set_position(&self, target: Position) -> Result<()> {
        self.handle.set_position(target)
    }

    pub fn stop(&self) -> Result<()> {
        self.handle.stop()
    }

    pub fn status(&self) -> Result<ShutterStatus> {
        self.handle.status()
    }

    pub fn reconfigure(&self, calibration: TravelCalibration) -> Result<()> {
        self.handle.reconfigure(calibration)
    }

    pub fn wait_idle(&self, timeout: Duration) -> Result<Option<ShutterStatus>> {
        self.handle.wait_idle(timeout)
    }

    /// Stop the thread and return the position to persist. No device command
    /// is sent.
    pub fn shutdown(mut self) -> Result<Position> {
        let position = self.handle.call(|reply| Request::Shutdown { reply });
        self.join();
        position
    }

    fn join(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("shutter service thread joined"),
                Err(e) => tracing::warn!(?e, "shutter service thread panicked"),
            }
        }
    }
}

impl Drop for ShutterService {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            // The thread may already be gone; joining is what matters.
            let _ = self.handle.call(|reply| Request::Shutdown { reply });
            self.join();
        }
    }
}

fn run<C: Cover>(
    mut controller: ShutterController<C>,
    requests: &xch::Receiver<Request>,
    events: xch::Receiver<DeviceStateEvent>,
) {
    let mut events = Some(events);
    loop {
        let ev_rx = events.clone().unwrap_or_else(xch::never);
        let timer = controller
            .time_until_stop()
            .map_or_else(xch::never, xch::after);

        xch::select! {
            recv(requests) -> msg => {
                let Ok(req) = msg else {
                    let position = controller.shutdown();
                    tracing::debug!(position = %position, "all handles dropped; service exiting");
                    break;
                };
                if let Some(reply) = serve(&mut controller, req) {
                    let position = controller.shutdown();
                    let _ = reply.send(position);
                    break;
                }
            }
            recv(ev_rx) -> ev => match ev {
                Ok(ev) => {
                    controller.handle_event(ev);
                }
                Err(_) => {
                    tracing::debug!("device event channel closed");
                    events = None;
                }
            },
            recv(timer) -> _ => {
                for ev in ev_rx.try_iter() {
                    controller.handle_event(ev);
                }
                if let Err(e) = controller.poll() {
                    tracing::warn!(error = %e, "settle after scheduled stop failed");
                }
            }
        }
    }
    tracing::trace!("shutter service thread exiting cleanly");
}

/// Handle one request. Returns the reply channel when the loop should exit.
fn serve<C: Cover>(
    controller: &mut ShutterController<C>,
    req: Request,
) -> Option<xch::Sender<Position>> {
    tracing::trace!(request = ?req, "service request");
    match req {
        Request::Move { target, reply } => {
            let _ = reply.send(controller.set_position(target));
        }
        Request::Stop { reply } => {
            let _ = reply.send(controller.stop());
        }
        Request::Status { reply } => {
            let _ = reply.send(controller.status());
        }
        Request::Reconfigure { calibration, reply } => {
            let _ = reply.send(controller.reconfigure(calibration));
        }
        Request::Shutdown { reply } => return Some(reply),
    }
    None
}

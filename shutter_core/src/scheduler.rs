//! Single-slot deferred stop.
//!
//! The scheduler does not own a thread; whoever owns it decides when to check
//! for due work (`ShutterService` waits on `next_deadline`, tests advance a
//! `ManualClock` and call `poll`). Every `arm` and `cancel` bumps a generation
//! counter. A `StopTicket` taken from `due()` only fires if its generation is
//! still current, so a stop that was cancelled or re-armed after the ticket
//! was issued can never fire.

use std::time::{Duration, Instant};

/// Handle for one armed stop; fires only if still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTicket {
    generation: u64,
}

#[derive(Debug, Clone)]
struct PendingStop<T> {
    generation: u64,
    deadline: Instant,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct StopScheduler<T> {
    generation: u64,
    pending: Option<PendingStop<T>>,
}

impl<T> Default for StopScheduler<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            pending: None,
        }
    }
}

impl<T> StopScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire `delay` after `now`, replacing anything pending.
    pub fn arm(&mut self, now: Instant, delay: Duration, payload: T) -> StopTicket {
        self.generation = self.generation.wrapping_add(1);
        self.pending = Some(PendingStop {
            generation: self.generation,
            deadline: now + delay,
            payload,
        });
        StopTicket {
            generation: self.generation,
        }
    }

    /// Drop the pending stop, if any. Safe to call with nothing pending.
    /// Returns whether something was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        self.pending.take().is_some()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Time left until the pending stop is due (zero once overdue).
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(now))
    }

    /// Ticket for the pending stop if its deadline has passed.
    pub fn due(&self, now: Instant) -> Option<StopTicket> {
        self.pending
            .as_ref()
            .filter(|p| p.deadline <= now)
            .map(|p| StopTicket {
                generation: p.generation,
            })
    }

    /// Consume the pending stop if `ticket` is still current.
    pub fn fire(&mut self, ticket: StopTicket) -> Option<T> {
        match &self.pending {
            Some(p) if p.generation == ticket.generation => {
                self.pending.take().map(|p| p.payload)
            }
            _ => None,
        }
    }
}

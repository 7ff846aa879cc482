//! fokal-scheduler: debounce and supersede scheduling for recomposite
//! requests.
//!
//! Compositing parameter changes arrive in bursts (a user dragging a
//! slider). Running the compositor for every intermediate value wastes
//! work whose output is obsolete before it lands. [`Debouncer`] holds
//! the latest request until a quiet interval has passed, and hands out
//! a [`Ticket`] with each released request so a finished task can check
//! whether its result is still the current one.
//!
//! The scheduler owns no threads and reads no clocks: the caller
//! supplies every [`Instant`], which makes the behavior fully
//! deterministic under test and leaves the execution model (event
//! loop, worker thread, async runtime) to the embedder.
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use fokal_scheduler::Debouncer;
//!
//! let mut debouncer = Debouncer::new(Duration::from_millis(200));
//! let t0 = Instant::now();
//!
//! debouncer.submit("radius=5", t0);
//! // Still inside the quiet interval: nothing is released.
//! assert!(debouncer.take_due(t0 + Duration::from_millis(100)).is_none());
//!
//! // A newer request supersedes the pending one and restarts the wait.
//! debouncer.submit("radius=9", t0 + Duration::from_millis(100));
//! let released = debouncer.take_due(t0 + Duration::from_millis(301));
//! assert!(released.is_some());
//! if let Some((ticket, request)) = released {
//!     assert_eq!(request, "radius=9");
//!     assert!(debouncer.is_current(&ticket));
//! }
//! ```

use std::time::{Duration, Instant};

/// Proof of which submission a released request belongs to.
///
/// A task that finishes work for a released request presents its ticket
/// to [`Debouncer::is_current`]. A stale ticket means a newer request
/// was submitted in the meantime: the result must be discarded, never
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// Single-owner debouncer holding at most one pending request.
///
/// Each [`submit`](Self::submit) replaces whatever is pending and
/// restarts the quiet interval; only the newest request can ever be
/// released. Releases happen solely through
/// [`take_due`](Self::take_due), driven by caller-supplied time.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet_interval: Duration,
    generation: u64,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    generation: u64,
    request: T,
    due_at: Instant,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet interval.
    ///
    /// A zero interval releases each request on the first `take_due`
    /// at or after its submission time.
    #[must_use]
    pub const fn new(quiet_interval: Duration) -> Self {
        Self {
            quiet_interval,
            generation: 0,
            pending: None,
        }
    }

    /// The configured quiet interval.
    #[must_use]
    pub const fn quiet_interval(&self) -> Duration {
        self.quiet_interval
    }

    /// Submit a request, superseding any pending one.
    ///
    /// The request becomes due once the quiet interval has elapsed from
    /// `now`. Every submission bumps the generation counter, so tickets
    /// handed out for earlier submissions go stale immediately — even
    /// before the new request is released.
    pub fn submit(&mut self, request: T, now: Instant) {
        self.generation += 1;
        self.pending = Some(Pending {
            generation: self.generation,
            request,
            due_at: now + self.quiet_interval,
        });
    }

    /// Release the pending request if its quiet interval has elapsed.
    ///
    /// Returns `None` when nothing is pending or the interval has not
    /// yet passed. A released request is gone from the debouncer; the
    /// accompanying [`Ticket`] is the caller's handle for the staleness
    /// check once the work finishes.
    pub fn take_due(&mut self, now: Instant) -> Option<(Ticket, T)> {
        if self.pending.as_ref()?.due_at > now {
            return None;
        }
        self.pending.take().map(|p| {
            (
                Ticket {
                    generation: p.generation,
                },
                p.request,
            )
        })
    }

    /// Whether a ticket still corresponds to the newest submission.
    ///
    /// `false` means the ticket's request was superseded and its result
    /// must be discarded.
    #[must_use]
    pub const fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Whether a request is waiting out its quiet interval.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time remaining until the pending request becomes due, if any.
    ///
    /// Returns `Some(Duration::ZERO)` for a request that is already
    /// due but not yet taken. Useful for callers that sleep between
    /// polls instead of busy-waiting.
    #[must_use]
    pub fn due_in(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.due_at.saturating_duration_since(now))
    }

    /// Drop the pending request without releasing it.
    ///
    /// Tickets from earlier releases keep their validity: cancelling
    /// does not bump the generation.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

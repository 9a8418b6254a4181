//! Cooperative transport scheduling

use canbridge_core::{Monotonic, Transport};
use fugit::MillisDurationU32;

/// Length of one housekeeping window
pub const HOUSEKEEPING_WINDOW: MillisDurationU32 = MillisDurationU32::from_ticks(10);

/// Cooperative round-robin driver for the transport adapters.
///
/// The loop has two nested phases. The *fast phase* polls every adapter in
/// fixed slice order, re-reading the timer after each full round, until
/// more than [`HOUSEKEEPING_WINDOW`] has elapsed since the phase began.
/// The *housekeeping phase* then makes a single `poll_10ms` pass in the
/// same order and the fast phase restarts.
///
/// There is exactly one thread of control: no adapter is ever polled
/// concurrently with another, and housekeeping never overlaps a fast poll.
/// The scheduler has no preemption or timeout of its own; responsiveness
/// rests entirely on every `poll` being non-blocking and bounded.
pub struct Scheduler<M> {
    timer: M,
}

impl<M: Monotonic> Scheduler<M> {
    /// Create an instance
    pub fn new(timer: M) -> Self {
        Self { timer }
    }

    /// One full scheduling window: fast polls until the housekeeping
    /// window elapses, then one housekeeping pass.
    ///
    /// The exit check is wraparound safe, so windows straddling a timer
    /// overflow keep their length.
    pub fn cycle(&mut self, transports: &mut [&mut dyn Transport]) {
        let start = self.timer.now_ms();
        loop {
            let now = self.timer.now_ms();
            if now.wrapping_sub(start) > HOUSEKEEPING_WINDOW.ticks() {
                break;
            }
            for transport in transports.iter_mut() {
                transport.poll();
            }
        }
        for transport in transports.iter_mut() {
            transport.poll_10ms();
        }
    }

    /// Drive the transports forever.
    pub fn run(mut self, transports: &mut [&mut dyn Transport]) -> ! {
        loop {
            self.cycle(transports);
        }
    }
}

//! Fixed boot sequence and unrecoverable-fault handling
//!
//! The boot order is load-bearing: the clock tree comes up at the factory
//! default when the clock manager is constructed (before anything timing
//! sensitive runs), persisted configuration is restored next (which may
//! immediately retune the tree through the registered change handler),
//! transports start once their clocks are final, and the scheduler runs
//! from then on. [`run`] owns everything past construction; the crate-level
//! docs show the construction half.

use crate::scheduler::Scheduler;
use crate::settings::{Entry, Settings};
use canbridge_core::{Monotonic, SettingsStore, Transport};
use embedded_hal::digital::v2::OutputPin;
use generic_array::ArrayLength;
use log::info;

/// Park the processor.
///
/// The only defined response to a failed clock tree programming step:
/// execution cannot safely continue on an inconsistent tree and no retry
/// can repair it.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Run the fixed boot sequence and enter the scheduler loop.
///
/// Lights the power LED, replays persisted configuration into the
/// registry, starts every transport in slice order and never returns.
pub fn run<'a, L, M, S, N>(
    power_led: &mut L,
    timer: M,
    settings: &mut Settings<'a, N>,
    store: &mut S,
    transports: &mut [&mut dyn Transport],
) -> !
where
    L: OutputPin,
    M: Monotonic,
    S: SettingsStore,
    N: ArrayLength<Option<Entry<'a>>>,
{
    power_led.set_high().ok();
    settings.restore(store);
    for transport in transports.iter_mut() {
        transport.start();
    }
    info!("boot complete");
    Scheduler::new(timer).run(transports)
}

#![no_std]
#![warn(missing_docs)]

//! `canbridge-core` provides the set of essential abstractions that serve as
//! a thin integration layer between the platform independent [`canbridge`]
//! runtime and platform specific HAL crates (in documentation also referred
//! to as _target HALs_).
//!
//! The runtime never touches a peripheral directly; everything it schedules
//! or reconfigures is reached through a trait from this crate. Traits here
//! are not supposed to be implemented by the application developer;
//! implementations should be provided by target HALs or board support
//! crates, which are responsible for the soundness of their implementations
//! and for conforming to the respective contracts.
//!
//! [`canbridge`]: <https://docs.rs/crate/canbridge/>

pub use fugit;

/// Trait representing clock control block identity
///
/// Types implementing this trait are expected to be used as marker types
/// identifying the reset and clock control register block of the target MCU.
/// It only conveys *where* the block is located, not that it can be
/// accessed; exclusive access is the contract of the handle constructed from
/// it.
///
/// # Safety
/// `RccId::ADDRESS` points to the start of a valid reset and clock control
/// HW register block.
///
/// # Examples
/// ```
/// use canbridge_core::RccId;
///
/// pub enum Rcc0 {}
///
/// unsafe impl RccId for Rcc0 {
///     const ADDRESS: *const () = 0x4002_1000 as *const _;
/// }
/// ```
pub unsafe trait RccId {
    /// Static address of the reset and clock control HW register block
    const ADDRESS: *const ();
}

/// Source feeding the system clock mux
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SysclkSource {
    /// The always-available internal oscillator
    Internal,
    /// The main PLL output
    Pll,
}

/// Source feeding the CAN peripheral's kernel clock
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CanClockSource {
    /// External oscillator
    External,
    /// Main PLL output
    Pll,
    /// Peripheral bus clock
    PeripheralBus,
}

/// Divider chain of the main PLL
///
/// The synthesized system clock is `reference / m * n / r`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PllConfig {
    /// Reference divider
    pub m: u8,
    /// Feedback multiplier
    pub n: u8,
    /// System clock output divider
    pub r: u8,
}

/// Trait representing the programmable steps of the processor clock tree
///
/// A clock reconfiguration is a *sequence* of these steps, and only one
/// ordering of them is safe; that ordering is owned by the runtime's clock
/// controller, never by implementations. Implementations are expected to
/// block until the hardware acknowledges a step (source ready, PLL locked,
/// mux switched) and to report a step that the hardware never acknowledges
/// as an error instead of spinning forever.
///
/// A failed step leaves the tree in an unspecified state. Callers treat it
/// as unrecoverable; there is no rollback contract.
pub trait ClockTree {
    /// Error reported by a failed programming step
    type Error;

    /// Frequency of the internal reference oscillator feeding the PLL
    fn reference_clock(&self) -> fugit::HertzU32;

    /// Switch the system clock mux to `source` and wait for the switch to
    /// be acknowledged.
    ///
    /// Selecting [`SysclkSource::Pll`] also programs the bus prescalers so
    /// that the peripheral bus runs at half the core clock.
    fn select_sysclk(&mut self, source: SysclkSource) -> Result<(), Self::Error>;

    /// Stop the PLL, reprogram its divider chain and restart it.
    ///
    /// Callers must have moved the system clock off the PLL first;
    /// implementations may assume the PLL output is unused while this runs.
    fn apply_pll(&mut self, config: &PllConfig) -> Result<(), Self::Error>;

    /// Route the CAN peripheral's kernel clock to `source`.
    fn select_can_clock(&mut self, source: CanClockSource) -> Result<(), Self::Error>;
}

/// Monotonic millisecond clock source
pub trait Monotonic {
    /// Milliseconds since an arbitrary epoch.
    ///
    /// The counter is monotonically non-decreasing and wraps on overflow;
    /// consumers must compare instants with `wrapping_sub`.
    fn now_ms(&self) -> u32;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Capability set of a transport adapter (USB, UART, CAN)
///
/// Adapters own their peripheral and buffer state exclusively; the runtime
/// holds a `&mut dyn Transport` and calls nothing beyond these three
/// operations.
pub trait Transport {
    /// Begin operation. Called once, at the end of boot.
    fn start(&mut self) {}

    /// Service in-flight I/O.
    ///
    /// Called continuously from the scheduler's fast phase. Must return
    /// promptly (microseconds, not milliseconds) and must never block.
    /// Faults are the adapter's to absorb; there is no error channel back
    /// to the scheduler.
    fn poll(&mut self);

    /// Periodic housekeeping, called about every 10 ms.
    fn poll_10ms(&mut self) {}
}

/// Source of persisted configuration records
///
/// Storage format, decoding and versioning are the implementation's
/// concern; the runtime only ever sees settled `(key, value)` pairs.
pub trait SettingsStore {
    /// Replay every persisted record into `sink`.
    fn load(&mut self, sink: &mut dyn FnMut(&str, i32));
}

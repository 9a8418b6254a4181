#![no_std]
#![warn(missing_docs)]
//! # canbridge
//!
//! ## Overview
//! This crate is the platform-agnostic runtime core of a USB/UART to CAN FD
//! protocol adapter board.
//!
//! It provides the following features:
//!
//! - a cooperative, single-threaded scheduler that services every transport
//!   adapter continuously and guarantees a periodic housekeeping pass
//! - safe runtime reconfiguration of the processor clock tree, driven by a
//!   persisted CAN kernel clock preference
//! - a fixed-capacity live settings registry with synchronous change
//!   notification
//! - a register-level clock-tree driver for the MCU family the adapter
//!   ships on
//!
//! Everything platform specific is reached through the traits of
//! [`canbridge_core`]: the millisecond timer, the transport adapters, the
//! clock tree programming steps and the persisted settings source. Target
//! HALs implement those traits; this crate owns the sequencing.
//!
//! ## Clocking
//!
//! The CAN peripheral's kernel clock is taken from the peripheral bus,
//! which runs at half the core clock; the core must therefore run at twice
//! the desired kernel rate. Only three kernel rates are supported (60, 80
//! and 85 MHz) because the PLL can only synthesize discrete outputs; the
//! persisted preference is clamped to that set and never rejected. See
//! [`manager::CanClock`] for the exact policy.
//!
//! Reconfiguration is ordered by [`clock::ClockController`]: the system
//! clock is moved to the internal oscillator, the PLL is reprogrammed, the
//! system clock is moved back, and the CAN kernel clock source is selected
//! last. Reprogramming a PLL that still drives the core hangs the
//! processor, so the ordering lives in exactly one place.
//!
//! ## Usage
//!
//! The integrator constructs the platform pieces, wires the clock chain,
//! registers the clock preference with the settings registry and hands
//! everything to the boot sequence:
//!
//! ```no_run
//! use canbridge::boot;
//! use canbridge::clock::ClockController;
//! use canbridge::generic_array::typenum::consts::U4;
//! use canbridge::manager::{ClockManager, CLOCK_KEY};
//! use canbridge::reg::Rcc;
//! use canbridge::settings::Settings;
//! use canbridge::core::Transport;
//! # use canbridge::core::{Monotonic, SettingsStore};
//! # use core::convert::Infallible;
//!
//! /// Clock control block of the target MCU.
//! pub enum Rcc0 {}
//!
//! unsafe impl canbridge::core::RccId for Rcc0 {
//!     const ADDRESS: *const () = 0x4002_1000 as *const _;
//! }
//! # struct Tick;
//! # impl Monotonic for Tick { fn now_ms(&self) -> u32 { 0 } }
//! # struct Uart; struct CanFd; struct Usb;
//! # impl Transport for Uart { fn poll(&mut self) {} }
//! # impl Transport for CanFd { fn poll(&mut self) {} fn poll_10ms(&mut self) {} }
//! # impl Transport for Usb { fn poll(&mut self) {} fn poll_10ms(&mut self) {} }
//! # struct Flash;
//! # impl SettingsStore for Flash { fn load(&mut self, _: &mut dyn FnMut(&str, i32)) {} }
//! # struct Led;
//! # impl embedded_hal::digital::v2::OutputPin for Led {
//! #     type Error = Infallible;
//! #     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//! #     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # let (mut uart, mut can, mut usb) = (Uart, CanFd, Usb);
//! # let (timer, mut flash, mut led) = (Tick, Flash, Led);
//!
//! // Bring the clock tree up at the factory default before anything
//! // timing sensitive is constructed. A failure here is unrecoverable.
//! // Safety: this is the only `Rcc` handle in the firmware.
//! let rcc = unsafe { Rcc::<Rcc0>::new() };
//! let mut clock = ClockManager::new(ClockController::new(rcc))
//!     .unwrap_or_else(|_| boot::halt());
//!
//! let mut settings = Settings::<U4>::new();
//! settings
//!     .register(CLOCK_KEY, &mut clock)
//!     .unwrap_or_else(|_| boot::halt());
//!
//! // Fast-phase polling order is the slice order.
//! let mut transports: [&mut dyn Transport; 3] = [&mut uart, &mut can, &mut usb];
//! boot::run(&mut led, timer, &mut settings, &mut flash, &mut transports)
//! ```
//!
//! A live write such as `settings.write(CLOCK_KEY, 60_000_000)`, issued by
//! whatever command channel the integrator wires to the registry, resolves
//! the preference and reprograms the clock tree synchronously, before the
//! write returns.

pub mod boot;
pub mod clock;
pub mod manager;
pub mod prelude;
pub mod reg;
pub mod scheduler;
pub mod settings;

pub use canbridge_core as core;
pub use generic_array;

#[cfg(test)]
pub(crate) mod mock;

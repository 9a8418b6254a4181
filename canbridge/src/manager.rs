//! Clock rate preference management

use crate::clock::{ClockController, ClockError};
use crate::settings::Setting;
use canbridge_core::ClockTree;
use fugit::HertzU32;
use log::debug;

/// Settings registry key the clock preference lives under
pub const CLOCK_KEY: &str = "clock";

/// Factory default CAN kernel clock preference in Hz
pub const DEFAULT_CAN_HZ: i32 = 85_000_000;

/// Supported CAN kernel clock tiers
///
/// The PLL only synthesizes discrete outputs, so an arbitrary preference
/// has to land on one of these.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CanClock {
    /// 60 MHz
    Mhz60,
    /// 80 MHz
    Mhz80,
    /// 85 MHz
    Mhz85,
}

impl CanClock {
    /// Tier used when the requested rate is unrecognized
    pub const DEFAULT: Self = CanClock::Mhz85;

    /// Resolve a requested rate to a supported tier.
    ///
    /// Floors to the nearest tier at or below the request. Anything below
    /// the lowest tier falls back to the default instead of the nearest
    /// tier: a rate that low is an unset or corrupt preference, and the
    /// board must still come up with a working bus. Never an error.
    pub fn resolve(requested_hz: i32) -> Self {
        if requested_hz >= 85_000_000 {
            CanClock::Mhz85
        } else if requested_hz >= 80_000_000 {
            CanClock::Mhz80
        } else if requested_hz >= 60_000_000 {
            CanClock::Mhz60
        } else {
            Self::DEFAULT
        }
    }

    /// Kernel clock frequency of this tier
    pub fn frequency(self) -> HertzU32 {
        match self {
            CanClock::Mhz60 => HertzU32::from_raw(60_000_000),
            CanClock::Mhz80 => HertzU32::from_raw(80_000_000),
            CanClock::Mhz85 => HertzU32::from_raw(85_000_000),
        }
    }

    /// Core clock required for this tier.
    ///
    /// The kernel clock is taken from the peripheral bus at half the core
    /// clock, so the core must run at exactly twice the kernel rate.
    pub fn core_frequency(self) -> HertzU32 {
        self.frequency() * 2
    }
}

/// Persisted clock preference
///
/// A single numeric field; the configuration channel owns its wire format.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClockSettings {
    /// Desired CAN kernel clock in Hz
    pub can_hz: i32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            can_hz: DEFAULT_CAN_HZ,
        }
    }
}

/// Owns the clock preference and keeps the hardware in sync with it.
///
/// Registered with the settings registry under [`CLOCK_KEY`]; every write
/// through the registry re-applies the (re-resolved) preference before the
/// write returns.
pub struct ClockManager<T: ClockTree> {
    preference: ClockSettings,
    controller: ClockController<T>,
}

impl<T: ClockTree> ClockManager<T> {
    /// Create an instance and bring the clock tree up at the default
    /// preference.
    pub fn new(controller: ClockController<T>) -> Result<Self, ClockError<T::Error>> {
        let mut manager = Self {
            preference: ClockSettings::default(),
            controller,
        };
        manager.apply()?;
        Ok(manager)
    }

    /// Current preference
    pub fn preference(&self) -> ClockSettings {
        self.preference
    }

    /// Resolve the preference and reprogram the clock tree accordingly.
    ///
    /// Returns the tier that was applied.
    pub fn apply(&mut self) -> Result<CanClock, ClockError<T::Error>> {
        let rate = CanClock::resolve(self.preference.can_hz);
        debug!(
            "can clock: {} Hz requested, {} Hz applied",
            self.preference.can_hz,
            rate.frequency().to_Hz()
        );
        self.controller.configure(rate.core_frequency())?;
        Ok(rate)
    }
}

impl<T: ClockTree> Setting for ClockManager<T> {
    fn set(&mut self, value: i32) {
        self.preference.can_hz = value;
    }

    fn get(&self) -> i32 {
        self.preference.can_hz
    }

    fn changed(&mut self) {
        // Nothing can retry a failed reprogram, and an inconsistent tree
        // is unsafe to keep executing on.
        if self.apply().is_err() {
            crate::boot::halt();
        }
    }
}

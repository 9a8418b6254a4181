//! Clock tree reconfiguration sequencing

use canbridge_core::{CanClockSource, ClockTree, PllConfig, SysclkSource};
use core::ops::RangeInclusive;
use fugit::HertzU32;
use log::trace;

/// Frequency at the PLL phase comparator input, after the reference divider
pub const PLL_COMPARATOR: HertzU32 = HertzU32::from_raw(4_000_000);

/// Granularity of synthesizable core clocks (`comparator / r`)
pub const SYNTHESIS_STEP: HertzU32 = HertzU32::from_raw(2_000_000);

const PLL_M_RANGE: RangeInclusive<u32> = 1..=16;
const PLL_N_RANGE: RangeInclusive<u32> = 8..=127;
const PLL_R: u32 = 2;

/// Misconfigurations of the PLL divider chain
#[derive(Debug, PartialEq, Eq)]
pub enum PllError {
    /// Reference oscillator does not divide down to the comparator input
    ReferenceNotDivisible {
        /// Reference frequency reported by the clock tree
        reference: HertzU32,
    },
    /// Reference divider is outside the wrapped `RangeInclusive`
    DividerOutOfRange(RangeInclusive<u32>),
    /// Requested rate is not a whole number of synthesis steps
    NoIntegerMultiplier {
        /// Requested core clock rate
        target: HertzU32,
    },
    /// Feedback multiplier is outside the wrapped `RangeInclusive`
    MultiplierOutOfRange(RangeInclusive<u32>),
}

/// Errors that may occur while reprogramming the clock tree
#[derive(Debug)]
pub enum ClockError<E> {
    /// Problems with the PLL divider derivation
    Pll(PllError),
    /// A hardware programming step failed
    Tree(E),
}

impl<E> From<PllError> for ClockError<E> {
    fn from(value: PllError) -> Self {
        Self::Pll(value)
    }
}

/// Sequences reconfigurations of the processor clock tree.
///
/// Owns the [`ClockTree`] handle exclusively; no other component may touch
/// the tree once the controller is constructed. All timing sensitive state
/// downstream (bit timings, baud generators, the millisecond tick) is
/// invalid while [`configure`](Self::configure) runs and settles again once
/// it returns.
pub struct ClockController<T: ClockTree> {
    tree: T,
}

impl<T: ClockTree> ClockController<T> {
    /// Create an instance
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    /// PLL dividers reaching `target` from the tree's reference oscillator.
    ///
    /// Pure function of its inputs; the same target always yields the same
    /// dividers.
    pub fn pll_settings(&self, target: HertzU32) -> Result<PllConfig, PllError> {
        let reference = self.tree.reference_clock();
        let m = if let Some(0) = reference.to_Hz().checked_rem(PLL_COMPARATOR.to_Hz()) {
            reference / PLL_COMPARATOR
        } else {
            return Err(PllError::ReferenceNotDivisible { reference });
        };
        if !PLL_M_RANGE.contains(&m) {
            return Err(PllError::DividerOutOfRange(PLL_M_RANGE));
        }
        let n = if let Some(0) = target.to_Hz().checked_rem(SYNTHESIS_STEP.to_Hz()) {
            target / SYNTHESIS_STEP
        } else {
            return Err(PllError::NoIntegerMultiplier { target });
        };
        if !PLL_N_RANGE.contains(&n) {
            return Err(PllError::MultiplierOutOfRange(PLL_N_RANGE));
        }
        Ok(PllConfig {
            m: m as u8,
            n: n as u8,
            r: PLL_R as u8,
        })
    }

    /// Reprogram the clock tree so the core runs at `target`.
    ///
    /// The steps must happen in exactly this order: the core moves to the
    /// internal oscillator, the PLL is reprogrammed while nothing runs off
    /// it, the core moves back to the PLL output, and the CAN kernel clock
    /// source is selected last. A step that fails leaves the tree
    /// inconsistent; the caller's only option is to halt.
    pub fn configure(&mut self, target: HertzU32) -> Result<(), ClockError<T::Error>> {
        let pll = self.pll_settings(target)?;
        trace!(
            "clock tree: {} Hz core, m={} n={} r={}",
            target.to_Hz(),
            pll.m,
            pll.n,
            pll.r
        );
        self.tree
            .select_sysclk(SysclkSource::Internal)
            .map_err(ClockError::Tree)?;
        self.tree.apply_pll(&pll).map_err(ClockError::Tree)?;
        self.tree
            .select_sysclk(SysclkSource::Pll)
            .map_err(ClockError::Tree)?;
        self.tree
            .select_can_clock(CanClockSource::PeripheralBus)
            .map_err(ClockError::Tree)
    }
}

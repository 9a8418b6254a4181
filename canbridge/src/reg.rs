//! Register-level clock tree driver
//!
//! Models the reset and clock control block of the STM32G4 family the
//! adapter ships on: a marker type carries the block's address, a
//! `#[repr(C)]` view maps the registers this driver touches, and
//! `bitfield` accessors name their fields. Ready and lock waits are
//! bounded; a flag the hardware never raises surfaces as an [`Error`]
//! instead of a silent hang.

use bitfield::bitfield;
use canbridge_core::{CanClockSource, ClockTree, PllConfig, RccId, SysclkSource};
use core::marker::PhantomData;
use fugit::HertzU32;
use vcell::VolatileCell;

/// Internal high speed oscillator frequency
pub const HSI16: HertzU32 = HertzU32::from_raw(16_000_000);

/// Spins granted to a ready flag before the step is declared failed
const READY_SPINS: u32 = 500_000;

// System clock mux encodings (CFGR.SW / CFGR.SWS).
const SW_HSI16: u8 = 0b01;
const SW_PLL: u8 = 0b11;
// Bus prescaler encodings (CFGR.HPRE / CFGR.PPREx).
const HPRE_DIV1: u8 = 0b0000;
const PPRE_DIV2: u8 = 0b100;
// PLL reference selection (PLLCFGR.PLLSRC).
const PLLSRC_HSI16: u8 = 0b10;
// CAN kernel clock selection (CCIPR.FDCANSEL).
const FDCANSEL_EXTERNAL: u8 = 0b00;
const FDCANSEL_PLL: u8 = 0b01;
const FDCANSEL_PCLK: u8 = 0b10;

bitfield! {
    /// Clock control register
    pub struct Cr(u32);
    impl Debug;
    // hsion: internal oscillator enable, hsirdy: oscillator ready,
    // pllon: main PLL enable, pllrdy: main PLL lock
    pub hsion, set_hsion: 8;
    pub hsirdy, _: 10;
    pub pllon, set_pllon: 24;
    pub pllrdy, _: 25;
}

bitfield! {
    /// Clock configuration register
    pub struct Cfgr(u32);
    impl Debug;
    // sw: system clock source request, sws: source acknowledgement,
    // hpre/ppre1/ppre2: AHB and APB prescalers
    pub u8, sw, set_sw: 1, 0;
    pub u8, sws, _: 3, 2;
    pub u8, hpre, set_hpre: 7, 4;
    pub u8, ppre1, set_ppre1: 10, 8;
    pub u8, ppre2, set_ppre2: 13, 11;
}

bitfield! {
    /// PLL configuration register
    pub struct Pllcfgr(u32);
    impl Debug;
    // pllm holds the reference divider offset by one, pllr holds
    // `(r / 2) - 1`; plln is the raw multiplier
    pub u8, pllsrc, set_pllsrc: 1, 0;
    pub u8, pllm, set_pllm: 7, 4;
    pub u8, plln, set_plln: 14, 8;
    pub pllren, set_pllren: 24;
    pub u8, pllr, set_pllr: 26, 25;
}

bitfield! {
    /// Peripheral independent clock configuration register
    pub struct Ccipr(u32);
    impl Debug;
    // fdcansel: CAN kernel clock source
    pub u8, fdcansel, set_fdcansel: 25, 24;
}

/// The clock control registers this driver reaches
#[repr(C)]
struct RegisterBlock {
    cr: VolatileCell<u32>,      // 0x00
    _reserved0: [u32; 1],       // 0x04 ICSCR
    cfgr: VolatileCell<u32>,    // 0x08
    pllcfgr: VolatileCell<u32>, // 0x0c
    _reserved1: [u32; 30],      // 0x10..0x88
    ccipr: VolatileCell<u32>,   // 0x88
}

/// Errors that may occur while programming the clock tree
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Internal oscillator never reported ready
    OscillatorNotReady,
    /// PLL never locked, or never released its lock for reprogramming
    PllNotReady,
    /// System clock mux did not acknowledge the requested source
    SysclkSwitchFailed,
}

/// Owned handle to the clock control block identified by `Id`
pub struct Rcc<Id> {
    _markers: PhantomData<Id>,
}

impl<Id: RccId> Rcc<Id> {
    /// Take the register block.
    ///
    /// # Safety
    /// Only a single instance per `Id` may exist at any time. The
    /// constructed value assumes exclusive ownership of the block and of
    /// the clock tree it controls; no other code may program either while
    /// the handle lives.
    pub unsafe fn new() -> Self {
        Self {
            _markers: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `Id::ADDRESS` is valid per the `RccId` contract and the
        // block is exclusively owned per `Self::new`'s contract.
        unsafe { &*(Id::ADDRESS as *const RegisterBlock) }
    }
}

fn pll_register(config: &PllConfig) -> Pllcfgr {
    let mut pllcfgr = Pllcfgr(0);
    pllcfgr.set_pllsrc(PLLSRC_HSI16);
    pllcfgr.set_pllm(config.m - 1);
    pllcfgr.set_plln(config.n);
    pllcfgr.set_pllren(true);
    pllcfgr.set_pllr(config.r / 2 - 1);
    pllcfgr
}

fn wait(mut done: impl FnMut() -> bool, error: Error) -> Result<(), Error> {
    for _ in 0..READY_SPINS {
        if done() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(error)
}

impl<Id: RccId> ClockTree for Rcc<Id> {
    type Error = Error;

    fn reference_clock(&self) -> HertzU32 {
        HSI16
    }

    fn select_sysclk(&mut self, source: SysclkSource) -> Result<(), Error> {
        let regs = self.regs();
        match source {
            SysclkSource::Internal => {
                let mut cr = Cr(regs.cr.get());
                cr.set_hsion(true);
                regs.cr.set(cr.0);
                wait(|| Cr(regs.cr.get()).hsirdy(), Error::OscillatorNotReady)?;

                let mut cfgr = Cfgr(regs.cfgr.get());
                cfgr.set_sw(SW_HSI16);
                regs.cfgr.set(cfgr.0);
                wait(
                    || Cfgr(regs.cfgr.get()).sws() == SW_HSI16,
                    Error::SysclkSwitchFailed,
                )
            }
            SysclkSource::Pll => {
                // Prescalers go in with the switch so the peripheral
                // buses never see more than half the core clock.
                let mut cfgr = Cfgr(regs.cfgr.get());
                cfgr.set_hpre(HPRE_DIV1);
                cfgr.set_ppre1(PPRE_DIV2);
                cfgr.set_ppre2(PPRE_DIV2);
                cfgr.set_sw(SW_PLL);
                regs.cfgr.set(cfgr.0);
                wait(
                    || Cfgr(regs.cfgr.get()).sws() == SW_PLL,
                    Error::SysclkSwitchFailed,
                )
            }
        }
    }

    fn apply_pll(&mut self, config: &PllConfig) -> Result<(), Error> {
        let regs = self.regs();

        // The divider chain only accepts writes while the PLL is stopped.
        let mut cr = Cr(regs.cr.get());
        cr.set_pllon(false);
        regs.cr.set(cr.0);
        wait(|| !Cr(regs.cr.get()).pllrdy(), Error::PllNotReady)?;

        regs.pllcfgr.set(pll_register(config).0);

        let mut cr = Cr(regs.cr.get());
        cr.set_pllon(true);
        regs.cr.set(cr.0);
        wait(|| Cr(regs.cr.get()).pllrdy(), Error::PllNotReady)
    }

    fn select_can_clock(&mut self, source: CanClockSource) -> Result<(), Error> {
        let regs = self.regs();
        let encoding = match source {
            CanClockSource::External => FDCANSEL_EXTERNAL,
            CanClockSource::Pll => FDCANSEL_PLL,
            CanClockSource::PeripheralBus => FDCANSEL_PCLK,
        };
        let mut ccipr = Ccipr(regs.ccipr.get());
        ccipr.set_fdcansel(encoding);
        regs.ccipr.set(ccipr.0);
        Ok(())
    }
}

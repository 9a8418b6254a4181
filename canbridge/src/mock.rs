//! Test doubles shared by the unit tests

use canbridge_core::{
    CanClockSource, ClockTree, Monotonic, PllConfig, SettingsStore, SysclkSource, Transport,
};
use core::cell::{Cell, RefCell};
use fugit::HertzU32;

/// One recorded clock tree operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    Sysclk(SysclkSource),
    Pll(PllConfig),
    CanClock(CanClockSource),
}

/// Order-preserving log of the operations performed on a [`Tree`].
pub struct TreeLog {
    ops: RefCell<[Option<Op>; 16]>,
    len: Cell<usize>,
}

impl TreeLog {
    pub fn new() -> Self {
        Self {
            ops: RefCell::new([None; 16]),
            len: Cell::new(0),
        }
    }

    fn push(&self, op: Op) -> usize {
        let index = self.len.get();
        self.ops.borrow_mut()[index] = Some(op);
        self.len.set(index + 1);
        index
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn op(&self, index: usize) -> Option<Op> {
        self.ops.borrow()[index]
    }

    pub fn last_pll(&self) -> Option<PllConfig> {
        (0..self.len()).rev().find_map(|index| match self.op(index) {
            Some(Op::Pll(config)) => Some(config),
            _ => None,
        })
    }

    pub fn pll_count(&self) -> usize {
        (0..self.len())
            .filter(|&index| matches!(self.op(index), Some(Op::Pll(_))))
            .count()
    }
}

/// Error injected by [`Tree::failing_at`].
#[derive(Debug, PartialEq, Eq)]
pub struct Fault;

/// Recording [`ClockTree`] double with optional fault injection.
pub struct Tree<'a> {
    log: &'a TreeLog,
    reference: HertzU32,
    fail_at: Option<usize>,
}

impl<'a> Tree<'a> {
    pub fn new(log: &'a TreeLog) -> Self {
        Self::with_reference(log, HertzU32::from_raw(16_000_000))
    }

    pub fn with_reference(log: &'a TreeLog, reference: HertzU32) -> Self {
        Self {
            log,
            reference,
            fail_at: None,
        }
    }

    /// Fails the operation with the given global index, counting every
    /// operation performed through this tree.
    pub fn failing_at(log: &'a TreeLog, op_index: usize) -> Self {
        Self {
            fail_at: Some(op_index),
            ..Self::new(log)
        }
    }

    fn record(&self, op: Op) -> Result<(), Fault> {
        let index = self.log.push(op);
        if self.fail_at == Some(index) {
            Err(Fault)
        } else {
            Ok(())
        }
    }
}

impl ClockTree for Tree<'_> {
    type Error = Fault;

    fn reference_clock(&self) -> HertzU32 {
        self.reference
    }

    fn select_sysclk(&mut self, source: SysclkSource) -> Result<(), Fault> {
        self.record(Op::Sysclk(source))
    }

    fn apply_pll(&mut self, config: &PllConfig) -> Result<(), Fault> {
        self.record(Op::Pll(*config))
    }

    fn select_can_clock(&mut self, source: CanClockSource) -> Result<(), Fault> {
        self.record(Op::CanClock(source))
    }
}

/// Manually advanced millisecond timer.
pub struct Timer {
    now: Cell<u32>,
}

impl Timer {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(ms: u32) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Monotonic for Timer {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

/// Which scheduler phase an adapter was called from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Fast,
    Housekeeping,
}

/// Order-preserving log of adapter calls across a set of [`Adapter`]s.
pub struct SeqLog {
    entries: RefCell<[Option<(u8, Phase)>; 64]>,
    len: Cell<usize>,
}

impl SeqLog {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new([None; 64]),
            len: Cell::new(0),
        }
    }

    fn push(&self, id: u8, phase: Phase) {
        let index = self.len.get();
        if index < 64 {
            self.entries.borrow_mut()[index] = Some((id, phase));
            self.len.set(index + 1);
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn entry(&self, index: usize) -> Option<(u8, Phase)> {
        self.entries.borrow()[index]
    }
}

/// Counting [`Transport`] double; each poll burns `cost_ms` of timer time.
pub struct Adapter<'a> {
    id: u8,
    timer: &'a Timer,
    cost_ms: u32,
    seq: Option<&'a SeqLog>,
    pub started: Cell<u32>,
    pub polls: Cell<u32>,
    pub housekeeping: Cell<u32>,
}

impl<'a> Adapter<'a> {
    pub fn new(id: u8, timer: &'a Timer, cost_ms: u32) -> Self {
        Self {
            id,
            timer,
            cost_ms,
            seq: None,
            started: Cell::new(0),
            polls: Cell::new(0),
            housekeeping: Cell::new(0),
        }
    }

    pub fn with_seq(id: u8, timer: &'a Timer, cost_ms: u32, seq: &'a SeqLog) -> Self {
        Self {
            seq: Some(seq),
            ..Self::new(id, timer, cost_ms)
        }
    }
}

impl Transport for Adapter<'_> {
    fn start(&mut self) {
        self.started.set(self.started.get() + 1);
    }

    fn poll(&mut self) {
        self.polls.set(self.polls.get() + 1);
        self.timer.advance(self.cost_ms);
        if let Some(seq) = self.seq {
            seq.push(self.id, Phase::Fast);
        }
    }

    fn poll_10ms(&mut self) {
        self.housekeeping.set(self.housekeeping.get() + 1);
        if let Some(seq) = self.seq {
            seq.push(self.id, Phase::Housekeeping);
        }
    }
}

/// Fixed-record [`SettingsStore`] double.
pub struct Store {
    pub records: &'static [(&'static str, i32)],
}

impl SettingsStore for Store {
    fn load(&mut self, sink: &mut dyn FnMut(&str, i32)) {
        for (key, value) in self.records {
            sink(key, *value);
        }
    }
}

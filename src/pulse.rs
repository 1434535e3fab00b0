//! One-shot pulse train on a single output, started by an edge.
//!
//! The pattern is played one level per tick, least significant bit first.
//! The trigger edge restarts the tick source so the first level lasts a full
//! tick; the last level is also held for a full tick before the output
//! returns to its idle level.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::error::ConfigError;
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::{InterruptGate, SharedCounter, SharedFlag, with_masked};
use crate::ticker::TickSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePattern {
    bits: u32,
    len: u8,
}

impl PulsePattern {
    pub const fn new(bits: u32, len: u8) -> Result<Self, ConfigError> {
        if len == 0 || len > 32 {
            return Err(ConfigError::InvalidPattern { len });
        }
        Ok(Self { bits, len })
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Level of step `index`; `true` is high.
    pub fn level(&self, index: u8) -> bool {
        index < self.len && self.bits & (1 << index) != 0
    }
}

/// 0-0-0-0-1-0-1-0-1-0-1-0-0-0-0
pub const BURST_OF_FOUR: PulsePattern = PulsePattern {
    bits: (1 << 4) | (1 << 6) | (1 << 8) | (1 << 10),
    len: 15,
};

pub struct PulseShared {
    active: SharedFlag,
    /// Index of the level the next tick drives.
    next: SharedCounter,
    trains: SharedCounter,
    aborts: SharedCounter,
}

impl PulseShared {
    pub const fn new() -> Self {
        Self {
            active: SharedFlag::new(false),
            next: SharedCounter::new(0),
            trains: SharedCounter::new(0),
            aborts: SharedCounter::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn trains(&self) -> u32 {
        self.trains.get()
    }

    pub fn aborts(&self) -> u32 {
        self.aborts.get()
    }
}

impl Default for PulseShared {
    fn default() -> Self {
        Self::new()
    }
}

/// The pulse pin and its idle level.
pub struct PulseOutput<P: Port> {
    out: Output<P>,
    idle_high: bool,
}

impl<P: Port> PulseOutput<P> {
    pub fn new(out: Output<P>, idle_high: bool) -> Self {
        Self { out, idle_high }
    }

    pub fn drive(&mut self, high: bool) {
        if high {
            self.out.set_all();
        } else {
            self.out.clear_all();
        }
    }

    pub fn idle(&mut self) {
        self.drive(self.idle_high);
    }
}

/// Runs every tick; plays the next level while a train is active.
///
/// `gate` masks the trigger line, so a start or abort can't land between
/// reading the step index and driving the pin.
pub struct PulseTrain<'a, P: Port, G: InterruptGate> {
    out: PulseOutput<P>,
    pattern: PulsePattern,
    shared: &'a PulseShared,
    gate: G,
}

impl<'a, P: Port, G: InterruptGate> PulseTrain<'a, P, G> {
    pub fn new(out: PulseOutput<P>, pattern: PulsePattern, shared: &'a PulseShared, gate: G) -> Self {
        Self {
            out,
            pattern,
            shared,
            gate,
        }
    }
}

impl<P: Port, G: InterruptGate> TaskBody for PulseTrain<'_, P, G> {
    fn run(&mut self) {
        let pattern = self.pattern;
        let shared = self.shared;
        let out = &mut self.out;

        with_masked(&self.gate, || {
            if !shared.active.get() {
                return;
            }

            let index = shared.next.get();
            if index < pattern.len() as u32 {
                out.drive(pattern.level(index as u8));
                shared.next.store(index + 1);
            } else {
                out.idle();
                shared.active.set(false);
            }
        });
    }
}

/// Edge body: start a train when idle, abort the running one otherwise.
pub struct PulseTrigger<'a, P: Port, S: TickSource> {
    out: PulseOutput<P>,
    pattern: PulsePattern,
    shared: &'a PulseShared,
    source: S,
}

impl<'a, P: Port, S: TickSource> PulseTrigger<'a, P, S> {
    pub fn new(out: PulseOutput<P>, pattern: PulsePattern, shared: &'a PulseShared, source: S) -> Self {
        Self {
            out,
            pattern,
            shared,
            source,
        }
    }
}

impl<P: Port, S: TickSource> EdgeHandler for PulseTrigger<'_, P, S> {
    fn on_edge(&mut self, _line: EdgeLine) {
        // `active` is written last on start and first on abort, so a tick
        // landing in between sees either the old train or no train
        if self.shared.active.get() {
            self.shared.active.set(false);
            self.out.idle();
            self.shared.aborts.increment();
            return;
        }

        self.source.restart();
        self.out.drive(self.pattern.level(0));
        self.shared.next.store(1);
        self.shared.trains.increment();
        self.shared.active.set(true);
    }
}

//! Fixed output-pattern tables and the cursor that walks them.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::error::ConfigError;
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::SharedFlag;

/// Common-cathode 7-segment codes for 0-F, segment a in bit 0.
pub const HEX_DIGITS: [u32; 16] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F, 0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71,
];

pub const ONE_HOT_4: [u32; 4] = [0x1, 0x2, 0x4, 0x8];

pub const ONE_HOT_8: [u32; 8] = [0x1, 0x2, 0x4, 0x8, 0x10, 0x20, 0x40, 0x80];

/// A read-only table and a cursor into it. The cursor is kept reduced modulo
/// the table length, so it never wraps into a different phase.
pub struct Sequence<T: 'static> {
    table: &'static [T],
    cursor: usize,
}

impl<T: Copy + 'static> Sequence<T> {
    pub fn new(table: &'static [T]) -> Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        Ok(Self { table, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> T {
        self.table[self.cursor]
    }

    /// Entry shown for an unreduced cursor value.
    pub fn at(&self, cursor: u32) -> T {
        self.table[cursor as usize % self.table.len()]
    }

    pub fn advance(&mut self) -> T {
        self.cursor = (self.cursor + 1) % self.table.len();
        self.current()
    }

    pub fn retreat(&mut self) -> T {
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.table.len() - 1);
        self.current()
    }
}

/// Periodic body: step to the next pattern of a table.
///
/// The old pattern is cleared before the new one is set. When built with
/// [`SequenceAdvance::paused_by`], firings while the flag is low do nothing.
pub struct SequenceAdvance<'a, P: Port> {
    out: Output<P>,
    seq: Sequence<u32>,
    run: Option<&'a SharedFlag>,
}

impl<'a, P: Port> SequenceAdvance<'a, P> {
    pub fn new(out: Output<P>, seq: Sequence<u32>) -> Self {
        Self { out, seq, run: None }
    }

    pub fn paused_by(mut self, run: &'a SharedFlag) -> Self {
        self.run = Some(run);
        self
    }

    /// Light the pattern under the cursor; used once at startup.
    pub fn show_current(&mut self) {
        let pattern = self.seq.current();
        self.out.show(pattern);
    }

    pub fn cursor(&self) -> usize {
        self.seq.cursor()
    }
}

impl<P: Port> TaskBody for SequenceAdvance<'_, P> {
    fn run(&mut self) {
        if let Some(run) = self.run {
            if !run.get() {
                return;
            }
        }

        self.out.clear(self.seq.current());
        let next = self.seq.advance();
        self.out.set(next);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Backward,
}

/// Edge body: each qualifying edge moves the display one entry.
pub struct StepOnEdge<P: Port> {
    out: Output<P>,
    seq: Sequence<u32>,
    step: Step,
}

impl<P: Port> StepOnEdge<P> {
    pub fn new(out: Output<P>, seq: Sequence<u32>, step: Step) -> Self {
        Self { out, seq, step }
    }

    pub fn show_current(&mut self) {
        let pattern = self.seq.current();
        self.out.show(pattern);
    }
}

impl<P: Port> EdgeHandler for StepOnEdge<P> {
    fn on_edge(&mut self, _line: EdgeLine) {
        let next = match self.step {
            Step::Forward => self.seq.advance(),
            Step::Backward => self.seq.retreat(),
        };
        self.out.show(next);
    }
}

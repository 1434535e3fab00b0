//! Host doubles for the hardware collaborators.

use std::sync::Mutex;
use std::vec::Vec;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::edge::{EdgeController, EdgeLine, Trigger};
use crate::pin_edge::{PinController, PinLine};
use crate::port::Port;
use crate::shared::InterruptGate;
use crate::ticker::TickSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    Set(u32),
    Clear(u32),
}

pub struct MockPort {
    id: u8,
    level: AtomicU32,
    ops: Mutex<Vec<PortOp>>,
}

impl MockPort {
    pub fn new(id: u8) -> Self {
        Self::with_level(id, 0)
    }

    pub fn with_level(id: u8, level: u32) -> Self {
        Self {
            id,
            level: AtomicU32::new(level),
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn level(&self) -> u32 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn ops(&self) -> Vec<PortOp> {
        self.ops.lock().unwrap().clone()
    }
}

impl Port for MockPort {
    fn id(&self) -> u8 {
        self.id
    }

    fn read(&self) -> u32 {
        self.level()
    }

    fn set(&self, mask: u32) {
        self.level.fetch_or(mask, Ordering::Relaxed);
        self.ops.lock().unwrap().push(PortOp::Set(mask));
    }

    fn clear(&self, mask: u32) {
        self.level.fetch_and(!mask, Ordering::Relaxed);
        self.ops.lock().unwrap().push(PortOp::Clear(mask));
    }
}

#[derive(Default)]
pub struct MockTickSource {
    pub restarts: AtomicU32,
    pub pending: AtomicBool,
}

impl TickSource for &MockTickSource {
    fn restart(&mut self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    fn tick_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct MockGate {
    masked: AtomicBool,
    pub sections: AtomicU32,
}

impl MockGate {
    pub fn is_masked(&self) -> bool {
        self.masked.load(Ordering::Relaxed)
    }
}

impl InterruptGate for MockGate {
    fn mask(&self) -> bool {
        self.sections.fetch_add(1, Ordering::Relaxed);
        self.masked.swap(true, Ordering::Relaxed)
    }

    fn unmask(&self) {
        self.masked.store(false, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    Configure(EdgeLine, Trigger),
    Clear(EdgeLine),
    Enable(EdgeLine, u8),
    Disable(EdgeLine),
}

#[derive(Default)]
pub struct MockEdgeController {
    pending: u8,
    pub ops: Vec<LineOp>,
}

impl MockEdgeController {
    pub fn raise(&mut self, line: EdgeLine) {
        self.pending |= line.mask();
    }
}

impl EdgeController for MockEdgeController {
    fn configure(&mut self, line: EdgeLine, trigger: Trigger) {
        self.ops.push(LineOp::Configure(line, trigger));
    }

    fn clear_pending(&mut self, line: EdgeLine) {
        self.pending &= !line.mask();
        self.ops.push(LineOp::Clear(line));
    }

    fn is_pending(&self, line: EdgeLine) -> bool {
        self.pending & line.mask() != 0
    }

    fn enable(&mut self, line: EdgeLine, priority: u8) {
        self.ops.push(LineOp::Enable(line, priority));
    }

    fn disable(&mut self, line: EdgeLine) {
        self.ops.push(LineOp::Disable(line));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOp {
    Enable(PinLine, Trigger),
    Disable(PinLine),
    Clear(PinLine),
}

/// Pending status per pin, whichever edge it was enabled for.
#[derive(Default)]
pub struct MockPinController {
    pending: Vec<PinLine>,
    pub ops: Vec<PinOp>,
}

impl MockPinController {
    pub fn raise(&mut self, line: PinLine) {
        if !self.pending.contains(&line) {
            self.pending.push(line);
        }
    }
}

impl PinController for MockPinController {
    fn enable(&mut self, line: PinLine, trigger: Trigger) {
        self.ops.push(PinOp::Enable(line, trigger));
    }

    fn disable(&mut self, line: PinLine) {
        self.ops.push(PinOp::Disable(line));
    }

    fn is_pending(&self, line: PinLine, _trigger: Trigger) -> bool {
        self.pending.contains(&line)
    }

    fn clear_pending(&mut self, line: PinLine) {
        self.pending.retain(|&p| p != line);
        self.ops.push(PinOp::Clear(line));
    }
}

//! Small task and edge bodies shared by several programs.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::{InterruptGate, SharedCounter, SharedFlag, with_masked};

/// Invert the owned bits each time it runs.
pub struct Toggle<P: Port> {
    out: Output<P>,
}

impl<P: Port> Toggle<P> {
    pub fn new(out: Output<P>) -> Self {
        Self { out }
    }

    pub fn level(&self) -> u32 {
        self.out.level()
    }
}

impl<P: Port> TaskBody for Toggle<P> {
    fn run(&mut self) {
        self.out.toggle();
    }
}

impl<P: Port> EdgeHandler for Toggle<P> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.out.toggle();
    }
}

/// Edge body that flips a run/pause flag.
pub struct ToggleFlag<'a> {
    flag: &'a SharedFlag,
}

impl<'a> ToggleFlag<'a> {
    pub fn new(flag: &'a SharedFlag) -> Self {
        Self { flag }
    }
}

impl EdgeHandler for ToggleFlag<'_> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.flag.toggle();
    }
}

/// Edge body: bump a shared counter and show it in binary.
///
/// Must not be preempted by the task that resets the counter, so its line is
/// given a more urgent priority than the tick.
pub struct CountOnEdge<'a, P: Port> {
    count: &'a SharedCounter,
    out: Output<P>,
}

impl<'a, P: Port> CountOnEdge<'a, P> {
    pub fn new(count: &'a SharedCounter, out: Output<P>) -> Self {
        Self { count, out }
    }
}

impl<P: Port> EdgeHandler for CountOnEdge<'_, P> {
    fn on_edge(&mut self, _line: EdgeLine) {
        let value = self.count.increment();
        self.out.show(value);
    }
}

/// Periodic body: zero a shared counter and blank its display.
///
/// The counting edge line is masked for the duration, so an edge can't land
/// between the reset and the display update.
pub struct AutoReset<'a, P: Port, G: InterruptGate> {
    count: &'a SharedCounter,
    out: Output<P>,
    gate: G,
}

impl<'a, P: Port, G: InterruptGate> AutoReset<'a, P, G> {
    pub fn new(count: &'a SharedCounter, out: Output<P>, gate: G) -> Self {
        Self { count, out, gate }
    }
}

impl<P: Port, G: InterruptGate> TaskBody for AutoReset<'_, P, G> {
    fn run(&mut self) {
        with_masked(&self.gate, || {
            self.count.reset();
            self.out.clear_all();
        });
    }
}

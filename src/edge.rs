//! External interrupt lines and the table that routes them to handlers.

use heapless::Vec;
use portable_atomic::{AtomicU8, Ordering};

use crate::config::EDGE_LINES;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLine {
    Eint0,
    Eint1,
    Eint2,
    Eint3,
}

impl EdgeLine {
    pub const ALL: [EdgeLine; EDGE_LINES] = [
        EdgeLine::Eint0,
        EdgeLine::Eint1,
        EdgeLine::Eint2,
        EdgeLine::Eint3,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Sensitivity and active polarity of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RisingEdge,
    FallingEdge,
    LowLevel,
    HighLevel,
}

impl Trigger {
    pub fn is_level(self) -> bool {
        matches!(self, Trigger::LowLevel | Trigger::HighLevel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeConfig {
    pub line: EdgeLine,
    pub trigger: Trigger,
    /// NVIC priority, lower is more urgent. Unique per dispatcher.
    pub priority: u8,
}

/// The external interrupt hardware.
pub trait EdgeController {
    fn configure(&mut self, line: EdgeLine, trigger: Trigger);
    fn clear_pending(&mut self, line: EdgeLine);
    fn is_pending(&self, line: EdgeLine) -> bool;
    fn enable(&mut self, line: EdgeLine, priority: u8);
    fn disable(&mut self, line: EdgeLine);
}

/// What runs when a line fires. Handlers run in interrupt context and must
/// not block.
pub trait EdgeHandler {
    fn on_edge(&mut self, line: EdgeLine);
}

impl<F: FnMut(EdgeLine)> EdgeHandler for F {
    fn on_edge(&mut self, line: EdgeLine) {
        self(line)
    }
}

struct EdgeSlot<'a> {
    config: EdgeConfig,
    enabled: bool,
    armed: bool,
    handler: &'a mut (dyn EdgeHandler + Send),
}

pub struct EdgeDispatcher<'a, C: EdgeController, const N: usize> {
    controller: C,
    slots: Vec<EdgeSlot<'a>, N>,
    spurious: u32,
}

impl<'a, C: EdgeController, const N: usize> EdgeDispatcher<'a, C, N> {
    pub const fn new(controller: C) -> Self {
        Self {
            controller,
            slots: Vec::new(),
            spurious: 0,
        }
    }

    /// Bind `handler` to a line: set its trigger, drop any stale request and
    /// enable it at its priority.
    pub fn register(
        &mut self,
        config: EdgeConfig,
        handler: &'a mut (dyn EdgeHandler + Send),
    ) -> Result<(), ConfigError> {
        for slot in self.slots.iter() {
            if slot.config.line == config.line {
                return Err(ConfigError::DuplicateLine(config.line));
            }
            if slot.config.priority == config.priority {
                return Err(ConfigError::PriorityClash {
                    line: config.line,
                    other: slot.config.line,
                    priority: config.priority,
                });
            }
        }

        self.slots
            .push(EdgeSlot {
                config,
                enabled: true,
                armed: true,
                handler,
            })
            .map_err(|_| ConfigError::EdgeTableFull)?;

        self.controller.configure(config.line, config.trigger);
        self.controller.clear_pending(config.line);
        self.controller.enable(config.line, config.priority);

        Ok(())
    }

    /// Service one interrupt request for `line`.
    ///
    /// The pending flag is cleared before the handler runs, so an edge that
    /// arrives during the handler raises a fresh request instead of being
    /// lost. Level-triggered lines are disarmed after firing and stay quiet
    /// until [`EdgeDispatcher::rearm`].
    pub fn dispatch(&mut self, line: EdgeLine) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.config.line == line) else {
            self.controller.clear_pending(line);
            self.spurious = self.spurious.wrapping_add(1);
            return false;
        };

        if !self.controller.is_pending(line) || !slot.enabled || !slot.armed {
            self.spurious = self.spurious.wrapping_add(1);
            return false;
        }

        self.controller.clear_pending(line);
        slot.handler.on_edge(line);

        if slot.config.trigger.is_level() {
            slot.armed = false;
            self.controller.disable(line);
        }

        true
    }

    /// Enable or disable a registered line at runtime.
    pub fn set_enabled(&mut self, line: EdgeLine, enabled: bool) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.config.line == line) else {
            return false;
        };

        slot.enabled = enabled;
        if enabled && slot.armed {
            self.controller.clear_pending(line);
            self.controller.enable(line, slot.config.priority);
        } else {
            self.controller.disable(line);
        }
        true
    }

    /// Re-arm a level-triggered line once its level has been released.
    pub fn rearm(&mut self, line: EdgeLine) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.config.line == line) else {
            return false;
        };

        if !slot.armed {
            slot.armed = true;
            if slot.enabled {
                self.controller.clear_pending(line);
                self.controller.enable(line, slot.config.priority);
            }
        }
        true
    }

    pub fn is_armed(&self, line: EdgeLine) -> bool {
        self.slots
            .iter()
            .any(|s| s.config.line == line && s.armed && s.enabled)
    }

    /// Requests that had no handler to run.
    pub fn spurious(&self) -> u32 {
        self.spurious
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }
}

/// One pending bit per line, handed from interrupt context to the idle loop.
///
/// Posting an already pending line is a no-op: edges are events, not a queue.
pub struct EdgeLatch(AtomicU8);

impl EdgeLatch {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn post(&self, line: EdgeLine) {
        self.0.fetch_or(line.mask(), Ordering::Release);
    }

    pub fn is_pending(&self, line: EdgeLine) -> bool {
        self.0.load(Ordering::Acquire) & line.mask() != 0
    }

    pub fn take(&self, line: EdgeLine) -> bool {
        self.0.fetch_and(!line.mask(), Ordering::AcqRel) & line.mask() != 0
    }

    /// Take the lowest-numbered pending line.
    pub fn take_any(&self) -> Option<EdgeLine> {
        EdgeLine::ALL.into_iter().find(|&line| self.take(line))
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedCounter;
    use crate::testing::{LineOp, MockEdgeController};

    fn config(line: EdgeLine, trigger: Trigger, priority: u8) -> EdgeConfig {
        EdgeConfig {
            line,
            trigger,
            priority,
        }
    }

    #[test]
    fn register_configures_clears_and_enables() {
        let mut handler = |_line: EdgeLine| {};
        let mut edges: EdgeDispatcher<'_, _, 2> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(config(EdgeLine::Eint0, Trigger::RisingEdge, 1), &mut handler)
            .unwrap();

        assert_eq!(
            edges.controller().ops,
            [
                LineOp::Configure(EdgeLine::Eint0, Trigger::RisingEdge),
                LineOp::Clear(EdgeLine::Eint0),
                LineOp::Enable(EdgeLine::Eint0, 1),
            ]
        );
    }

    #[test]
    fn duplicate_lines_and_priorities_are_rejected() {
        let mut a = |_line: EdgeLine| {};
        let mut b = |_line: EdgeLine| {};
        let mut c = |_line: EdgeLine| {};
        let mut edges: EdgeDispatcher<'_, _, 4> = EdgeDispatcher::new(MockEdgeController::default());

        edges
            .register(config(EdgeLine::Eint1, Trigger::FallingEdge, 0), &mut a)
            .unwrap();
        assert_eq!(
            edges.register(config(EdgeLine::Eint1, Trigger::FallingEdge, 2), &mut b),
            Err(ConfigError::DuplicateLine(EdgeLine::Eint1))
        );
        assert_eq!(
            edges.register(config(EdgeLine::Eint3, Trigger::FallingEdge, 0), &mut c),
            Err(ConfigError::PriorityClash {
                line: EdgeLine::Eint3,
                other: EdgeLine::Eint1,
                priority: 0
            })
        );
    }

    #[test]
    fn table_full_is_reported() {
        let mut a = |_line: EdgeLine| {};
        let mut b = |_line: EdgeLine| {};
        let mut edges: EdgeDispatcher<'_, _, 1> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(config(EdgeLine::Eint0, Trigger::RisingEdge, 0), &mut a)
            .unwrap();
        assert_eq!(
            edges.register(config(EdgeLine::Eint2, Trigger::RisingEdge, 1), &mut b),
            Err(ConfigError::EdgeTableFull)
        );
    }

    #[test]
    fn dispatch_runs_handler_once_per_request() {
        let hits = SharedCounter::new(0);
        let mut handler = |_line: EdgeLine| {
            hits.increment();
        };
        let mut edges: EdgeDispatcher<'_, _, 1> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(config(EdgeLine::Eint0, Trigger::FallingEdge, 0), &mut handler)
            .unwrap();

        // two edges before service collapse into one request
        edges.controller_mut().raise(EdgeLine::Eint0);
        edges.controller_mut().raise(EdgeLine::Eint0);
        assert!(edges.dispatch(EdgeLine::Eint0));
        assert!(!edges.controller().is_pending(EdgeLine::Eint0));

        // re-entry with nothing pending is spurious
        assert!(!edges.dispatch(EdgeLine::Eint0));
        assert!(!edges.dispatch(EdgeLine::Eint2));

        assert_eq!(hits.get(), 1);
        assert_eq!(edges.spurious(), 2);
    }

    #[test]
    fn disabled_line_is_ignored_until_enabled() {
        let hits = SharedCounter::new(0);
        let mut handler = |_line: EdgeLine| {
            hits.increment();
        };
        let mut edges: EdgeDispatcher<'_, _, 1> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(config(EdgeLine::Eint2, Trigger::RisingEdge, 0), &mut handler)
            .unwrap();

        assert!(edges.set_enabled(EdgeLine::Eint2, false));
        edges.controller_mut().raise(EdgeLine::Eint2);
        assert!(!edges.dispatch(EdgeLine::Eint2));

        edges.set_enabled(EdgeLine::Eint2, true);
        edges.controller_mut().raise(EdgeLine::Eint2);
        assert!(edges.dispatch(EdgeLine::Eint2));
        assert_eq!(hits.get(), 1);
        assert!(!edges.set_enabled(EdgeLine::Eint0, true));
    }

    #[test]
    fn level_line_fires_once_until_rearmed() {
        let hits = SharedCounter::new(0);
        let mut handler = |_line: EdgeLine| {
            hits.increment();
        };
        let mut edges: EdgeDispatcher<'_, _, 1> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(config(EdgeLine::Eint3, Trigger::LowLevel, 0), &mut handler)
            .unwrap();

        // level still asserted: hardware keeps re-raising
        for _ in 0..3 {
            edges.controller_mut().raise(EdgeLine::Eint3);
            edges.dispatch(EdgeLine::Eint3);
        }
        assert_eq!(hits.get(), 1);
        assert!(!edges.is_armed(EdgeLine::Eint3));
        assert_eq!(
            edges.controller().ops.last(),
            Some(&LineOp::Disable(EdgeLine::Eint3))
        );

        edges.rearm(EdgeLine::Eint3);
        edges.controller_mut().raise(EdgeLine::Eint3);
        edges.dispatch(EdgeLine::Eint3);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn latch_collapses_repeated_posts() {
        let latch = EdgeLatch::new();
        latch.post(EdgeLine::Eint2);
        latch.post(EdgeLine::Eint2);
        latch.post(EdgeLine::Eint0);

        assert!(latch.is_pending(EdgeLine::Eint2));
        assert_eq!(latch.take_any(), Some(EdgeLine::Eint0));
        assert_eq!(latch.take_any(), Some(EdgeLine::Eint2));
        assert_eq!(latch.take_any(), None);
        assert!(!latch.take(EdgeLine::Eint1));
    }
}

//! Edge interrupts on single GPIO pins.
//!
//! GPIO pin interrupts have no vector of their own: every enabled pin raises
//! the EINT3 channel. A [`PinDispatcher`] is an [`EdgeHandler`] that gets
//! registered on [`EdgeLine::Eint3`] of an [`EdgeDispatcher`], so the channel
//! takes part in the same priority check as the other lines. On each request
//! it runs the handler of every pin with a pending edge.
//!
//! [`EdgeDispatcher`]: crate::edge::EdgeDispatcher

use heapless::Vec;

use crate::config::PIN_INTERRUPT_PINS;
use crate::edge::{EdgeHandler, EdgeLine, Trigger};
use crate::error::ConfigError;
use crate::port::bit;

/// The channel every pin interrupt arrives on.
pub const PIN_CHANNEL: EdgeLine = EdgeLine::Eint3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLine {
    pub port: u8,
    pub pin: u8,
}

impl PinLine {
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    pub const fn mask(self) -> u32 {
        bit(self.pin)
    }

    /// Whether the part can raise an interrupt from this pin.
    pub fn can_interrupt(self) -> bool {
        self.pin < 32
            && PIN_INTERRUPT_PINS
                .get(self.port as usize)
                .is_some_and(|pins| pins & self.mask() != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEdgeConfig {
    pub line: PinLine,
    /// Rising or falling; pin interrupts have no level mode.
    pub trigger: Trigger,
}

/// The GPIO interrupt enable, status and clear registers.
pub trait PinController {
    fn enable(&mut self, line: PinLine, trigger: Trigger);
    fn disable(&mut self, line: PinLine);
    fn is_pending(&self, line: PinLine, trigger: Trigger) -> bool;
    fn clear_pending(&mut self, line: PinLine);
}

struct PinSlot<'a> {
    config: PinEdgeConfig,
    handler: &'a mut (dyn EdgeHandler + Send),
}

pub struct PinDispatcher<'a, C: PinController, const N: usize> {
    controller: C,
    slots: Vec<PinSlot<'a>, N>,
    spurious: u32,
}

impl<'a, C: PinController, const N: usize> PinDispatcher<'a, C, N> {
    pub const fn new(controller: C) -> Self {
        Self {
            controller,
            slots: Vec::new(),
            spurious: 0,
        }
    }

    /// Bind `handler` to an edge of one pin, drop any stale status and enable
    /// the edge.
    pub fn register(
        &mut self,
        config: PinEdgeConfig,
        handler: &'a mut (dyn EdgeHandler + Send),
    ) -> Result<(), ConfigError> {
        let PinLine { port, pin } = config.line;
        if !config.line.can_interrupt() || config.trigger.is_level() {
            return Err(ConfigError::UnsupportedPinInterrupt { port, pin });
        }
        if self.slots.iter().any(|s| s.config.line == config.line) {
            return Err(ConfigError::DuplicatePin { port, pin });
        }

        self.slots
            .push(PinSlot { config, handler })
            .map_err(|_| ConfigError::EdgeTableFull)?;

        self.controller.clear_pending(config.line);
        self.controller.enable(config.line, config.trigger);

        Ok(())
    }

    /// Service every pin with a pending edge, in registration order. Returns
    /// how many handlers ran.
    ///
    /// Each pin's status is cleared before its handler runs.
    pub fn dispatch(&mut self) -> u32 {
        let mut serviced = 0;
        for slot in self.slots.iter_mut() {
            let line = slot.config.line;
            if self.controller.is_pending(line, slot.config.trigger) {
                self.controller.clear_pending(line);
                slot.handler.on_edge(PIN_CHANNEL);
                serviced += 1;
            }
        }

        if serviced == 0 {
            self.spurious = self.spurious.wrapping_add(1);
        }
        serviced
    }

    /// Stop one pin from interrupting. Returns whether it was registered.
    pub fn disable(&mut self, line: PinLine) -> bool {
        if self.slots.iter().any(|s| s.config.line == line) {
            self.controller.disable(line);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Channel requests that found no pin pending.
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

impl<C: PinController, const N: usize> EdgeHandler for PinDispatcher<'_, C, N> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.dispatch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{EdgeConfig, EdgeDispatcher};
    use crate::shared::SharedCounter;
    use crate::testing::{MockEdgeController, MockPinController, PinOp};

    const BUTTON_A: PinLine = PinLine::new(0, 0);
    const SENSOR: PinLine = PinLine::new(2, 5);

    fn rising(line: PinLine) -> PinEdgeConfig {
        PinEdgeConfig {
            line,
            trigger: Trigger::RisingEdge,
        }
    }

    #[test]
    fn only_edge_capable_pins_register() {
        let rejected = [
            rising(PinLine::new(1, 4)),
            rising(PinLine::new(0, 12)),
            rising(PinLine::new(2, 14)),
            rising(PinLine::new(9, 0)),
            PinEdgeConfig {
                line: BUTTON_A,
                trigger: Trigger::LowLevel,
            },
        ];

        for config in rejected {
            let mut handler = |_line: EdgeLine| {};
            let mut pins: PinDispatcher<'_, _, 4> = PinDispatcher::new(MockPinController::default());
            assert_eq!(
                pins.register(config, &mut handler),
                Err(ConfigError::UnsupportedPinInterrupt {
                    port: config.line.port,
                    pin: config.line.pin
                })
            );
            assert!(pins.is_empty());
            assert!(pins.controller().ops.is_empty());
        }
        assert!(BUTTON_A.can_interrupt() && SENSOR.can_interrupt());
    }

    #[test]
    fn register_clears_then_enables() {
        let mut a = |_line: EdgeLine| {};
        let mut b = |_line: EdgeLine| {};
        let mut pins: PinDispatcher<'_, _, 2> = PinDispatcher::new(MockPinController::default());

        pins.register(rising(BUTTON_A), &mut a).unwrap();
        assert_eq!(
            pins.register(rising(BUTTON_A), &mut b),
            Err(ConfigError::DuplicatePin { port: 0, pin: 0 })
        );
        assert_eq!(
            pins.controller().ops,
            [
                PinOp::Clear(BUTTON_A),
                PinOp::Enable(BUTTON_A, Trigger::RisingEdge)
            ]
        );
    }

    #[test]
    fn table_full_is_reported() {
        let mut a = |_line: EdgeLine| {};
        let mut b = |_line: EdgeLine| {};
        let mut pins: PinDispatcher<'_, _, 1> = PinDispatcher::new(MockPinController::default());
        pins.register(rising(BUTTON_A), &mut a).unwrap();
        assert_eq!(pins.register(rising(SENSOR), &mut b), Err(ConfigError::EdgeTableFull));
    }

    #[test]
    fn every_pending_pin_is_serviced_once() {
        let a_hits = SharedCounter::new(0);
        let b_hits = SharedCounter::new(0);
        let mut a = |line: EdgeLine| {
            assert_eq!(line, PIN_CHANNEL);
            a_hits.increment();
        };
        let mut b = |_line: EdgeLine| {
            b_hits.increment();
        };
        let mut pins: PinDispatcher<'_, _, 2> = PinDispatcher::new(MockPinController::default());
        pins.register(rising(BUTTON_A), &mut a).unwrap();
        pins.register(
            PinEdgeConfig {
                line: SENSOR,
                trigger: Trigger::FallingEdge,
            },
            &mut b,
        )
        .unwrap();

        pins.controller_mut().raise(BUTTON_A);
        pins.controller_mut().raise(SENSOR);
        assert_eq!(pins.dispatch(), 2);
        assert!(!pins.controller().is_pending(BUTTON_A, Trigger::RisingEdge));

        pins.controller_mut().raise(SENSOR);
        assert_eq!(pins.dispatch(), 1);
        assert_eq!(pins.dispatch(), 0);
        // an unregistered pin is never serviced
        pins.controller_mut().raise(PinLine::new(2, 6));
        assert_eq!(pins.dispatch(), 0);

        assert_eq!((a_hits.get(), b_hits.get()), (1, 2));
        assert_eq!(pins.spurious(), 2);
    }

    #[test]
    fn disabled_pin_is_masked_in_hardware() {
        let mut a = |_line: EdgeLine| {};
        let mut pins: PinDispatcher<'_, _, 1> = PinDispatcher::new(MockPinController::default());
        pins.register(rising(BUTTON_A), &mut a).unwrap();

        assert!(pins.disable(BUTTON_A));
        assert!(!pins.disable(SENSOR));
        assert_eq!(pins.controller().ops.last(), Some(&PinOp::Disable(BUTTON_A)));
    }

    #[test]
    fn pin_channel_shares_the_edge_priority_check() {
        let hits = SharedCounter::new(0);
        let mut on_a = |_line: EdgeLine| {
            hits.increment();
        };
        let mut on_b = |_line: EdgeLine| {};
        let mut pins: PinDispatcher<'_, _, 1> = PinDispatcher::new(MockPinController::default());
        pins.register(rising(BUTTON_A), &mut on_a).unwrap();

        let mut edges: EdgeDispatcher<'_, _, 2> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(
                EdgeConfig {
                    line: EdgeLine::Eint1,
                    trigger: Trigger::FallingEdge,
                    priority: 0,
                },
                &mut on_b,
            )
            .unwrap();
        assert_eq!(
            edges.register(
                EdgeConfig {
                    line: PIN_CHANNEL,
                    trigger: Trigger::RisingEdge,
                    priority: 0,
                },
                &mut pins,
            ),
            Err(ConfigError::PriorityClash {
                line: EdgeLine::Eint3,
                other: EdgeLine::Eint1,
                priority: 0
            })
        );
    }

    #[test]
    fn pin_edges_arrive_through_the_channel() {
        let hits = SharedCounter::new(0);
        let mut on_a = |_line: EdgeLine| {
            hits.increment();
        };
        let mut pins: PinDispatcher<'_, _, 1> = PinDispatcher::new(MockPinController::default());
        pins.register(rising(BUTTON_A), &mut on_a).unwrap();
        pins.controller_mut().raise(BUTTON_A);

        let mut edges: EdgeDispatcher<'_, _, 1> = EdgeDispatcher::new(MockEdgeController::default());
        edges
            .register(
                EdgeConfig {
                    line: PIN_CHANNEL,
                    trigger: Trigger::RisingEdge,
                    priority: 1,
                },
                &mut pins,
            )
            .unwrap();

        edges.controller_mut().raise(PIN_CHANNEL);
        assert!(edges.dispatch(PIN_CHANNEL));
        assert_eq!(hits.get(), 1);
    }
}

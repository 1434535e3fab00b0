//! Traffic light with a pedestrian request button.
//!
//! A periodic task walks a fixed table of (car, pedestrian) light pairs, one
//! step per firing. The pedestrian request jumps straight to the step that
//! precedes the crossing phase (car amber, pedestrian red), restarts the tick
//! and the step timing, and resumes the cycle from the first step.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::error::ConfigError;
use crate::port::{Output, Port, bits};
use crate::scheduler::TaskBody;
use crate::shared::{InterruptGate, SharedCounter, SharedFlag, with_masked};
use crate::ticker::{TickDuration, TickSource};

pub const CAR_GREEN: u32 = 0x01;
pub const CAR_AMBER: u32 = 0x02;
pub const CAR_RED: u32 = 0x04;
pub const PED_GREEN: u32 = 0x10;
pub const PED_AMBER: u32 = 0x20;
pub const PED_RED: u32 = 0x40;

/// How long each step of the table is shown.
pub const STEP_PERIOD: TickDuration = TickDuration::millis(5000);

/// Car lights on bits 0-2, pedestrian lights on bits 4-6.
pub const LIGHT_BITS: u32 = bits(3, 0) | bits(3, 4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficStep {
    pub car: u32,
    pub ped: u32,
}

impl TrafficStep {
    pub const fn new(car: u32, ped: u32) -> Self {
        Self { car, ped }
    }

    pub const fn pattern(&self) -> u32 {
        self.car | self.ped
    }
}

pub const TRAFFIC_SEQ: [TrafficStep; 12] = [
    TrafficStep::new(CAR_RED, PED_GREEN),
    TrafficStep::new(CAR_RED, PED_GREEN),
    TrafficStep::new(CAR_RED, PED_GREEN),
    TrafficStep::new(CAR_RED, PED_GREEN),
    TrafficStep::new(CAR_RED, PED_GREEN),
    TrafficStep::new(CAR_RED, PED_AMBER),
    TrafficStep::new(CAR_GREEN, PED_RED),
    TrafficStep::new(CAR_GREEN, PED_RED),
    TrafficStep::new(CAR_GREEN, PED_RED),
    TrafficStep::new(CAR_GREEN, PED_RED),
    TrafficStep::new(CAR_GREEN, PED_RED),
    TrafficStep::new(CAR_AMBER, PED_RED),
];

/// State touched by both the step task and the request handler.
pub struct TrafficShared {
    /// Index of the step the next firing shows.
    state: SharedCounter,
    /// Raised by a request; the scheduler reloads the step countdown.
    restart: SharedFlag,
    requests: SharedCounter,
}

impl TrafficShared {
    pub const fn new() -> Self {
        Self {
            state: SharedCounter::new(0),
            restart: SharedFlag::new(false),
            requests: SharedCounter::new(0),
        }
    }

    pub fn state(&self) -> u32 {
        self.state.get()
    }

    /// Pass to [`crate::scheduler::PeriodicTask::with_restart`] for the step task.
    pub fn restart_flag(&self) -> &SharedFlag {
        &self.restart
    }

    pub fn requests(&self) -> u32 {
        self.requests.get()
    }
}

impl Default for TrafficShared {
    fn default() -> Self {
        Self::new()
    }
}

fn check_table(table: &[TrafficStep]) -> Result<(), ConfigError> {
    if table.is_empty() {
        Err(ConfigError::EmptyTable)
    } else {
        Ok(())
    }
}

/// Periodic body: show the current step, then advance.
///
/// `gate` masks the request line, so a request can't interleave with the
/// read-show-advance of a step. A firing that finds a request still waiting
/// for its restart leaves the lights alone.
pub struct TrafficLight<'a, P: Port, G: InterruptGate> {
    out: Output<P>,
    table: &'static [TrafficStep],
    shared: &'a TrafficShared,
    gate: G,
}

impl<'a, P: Port, G: InterruptGate> TrafficLight<'a, P, G> {
    pub fn new(
        out: Output<P>,
        table: &'static [TrafficStep],
        shared: &'a TrafficShared,
        gate: G,
    ) -> Result<Self, ConfigError> {
        check_table(table)?;
        Ok(Self {
            out,
            table,
            shared,
            gate,
        })
    }

    /// Show the first step; the first firing moves on to the second.
    pub fn start(&mut self) {
        self.out.show(self.table[0].pattern());
        self.shared.state.store(1 % self.table.len() as u32);
    }
}

impl<P: Port, G: InterruptGate> TaskBody for TrafficLight<'_, P, G> {
    fn run(&mut self) {
        let table = self.table;
        let shared = self.shared;
        let out = &mut self.out;

        with_masked(&self.gate, || {
            // a request that landed after the countdown check owns this step;
            // the raised flag reloads the countdown on the next tick
            if shared.restart.get() {
                return;
            }

            let state = shared.state.get() as usize % table.len();
            out.show(table[state].pattern());
            shared.state.store(((state + 1) % table.len()) as u32);
        });
    }
}

/// Edge body for the pedestrian button.
///
/// Runs at least as urgently as the tick so the step task never preempts it
/// half way.
pub struct PedestrianRequest<'a, P: Port, S: TickSource> {
    out: Output<P>,
    table: &'static [TrafficStep],
    shared: &'a TrafficShared,
    source: S,
}

impl<'a, P: Port, S: TickSource> PedestrianRequest<'a, P, S> {
    pub fn new(
        out: Output<P>,
        table: &'static [TrafficStep],
        shared: &'a TrafficShared,
        source: S,
    ) -> Result<Self, ConfigError> {
        check_table(table)?;
        Ok(Self {
            out,
            table,
            shared,
            source,
        })
    }

    /// Force the step just before the crossing phase, which is the last entry
    /// of the cycle, and restart the step timing from here.
    pub fn override_to_pre_crossing(&mut self) {
        let step = self.table[self.table.len() - 1];
        self.out.show(step.pattern());

        self.source.restart();
        self.shared.restart.set(true);
        self.shared.state.store(0);
        self.shared.requests.increment();
    }
}

impl<P: Port, S: TickSource> EdgeHandler for PedestrianRequest<'_, P, S> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.override_to_pre_crossing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CORE_CLOCK_HZ;
    use crate::port::PinLedger;
    use crate::scheduler::{PeriodicTask, Scheduler};
    use crate::ticker::TickConfig;
    use crate::testing::{MockGate, MockPort, MockTickSource};
    use portable_atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::vec::Vec;

    const TICKS_PER_STEP: u32 = 10;

    type Request<'a> = PedestrianRequest<'a, &'a MockPort, &'a MockTickSource>;

    /// Gate that delivers a pedestrian request just as the step task masks
    /// the line, after the scheduler has already checked the restart flag.
    struct RequestOnMask<'a> {
        armed: AtomicBool,
        request: Mutex<Request<'a>>,
    }

    impl InterruptGate for RequestOnMask<'_> {
        fn mask(&self) -> bool {
            if self.armed.swap(false, Ordering::Relaxed) {
                self.request.lock().unwrap().override_to_pre_crossing();
            }
            false
        }

        fn unmask(&self) {}
    }

    #[test]
    fn table_shape() {
        assert_eq!(TRAFFIC_SEQ.len(), 12);
        let car_red = TRAFFIC_SEQ.iter().filter(|s| s.ped == PED_GREEN).count();
        let car_green = TRAFFIC_SEQ.iter().filter(|s| s.car == CAR_GREEN).count();
        assert_eq!((car_red, car_green), (5, 5));
        assert_eq!(TRAFFIC_SEQ[11], TrafficStep::new(CAR_AMBER, PED_RED));
        assert!(TRAFFIC_SEQ.iter().all(|s| s.pattern() & !LIGHT_BITS == 0));
    }

    #[test]
    fn step_lasts_five_seconds() {
        let tick = TickConfig::new(CORE_CLOCK_HZ, TickDuration::millis(100));
        assert_eq!(STEP_PERIOD.to_millis(), 5000);
        assert_eq!(tick.period_multiple(STEP_PERIOD), Ok(50));
    }

    #[test]
    fn empty_table_is_rejected() {
        static EMPTY: [TrafficStep; 0] = [];
        let port = MockPort::new(0);
        let mut ledger = PinLedger::new();
        let out = Output::new(&port, ledger.claim(0, LIGHT_BITS).unwrap()).unwrap();
        let shared = TrafficShared::new();
        assert!(TrafficLight::new(out, &EMPTY, &shared, MockGate::default()).is_err());
    }

    #[test]
    fn cycle_and_override() {
        let port = MockPort::with_level(0, 0x0800_0000);
        let mut ledger = PinLedger::new();
        let (lights, request_lights) = ledger.claim(0, LIGHT_BITS).unwrap().share_with_override();
        let shared = TrafficShared::new();
        let gate = MockGate::default();
        let source = MockTickSource::default();

        let mut light =
            TrafficLight::new(Output::new(&port, lights).unwrap(), &TRAFFIC_SEQ, &shared, &gate).unwrap();
        let mut request = PedestrianRequest::new(
            Output::overriding(&port, request_lights).unwrap(),
            &TRAFFIC_SEQ,
            &shared,
            &source,
        )
        .unwrap();

        light.start();
        assert_eq!(port.level() & LIGHT_BITS, TRAFFIC_SEQ[0].pattern());

        let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
        scheduler
            .add(
                PeriodicTask::new(TICKS_PER_STEP, &mut light)
                    .unwrap()
                    .with_restart(shared.restart_flag()),
            )
            .unwrap();

        // a full cycle plus one step, observed at every firing
        let mut shown = Vec::new();
        for tick in 1..=(13 * TICKS_PER_STEP) {
            scheduler.on_tick();
            if tick % TICKS_PER_STEP == 0 {
                shown.push(port.level() & LIGHT_BITS);
            }
        }
        let expected: Vec<u32> = (1..=13).map(|i| TRAFFIC_SEQ[i % 12].pattern()).collect();
        assert_eq!(shown, expected);
        assert_eq!(port.level() & !LIGHT_BITS, 0x0800_0000);

        // request in the middle of a step
        for _ in 0..3 {
            scheduler.on_tick();
        }
        request.on_edge(EdgeLine::Eint0);
        assert_eq!(port.level() & LIGHT_BITS, TRAFFIC_SEQ[11].pattern());
        assert_eq!(source.restarts.load(Ordering::Relaxed), 1);
        assert_eq!(shared.state(), 0);

        // the next firing is a full step after the request, then the cycle resumes
        let mut after = Vec::new();
        for tick in 1..=(3 * TICKS_PER_STEP) {
            let fired = scheduler.on_tick();
            assert_eq!(!fired.is_empty(), tick % TICKS_PER_STEP == 0, "tick {}", tick);
            if !fired.is_empty() {
                after.push(port.level() & LIGHT_BITS);
            }
        }
        assert_eq!(
            after,
            [TRAFFIC_SEQ[0].pattern(), TRAFFIC_SEQ[1].pattern(), TRAFFIC_SEQ[2].pattern()]
        );
        assert_eq!(shared.requests(), 1);
        assert!(!gate.is_masked());
    }

    #[test]
    fn request_on_a_firing_tick_holds_the_pre_crossing_step() {
        let port = MockPort::new(0);
        let mut ledger = PinLedger::new();
        let (lights, request_lights) = ledger.claim(0, LIGHT_BITS).unwrap().share_with_override();
        let shared = TrafficShared::new();
        let source = MockTickSource::default();

        let gate = RequestOnMask {
            armed: AtomicBool::new(false),
            request: Mutex::new(
                PedestrianRequest::new(
                    Output::overriding(&port, request_lights).unwrap(),
                    &TRAFFIC_SEQ,
                    &shared,
                    &source,
                )
                .unwrap(),
            ),
        };
        let mut light =
            TrafficLight::new(Output::new(&port, lights).unwrap(), &TRAFFIC_SEQ, &shared, &gate).unwrap();
        light.start();

        let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
        scheduler
            .add(
                PeriodicTask::new(TICKS_PER_STEP, &mut light)
                    .unwrap()
                    .with_restart(shared.restart_flag()),
            )
            .unwrap();

        for _ in 1..TICKS_PER_STEP {
            assert!(scheduler.on_tick().is_empty());
        }

        gate.armed.store(true, Ordering::Relaxed);
        assert!(!scheduler.on_tick().is_empty());
        assert_eq!(shared.requests(), 1);
        assert_eq!(port.level() & LIGHT_BITS, TRAFFIC_SEQ[11].pattern());
        assert_eq!(shared.state(), 0);

        // the pre-crossing step lasts a full step, then the cycle restarts
        for tick in 1..=TICKS_PER_STEP {
            let fired = scheduler.on_tick();
            assert_eq!(!fired.is_empty(), tick == TICKS_PER_STEP, "tick {}", tick);
            if tick < TICKS_PER_STEP {
                assert_eq!(port.level() & LIGHT_BITS, TRAFFIC_SEQ[11].pattern());
            }
        }
        assert_eq!(port.level() & LIGHT_BITS, TRAFFIC_SEQ[0].pattern());
        assert_eq!(shared.state(), 1);
        assert_eq!(source.restarts.load(Ordering::Relaxed), 1);
    }
}

//! Blink at a rate set by the time between two edges.
//!
//! An [`ElapsedCounter`] task counts base ticks. Each qualifying edge hands
//! the count to the [`PeriodMeter`], which clamps it and publishes it as the
//! new blink period. A [`RateBlink`] task toggles its LED whenever its own
//! sub-counter reaches the published period.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::error::ConfigError;
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::SharedCounter;
use crate::ticker::TickSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampRange {
    min: u32,
    max: u32,
}

impl ClampRange {
    pub const fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        // a zero period would toggle on every tick and never measure anything
        if min == 0 || min > max {
            return Err(ConfigError::InvalidClampRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}

/// Counters shared between the tick tasks and the edge handler, in base ticks.
pub struct PeriodShared {
    elapsed: SharedCounter,
    period: SharedCounter,
    measurements: SharedCounter,
}

impl PeriodShared {
    /// `default_period` stays in effect until the first edge.
    pub const fn new(default_period: u32) -> Self {
        Self {
            elapsed: SharedCounter::new(0),
            period: SharedCounter::new(default_period),
            measurements: SharedCounter::new(0),
        }
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed.get()
    }

    pub fn period(&self) -> u32 {
        self.period.get()
    }

    pub fn measurements(&self) -> u32 {
        self.measurements.get()
    }
}

/// Runs every tick; counts ticks since the last edge.
pub struct ElapsedCounter<'a> {
    shared: &'a PeriodShared,
}

impl<'a> ElapsedCounter<'a> {
    pub fn new(shared: &'a PeriodShared) -> Self {
        Self { shared }
    }
}

impl TaskBody for ElapsedCounter<'_> {
    fn run(&mut self) {
        self.shared.elapsed.increment();
    }
}

/// Edge body: elapsed ticks since the previous edge become the new period.
///
/// The first edge measures from startup.
pub struct PeriodMeter<'a, S: TickSource> {
    shared: &'a PeriodShared,
    range: ClampRange,
    source: S,
}

impl<'a, S: TickSource> PeriodMeter<'a, S> {
    pub fn new(shared: &'a PeriodShared, range: ClampRange, source: S) -> Self {
        Self {
            shared,
            range,
            source,
        }
    }
}

impl<S: TickSource> EdgeHandler for PeriodMeter<'_, S> {
    fn on_edge(&mut self, _line: EdgeLine) {
        let elapsed = self.shared.elapsed.take();
        self.shared.period.store(self.range.clamp(elapsed));
        self.shared.measurements.increment();
        self.source.restart();
    }
}

pub struct RateBlink<'a, P: Port> {
    out: Output<P>,
    shared: &'a PeriodShared,
    sub: u32,
}

impl<'a, P: Port> RateBlink<'a, P> {
    pub fn new(out: Output<P>, shared: &'a PeriodShared) -> Self {
        Self { out, shared, sub: 0 }
    }
}

impl<P: Port> TaskBody for RateBlink<'_, P> {
    fn run(&mut self) {
        self.sub += 1;
        // a shorter period published mid-count takes effect at once
        if self.sub >= self.shared.period.get() {
            self.out.toggle();
            self.sub = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PinLedger, bit};
    use crate::scheduler::{PeriodicTask, Scheduler};
    use crate::testing::{MockPort, MockTickSource};
    use portable_atomic::Ordering;

    const DEFAULT_PERIOD: u32 = 500;

    fn range() -> ClampRange {
        ClampRange::new(100, 1000).unwrap()
    }

    #[test]
    fn bad_ranges_are_rejected() {
        assert_eq!(
            ClampRange::new(0, 10),
            Err(ConfigError::InvalidClampRange { min: 0, max: 10 })
        );
        assert!(ClampRange::new(20, 10).is_err());
        assert!(ClampRange::new(10, 10).is_ok());
    }

    #[test]
    fn clamp_bounds() {
        let r = range();
        assert_eq!(r.clamp(0), 100);
        assert_eq!(r.clamp(250), 250);
        assert_eq!(r.clamp(u32::MAX), 1000);
    }

    /// Ticks `n` times with the elapsed counter running, then delivers an edge.
    fn measure(shared: &PeriodShared, source: &MockTickSource, n: u32) {
        let mut counter = ElapsedCounter::new(shared);
        let mut meter = PeriodMeter::new(shared, range(), source);

        let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
        scheduler.add(PeriodicTask::new(1, &mut counter).unwrap()).unwrap();
        for _ in 0..n {
            scheduler.on_tick();
        }
        meter.on_edge(EdgeLine::Eint1);
    }

    #[test]
    fn short_interval_clamps_to_minimum() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let source = MockTickSource::default();
        measure(&shared, &source, 50);
        assert_eq!(shared.period(), 100);
        assert_eq!(shared.elapsed(), 0);
        assert_eq!(source.restarts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn long_interval_clamps_to_maximum() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let source = MockTickSource::default();
        measure(&shared, &source, 1500);
        assert_eq!(shared.period(), 1000);
    }

    #[test]
    fn in_range_interval_is_kept_and_measured_per_edge() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let source = MockTickSource::default();
        measure(&shared, &source, 320);
        assert_eq!(shared.period(), 320);
        measure(&shared, &source, 700);
        assert_eq!(shared.period(), 700);
        assert_eq!(shared.measurements(), 2);
    }

    #[test]
    fn default_period_without_edges() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let port = MockPort::new(1);
        let mut ledger = PinLedger::new();
        let mut counter = ElapsedCounter::new(&shared);
        let mut blink = RateBlink::new(Output::new(&port, ledger.claim(1, bit(18)).unwrap()).unwrap(), &shared);

        let mut scheduler: Scheduler<'_, 2> = Scheduler::new();
        scheduler.add(PeriodicTask::new(1, &mut counter).unwrap()).unwrap();
        scheduler.add(PeriodicTask::new(1, &mut blink).unwrap()).unwrap();

        for tick in 1..=2000u32 {
            scheduler.on_tick();
            let on = (tick / DEFAULT_PERIOD) % 2 == 1;
            assert_eq!(port.level() & bit(18) != 0, on, "tick {}", tick);
        }
        assert_eq!(shared.period(), DEFAULT_PERIOD);
        assert_eq!(shared.elapsed(), 2000);
    }

    #[test]
    fn blink_follows_new_period() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let source = MockTickSource::default();
        let port = MockPort::new(1);
        let mut ledger = PinLedger::new();
        let mut blink = RateBlink::new(Output::new(&port, ledger.claim(1, bit(18)).unwrap()).unwrap(), &shared);
        let mut meter = PeriodMeter::new(&shared, range(), &source);

        for _ in 0..150 {
            shared.elapsed.increment();
        }
        meter.on_edge(EdgeLine::Eint1);
        assert_eq!(shared.period(), 150);

        let mut toggles = 0;
        let mut last = port.level();
        for _ in 0..600 {
            blink.run();
            if port.level() != last {
                toggles += 1;
                last = port.level();
            }
        }
        assert_eq!(toggles, 4);
    }

    #[test]
    fn last_period_holds_when_edges_stop() {
        let shared = PeriodShared::new(DEFAULT_PERIOD);
        let source = MockTickSource::default();
        measure(&shared, &source, 320);
        assert_eq!(shared.period(), 320);

        let port = MockPort::new(1);
        let mut ledger = PinLedger::new();
        let mut counter = ElapsedCounter::new(&shared);
        let mut blink = RateBlink::new(Output::new(&port, ledger.claim(1, bit(18)).unwrap()).unwrap(), &shared);

        let mut scheduler: Scheduler<'_, 2> = Scheduler::new();
        scheduler.add(PeriodicTask::new(1, &mut counter).unwrap()).unwrap();
        scheduler.add(PeriodicTask::new(1, &mut blink).unwrap()).unwrap();

        // no edge for three times the clamp maximum
        for tick in 1..=3000u32 {
            scheduler.on_tick();
            let on = (tick / 320) % 2 == 1;
            assert_eq!(port.level() & bit(18) != 0, on, "tick {}", tick);
        }
        assert_eq!(shared.period(), 320);
        assert_eq!(shared.measurements(), 1);
        assert_eq!(shared.elapsed(), 3000);
    }
}

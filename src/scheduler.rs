//! Run several periodic tasks from one tick interrupt.
//!
//! Each task keeps its own countdown. On every tick the countdown is checked
//! and decremented unconditionally; the body runs exactly when it reaches
//! zero, then the countdown is reloaded with `period_multiple - 1`. A task
//! with `period_multiple = N` therefore fires on ticks N, 2N, 3N, ...
//!
//! Tasks are evaluated in the order they were added. Programs whose tasks
//! share an output depend on that order and say so where they build the
//! table.

use heapless::Vec;

use crate::config::MAX_TASKS;
use crate::error::ConfigError;
use crate::shared::{SharedCounter, SharedFlag};
use crate::ticker::TickSource;

/// The work a task does when its countdown expires.
///
/// Bodies run inside the tick interrupt: they must return well within one
/// base period and must never block.
pub trait TaskBody {
    fn run(&mut self);
}

impl<F: FnMut()> TaskBody for F {
    fn run(&mut self) {
        self()
    }
}

pub struct PeriodicTask<'a> {
    countdown: u32,
    reload: u32,
    restart: Option<&'a SharedFlag>,
    body: &'a mut (dyn TaskBody + Send),
}

impl<'a> PeriodicTask<'a> {
    pub fn new(period_multiple: u32, body: &'a mut (dyn TaskBody + Send)) -> Result<Self, ConfigError> {
        if period_multiple == 0 {
            return Err(ConfigError::ZeroPeriodMultiple);
        }

        Ok(Self {
            countdown: period_multiple - 1,
            reload: period_multiple - 1,
            restart: None,
            body,
        })
    }

    /// Reload the countdown on the next tick whenever `flag` is raised.
    ///
    /// This is how an edge handler restarts a task's timing without touching
    /// the countdown, which only the tick handler owns.
    pub fn with_restart(mut self, flag: &'a SharedFlag) -> Self {
        self.restart = Some(flag);
        self
    }

    pub fn period_multiple(&self) -> u32 {
        self.reload + 1
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Advance one tick, returning whether the body ran.
    fn tick(&mut self) -> bool {
        if let Some(flag) = self.restart {
            if flag.take() {
                self.countdown = self.reload;
            }
        }

        if self.countdown == 0 {
            self.body.run();
            self.countdown = self.reload;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }
}

/// Which tasks fired during one tick, by table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fired(u32);

impl Fired {
    pub fn contains(&self, index: usize) -> bool {
        index < MAX_TASKS && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

pub struct Scheduler<'a, const N: usize> {
    tasks: Vec<PeriodicTask<'a>, N>,
    ticks: u32,
    overruns: u32,
    overrun_counter: Option<&'a SharedCounter>,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    pub const fn new() -> Self {
        const { assert!(N <= MAX_TASKS) };

        Self {
            tasks: Vec::new(),
            ticks: 0,
            overruns: 0,
            overrun_counter: None,
        }
    }

    /// Mirror the overrun count into `counter` so the idle loop can report it.
    pub fn with_overrun_counter(mut self, counter: &'a SharedCounter) -> Self {
        self.overrun_counter = Some(counter);
        self
    }

    /// Append a task; returns its index in evaluation order.
    pub fn add(&mut self, task: PeriodicTask<'a>) -> Result<usize, ConfigError> {
        self.tasks
            .push(task)
            .map_err(|_| ConfigError::TaskTableFull)?;
        Ok(self.tasks.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Evaluate every task once, in table order.
    pub fn on_tick(&mut self) -> Fired {
        self.ticks = self.ticks.wrapping_add(1);

        let mut fired = 0;
        for (index, task) in self.tasks.iter_mut().enumerate() {
            if task.tick() {
                fired |= 1 << index;
            }
        }

        Fired(fired)
    }

    /// [`Scheduler::on_tick`], then count an overrun if the source already has
    /// the next tick pending.
    pub fn on_tick_from<S: TickSource + ?Sized>(&mut self, source: &S) -> Fired {
        let fired = self.on_tick();

        if source.tick_pending() {
            self.overruns = self.overruns.wrapping_add(1);
            if let Some(counter) = self.overrun_counter {
                counter.increment();
            }
        }

        fired
    }
}

impl<const N: usize> Default for Scheduler<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTickSource;
    use portable_atomic::Ordering;
    use std::sync::Mutex;
    use std::vec::Vec as StdVec;

    #[test]
    fn zero_period_is_rejected() {
        let mut body = || {};
        assert!(matches!(
            PeriodicTask::new(0, &mut body),
            Err(ConfigError::ZeroPeriodMultiple)
        ));
        assert_eq!(
            ConfigError::ZeroPeriodMultiple.to_string(),
            "task period multiple must be at least one tick"
        );
    }

    #[test]
    fn task_fires_every_n_ticks() {
        for n in 1..=7u32 {
            let fired_at = Mutex::new(StdVec::new());
            let tick = SharedCounter::new(0);
            let mut body = || fired_at.lock().unwrap().push(tick.get());

            let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
            scheduler.add(PeriodicTask::new(n, &mut body).unwrap()).unwrap();

            for _ in 0..(n * 6) {
                tick.increment();
                scheduler.on_tick();
            }

            let expected: StdVec<u32> = (1..=6).map(|k| k * n).collect();
            assert_eq!(*fired_at.lock().unwrap(), expected, "period {}", n);
        }
    }

    #[test]
    fn countdown_stays_within_reload() {
        let mut body = || {};
        let mut task = PeriodicTask::new(4, &mut body).unwrap();
        for _ in 0..20 {
            task.tick();
            assert!(task.countdown() <= task.period_multiple() - 1);
        }
    }

    #[test]
    fn two_tasks_interleave_in_table_order() {
        let log = Mutex::new(StdVec::new());
        let tick = SharedCounter::new(0);
        let mut fast = || log.lock().unwrap().push((tick.get(), 2));
        let mut slow = || log.lock().unwrap().push((tick.get(), 5));

        let mut scheduler: Scheduler<'_, 2> = Scheduler::new();
        scheduler.add(PeriodicTask::new(2, &mut fast).unwrap()).unwrap();
        scheduler.add(PeriodicTask::new(5, &mut slow).unwrap()).unwrap();

        let mut tenth = Fired::default();
        for _ in 0..10 {
            tick.increment();
            tenth = scheduler.on_tick();
        }

        let log = log.lock().unwrap();
        let fast_ticks: StdVec<u32> = log.iter().filter(|e| e.1 == 2).map(|e| e.0).collect();
        let slow_ticks: StdVec<u32> = log.iter().filter(|e| e.1 == 5).map(|e| e.0).collect();
        assert_eq!(fast_ticks, [2, 4, 6, 8, 10]);
        assert_eq!(slow_ticks, [5, 10]);

        // both fire on tick 10, in table order
        assert_eq!(&log[log.len() - 2..], &[(10, 2), (10, 5)]);
        assert!(tenth.contains(0) && tenth.contains(1));
        assert_eq!(tenth.count(), 2);
    }

    #[test]
    fn restart_flag_reloads_countdown() {
        let runs = SharedCounter::new(0);
        let restart = SharedFlag::new(false);
        let mut body = || {
            runs.increment();
        };

        let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
        scheduler
            .add(PeriodicTask::new(3, &mut body).unwrap().with_restart(&restart))
            .unwrap();

        scheduler.on_tick();
        scheduler.on_tick();
        restart.set(true);
        // would have fired now; the restart pushes it three ticks out
        assert!(scheduler.on_tick().is_empty());
        assert!(scheduler.on_tick().is_empty());
        assert!(!scheduler.on_tick().is_empty());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn table_overflow_is_reported() {
        let mut a = || {};
        let mut b = || {};
        let mut scheduler: Scheduler<'_, 1> = Scheduler::new();
        scheduler.add(PeriodicTask::new(1, &mut a).unwrap()).unwrap();
        assert_eq!(
            scheduler.add(PeriodicTask::new(1, &mut b).unwrap()),
            Err(ConfigError::TaskTableFull)
        );
    }

    #[test]
    fn overruns_are_counted() {
        let source = MockTickSource::default();
        let shared = SharedCounter::new(0);
        let mut body = || {};

        let mut scheduler: Scheduler<'_, 1> = Scheduler::new().with_overrun_counter(&shared);
        scheduler.add(PeriodicTask::new(1, &mut body).unwrap()).unwrap();

        scheduler.on_tick_from(&&source);
        assert_eq!(scheduler.overruns(), 0);

        source.pending.store(true, Ordering::Relaxed);
        scheduler.on_tick_from(&&source);
        scheduler.on_tick_from(&&source);
        assert_eq!(scheduler.overruns(), 2);
        assert_eq!(shared.get(), 2);
        assert_eq!(scheduler.ticks(), 3);
    }
}

use fugit::{TimerDurationU32, TimerInstantU32};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::SYSTICK_MAX_RELOAD;
use crate::error::ConfigError;

// Millisecond precision for every time value in the crate
pub type TickDuration = TimerDurationU32<1000>;
pub type TickInstant = TimerInstantU32<1000>;

/// Hardware side of the tick: the countdown timer that raises the periodic
/// interrupt.
pub trait TickSource {
    /// Clear the current count so the next tick is one full period away.
    fn restart(&mut self);

    /// Another tick elapsed while the current one was still being handled.
    fn tick_pending(&self) -> bool;
}

/// Wall-clock description of a tick: core clock and base period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    clock_hz: u32,
    base_period: TickDuration,
}

impl TickConfig {
    pub const fn new(clock_hz: u32, base_period: TickDuration) -> Self {
        Self {
            clock_hz,
            base_period,
        }
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn base_period(&self) -> TickDuration {
        self.base_period
    }

    /// Counter reload value, `clock_hz * period - 1`.
    ///
    /// Computed in 64 bits so an oversized period is reported instead of
    /// silently wrapping into a short one.
    pub fn reload(&self) -> Result<u32, ConfigError> {
        let cycles = self.clock_hz as u64 * self.base_period.to_millis() as u64 / 1000;
        if cycles == 0 {
            return Err(ConfigError::TickTooShort);
        }

        let reload = cycles - 1;
        if reload > SYSTICK_MAX_RELOAD as u64 {
            return Err(ConfigError::TickTooLong {
                reload,
                max: SYSTICK_MAX_RELOAD,
            });
        }

        Ok(reload as u32)
    }

    /// Number of base ticks in `period`. The period must be a positive, whole
    /// multiple of the base period.
    pub fn period_multiple(&self, period: TickDuration) -> Result<u32, ConfigError> {
        let tick_ms = self.base_period.to_millis();
        let period_ms = period.to_millis();

        if tick_ms == 0 || period_ms == 0 || period_ms % tick_ms != 0 {
            return Err(ConfigError::BadPeriodMultiple { period_ms, tick_ms });
        }

        Ok(period_ms / tick_ms)
    }
}

/// Free-running clock advanced by the tick interrupt.
///
/// Lives in a `static`; the tick handler calls [`Ticker::on_tick`], any other
/// context reads [`Ticker::now`]. Wraps after ~49 days.
pub struct Ticker {
    now_ms: AtomicU32,
    step_ms: u32,
}

impl Ticker {
    pub const fn new(base_period: TickDuration) -> Self {
        Self {
            now_ms: AtomicU32::new(0),
            step_ms: base_period.to_millis(),
        }
    }

    pub fn on_tick(&self) {
        self.now_ms.fetch_add(self.step_ms, Ordering::Relaxed);
    }

    pub fn now(&self) -> TickInstant {
        TickInstant::from_ticks(self.now_ms.load(Ordering::Relaxed))
    }

    pub fn base_period(&self) -> TickDuration {
        TickDuration::from_ticks(self.step_ms)
    }
}

/// A deadline measured on a [`Ticker`].
pub struct TickTimer<'a> {
    running: bool,
    duration: TickDuration,
    end_time: TickInstant,
    ticker: &'a Ticker,
}

impl<'a> TickTimer<'a> {
    pub fn new(duration: TickDuration, ticker: &'a Ticker) -> Self {
        Self {
            running: false,
            duration,
            end_time: TickInstant::from_ticks(0),
            ticker,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.reset();
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ready(&self) -> bool {
        // Wrap-aware: "now is at or past end" while within half the range
        let now = self.ticker.now().ticks();
        self.running && now.wrapping_sub(self.end_time.ticks()) < 0x8000_0000
    }

    fn reset(&mut self) {
        let end = self.ticker.now().ticks().wrapping_add(self.duration.ticks());
        self.end_time = TickInstant::from_ticks(end);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Wait until `condition` holds or `timeout` elapses on `ticker`.
///
/// `idle` runs between checks: `wfi` on the target, a simulated tick in
/// tests. With no timeout the wait only ends on the condition. Only call this
/// from the idle loop; never from an interrupt handler.
pub fn wait_until<C, I>(
    ticker: &Ticker,
    timeout: Option<TickDuration>,
    mut condition: C,
    mut idle: I,
) -> WaitOutcome
where
    C: FnMut() -> bool,
    I: FnMut(),
{
    let mut timer = TickTimer::new(timeout.unwrap_or(TickDuration::from_ticks(0)), ticker);
    if timeout.is_some() {
        timer.start();
    }

    loop {
        if condition() {
            return WaitOutcome::Ready;
        }
        if timer.is_ready() {
            return WaitOutcome::TimedOut;
        }
        idle();
    }
}

/// Let `duration` elapse on `ticker`.
pub fn delay<I: FnMut()>(ticker: &Ticker, duration: TickDuration, idle: I) {
    wait_until(ticker, Some(duration), || false, idle);
}

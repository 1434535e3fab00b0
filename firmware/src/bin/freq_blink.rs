//! Blinks P1.18 with a half period equal to the time between the last two
//! falling edges on EINT1 (P2.11), clamped to 100-1000 ms. Until the first
//! edge the LED toggles every 500 ms.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::period::{ClampRange, ElapsedCounter, PeriodMeter, PeriodShared, RateBlink};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit};
use tick_tasks::shared::SharedCounter;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

/// One tick per millisecond, so periods below are in both ticks and ms.
const TICK: TickDuration = TickDuration::millis(1);
const MIN_PERIOD: u32 = 100;
const MAX_PERIOD: u32 = 1000;
const DEFAULT_PERIOD: u32 = 500;

const LED: u32 = bit(18);
const SIGNAL: EdgeLine = EdgeLine::Eint1;

static SCHEDULER: IsrSlot<Scheduler<'static, 2>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static PERIOD: PeriodShared = PeriodShared::new(DEFAULT_PERIOD);
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static ELAPSED: StaticCell<ElapsedCounter<'static>> = StaticCell::new();
static BLINK: StaticCell<RateBlink<'static, GpioPort>> = StaticCell::new();
static METER: StaticCell<PeriodMeter<'static, SysTickSource>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    let mut measurements = 0;
    loop {
        cortex_m::asm::wfi();

        if PERIOD.measurements() != measurements {
            measurements = PERIOD.measurements();
            rprintln!("period {} ms", PERIOD.period());
        }

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);
    let range = ClampRange::new(MIN_PERIOD, MAX_PERIOD)?;

    let (signal_port, signal_pin) = exti::pin_for(SIGNAL);
    let mut ledger = PinLedger::new();
    let led_bits = ledger.claim(1, LED)?;
    ledger.claim(signal_port, bit(signal_pin))?;

    board.pins.configure_pins(1, LED, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(1, LED, Direction::Output);
    board.pins.configure_pin(signal_port, signal_pin, PinFunction::Alt1, PullMode::PullUp);

    let elapsed = ELAPSED.init(ElapsedCounter::new(&PERIOD));
    let blink = BLINK.init(RateBlink::new(Output::new(board.ports.p1, led_bits)?, &PERIOD));

    // Evaluation order: elapsed counter, then blink. Both run every tick.
    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(1, elapsed)?)?;
    scheduler.add(PeriodicTask::new(1, blink)?)?;
    SCHEDULER.put(scheduler);

    let meter = METER.init(PeriodMeter::new(&PERIOD, range, SysTickSource));
    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: SIGNAL,
                trigger: Trigger::FallingEdge,
                priority: 0,
            },
            meter,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 1);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("freq_blink: default period {} ms, clamp {}-{} ms", DEFAULT_PERIOD, range.min(), range.max());

    Ok(())
}

#[exception]
fn SysTick() {
    SCHEDULER.with(|scheduler| scheduler.on_tick_from(&SysTickSource));
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    if let Some(line) = exti::line_for_irq(irqn) {
        EDGES.with(|edges| edges.dispatch(line));
    }
}

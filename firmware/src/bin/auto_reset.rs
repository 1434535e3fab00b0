//! Counts rising edges on EINT1 (P2.11) in binary on P0.0-P0.3 and clears
//! the count every 2 s.
//!
//! EINT1 outranks SysTick, so the reset task masks EINT1 while it clears the
//! count and the LEDs.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit, bits};
use tick_tasks::shared::SharedCounter;
use tick_tasks::tasks::{AutoReset, CountOnEdge};
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt, Irq, NvicGate};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(100);
const RESET_PERIOD: TickDuration = TickDuration::millis(2000);

const LEDS: u32 = bits(4, 0);
const BUTTON: EdgeLine = EdgeLine::Eint1;

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static COUNT: SharedCounter = SharedCounter::new(0);
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static RESET: StaticCell<AutoReset<'static, GpioPort, NvicGate>> = StaticCell::new();
static COUNTER: StaticCell<CountOnEdge<'static, GpioPort>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    loop {
        cortex_m::asm::wfi();

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);
    let reset_every = tick.period_multiple(RESET_PERIOD)?;

    let (button_port, button_pin) = exti::pin_for(BUTTON);
    let mut ledger = PinLedger::new();
    // the reset writes with the button line masked, the counter overrides
    let (reset_bits, counter_bits) = ledger.claim(0, LEDS)?.share_with_override();
    ledger.claim(button_port, bit(button_pin))?;

    board.pins.configure_pins(0, LEDS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, LEDS, Direction::Output);
    board.pins.configure_pin(button_port, button_pin, PinFunction::Alt1, PullMode::PullUp);
    let mut reset_out = Output::new(board.ports.p0, reset_bits)?;
    reset_out.clear_all();

    let reset = RESET.init(AutoReset::new(&COUNT, reset_out, NvicGate(Irq::from(BUTTON))));
    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(reset_every, reset)?)?;
    SCHEDULER.put(scheduler);

    let counter = COUNTER.init(CountOnEdge::new(&COUNT, Output::overriding(board.ports.p0, counter_bits)?));
    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: BUTTON,
                trigger: Trigger::RisingEdge,
                priority: 0,
            },
            counter,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 1);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("auto_reset: reset every {} ticks of {} ms", reset_every, TICK.to_millis());

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

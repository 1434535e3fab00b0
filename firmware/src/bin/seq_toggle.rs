//! Eight LEDs on P0.0-P0.7 step through a one-hot pattern every 250 ms on a
//! 50 ms tick. Each rising edge on EINT0 (P2.10) pauses or resumes the walk.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit, bits};
use tick_tasks::sequence::{ONE_HOT_8, Sequence, SequenceAdvance};
use tick_tasks::shared::{SharedCounter, SharedFlag};
use tick_tasks::tasks::ToggleFlag;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(50);
const STEP_PERIOD: TickDuration = TickDuration::millis(250);

const LEDS: u32 = bits(8, 0);
const BUTTON: EdgeLine = EdgeLine::Eint0;

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static RUNNING: SharedFlag = SharedFlag::new(true);
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static SEQUENCE: StaticCell<SequenceAdvance<'static, GpioPort>> = StaticCell::new();
static PAUSE: StaticCell<ToggleFlag<'static>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    let mut running = RUNNING.get();
    loop {
        cortex_m::asm::wfi();

        if RUNNING.get() != running {
            running = !running;
            rprintln!("{}", if running { "resumed" } else { "paused" });
        }

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);
    let step_every = tick.period_multiple(STEP_PERIOD)?;

    let (button_port, button_pin) = exti::pin_for(BUTTON);
    let mut ledger = PinLedger::new();
    let led_bits = ledger.claim(0, LEDS)?;
    ledger.claim(button_port, bit(button_pin))?;

    board.pins.configure_pins(0, LEDS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, LEDS, Direction::Output);
    board.pins.configure_pin(button_port, button_pin, PinFunction::Alt1, PullMode::PullUp);

    let sequence = SEQUENCE.init(
        SequenceAdvance::new(Output::new(board.ports.p0, led_bits)?, Sequence::new(&ONE_HOT_8)?)
            .paused_by(&RUNNING),
    );
    sequence.show_current();

    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(step_every, sequence)?)?;
    SCHEDULER.put(scheduler);

    let pause = PAUSE.init(ToggleFlag::new(&RUNNING));
    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: BUTTON,
                trigger: Trigger::RisingEdge,
                priority: 0,
            },
            pause,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 1);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("seq_toggle: {} ms tick, step every {} ticks", TICK.to_millis(), step_every);

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

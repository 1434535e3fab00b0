//! Two independent tasks on one 100 ms tick: the LED on P0.22 toggles every
//! 200 ms while P2.0-P2.3 walk a one-hot pattern every 500 ms.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit, bits};
use tick_tasks::sequence::{ONE_HOT_4, Sequence, SequenceAdvance};
use tick_tasks::shared::SharedCounter;
use tick_tasks::tasks::Toggle;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(100);
const BLINK_PERIOD: TickDuration = TickDuration::millis(200);
const SEQUENCE_PERIOD: TickDuration = TickDuration::millis(500);

const BLINK_LED: u32 = bit(22);
const SEQUENCE_LEDS: u32 = bits(4, 0);

static SCHEDULER: IsrSlot<Scheduler<'static, 2>> = IsrSlot::new();
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static BLINK: StaticCell<Toggle<GpioPort>> = StaticCell::new();
static SEQUENCE: StaticCell<SequenceAdvance<'static, GpioPort>> = StaticCell::new();

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
    let blink_every = tick.period_multiple(BLINK_PERIOD)?;
    let sequence_every = tick.period_multiple(SEQUENCE_PERIOD)?;

    let mut ledger = PinLedger::new();
    let blink_bits = ledger.claim(0, BLINK_LED)?;
    let sequence_bits = ledger.claim(2, SEQUENCE_LEDS)?;

    board.pins.configure_pins(0, BLINK_LED, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, BLINK_LED, Direction::Output);
    board.pins.configure_pins(2, SEQUENCE_LEDS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(2, SEQUENCE_LEDS, Direction::Output);

    let blink = BLINK.init(Toggle::new(Output::new(board.ports.p0, blink_bits)?));
    let sequence = SEQUENCE.init(SequenceAdvance::new(
        Output::new(board.ports.p2, sequence_bits)?,
        Sequence::new(&ONE_HOT_4)?,
    ));
    sequence.show_current();

    // Evaluation order: blink, then sequence. They own different ports.
    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(blink_every, blink)?)?;
    scheduler.add(PeriodicTask::new(sequence_every, sequence)?)?;
    SCHEDULER.put(scheduler);

    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!(
        "multitask: {} ms tick, blink every {} ticks, sequence every {} ticks",
        TICK.to_millis(),
        blink_every,
        sequence_every
    );

    Ok(())
}

#[exception]
fn SysTick() {
    SCHEDULER.with(|scheduler| scheduler.on_tick_from(&SysTickSource));
}

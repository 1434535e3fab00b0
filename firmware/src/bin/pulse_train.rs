//! Plays a burst of four pulses on P2.4, one level per 10 ms tick, after each
//! falling edge on EINT2 (P2.12). An edge during a burst aborts it and the
//! line returns to idle high.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit};
use tick_tasks::pulse::{BURST_OF_FOUR, PulseOutput, PulseShared, PulseTrain, PulseTrigger};
use tick_tasks::shared::SharedCounter;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt, Irq, NvicGate};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(10);

const PULSE_PIN: u8 = 4;
const TRIGGER: EdgeLine = EdgeLine::Eint2;

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static PULSES: PulseShared = PulseShared::new();
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static TRAIN: StaticCell<PulseTrain<'static, GpioPort, NvicGate>> = StaticCell::new();
static START: StaticCell<PulseTrigger<'static, GpioPort, SysTickSource>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    let (mut trains, mut aborts) = (0, 0);
    loop {
        cortex_m::asm::wfi();

        if PULSES.trains() != trains {
            trains = PULSES.trains();
            rprintln!("train #{}", trains);
        }
        if PULSES.aborts() != aborts {
            aborts = PULSES.aborts();
            rprintln!("aborted ({} so far)", aborts);
        }

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);

    let (trigger_port, trigger_pin) = exti::pin_for(TRIGGER);
    let mut ledger = PinLedger::new();
    // the train plays with the trigger line masked, the trigger starts and aborts
    let (train_bits, trigger_bits) = ledger.claim(2, bit(PULSE_PIN))?.share_with_override();
    ledger.claim(trigger_port, bit(trigger_pin))?;

    board.pins.configure_pin(2, PULSE_PIN, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(2, bit(PULSE_PIN), Direction::Output);
    board.pins.configure_pin(trigger_port, trigger_pin, PinFunction::Alt1, PullMode::PullUp);

    let mut start_out = PulseOutput::new(Output::overriding(board.ports.p2, trigger_bits)?, true);
    start_out.idle();

    let train = TRAIN.init(PulseTrain::new(
        PulseOutput::new(Output::new(board.ports.p2, train_bits)?, true),
        BURST_OF_FOUR,
        &PULSES,
        NvicGate(Irq::from(TRIGGER)),
    ));
    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(1, train)?)?;
    SCHEDULER.put(scheduler);

    let start = START.init(PulseTrigger::new(start_out, BURST_OF_FOUR, &PULSES, SysTickSource));
    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: TRIGGER,
                trigger: Trigger::FallingEdge,
                priority: 0,
            },
            start,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 1);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("pulse_train: {} levels, {} ms each", BURST_OF_FOUR.len(), TICK.to_millis());

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

//! Parking barrier. A vehicle on the EINT0 sensor (P2.10, rising edge) opens
//! the barrier on P0.15 when the permit input P2.9 is high and lights the
//! red LED on P1.4 when it is low.
//!
//! The timing button on P0.0 is a GPIO pin interrupt (falling edge) on the
//! EINT3 channel. Its first press opens a 3 s window; the number of presses
//! in the window sets how long later openings last: one press 5 s, two 10 s,
//! three 20 s, four 40 s.
//!
//! The timer task runs every 200 ms on a 100 ms tick.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::barrier::{BarrierShared, BarrierTimer, TimingPress, VehicleArrival};
use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::pin_edge::{PIN_CHANNEL, PinDispatcher, PinEdgeConfig, PinLine};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit};
use tick_tasks::shared::SharedCounter;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt, Irq, NvicGate, PinInterrupts};
use tick_tasks_firmware::gpio::{GpioPort, InputBit};
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(100);
const TIMER_PERIOD: TickDuration = TickDuration::millis(200);

const BARRIER_BIT: u32 = bit(15);
const REJECT_BIT: u32 = bit(4);
const PERMIT_PIN: u8 = 9;

const VEHICLE: EdgeLine = EdgeLine::Eint0;
const TIMING_BUTTON: PinLine = PinLine::new(0, 0);

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 2>> = IsrSlot::new();
static BARRIER: BarrierShared = BarrierShared::new();
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static TIMER: StaticCell<BarrierTimer<'static, GpioPort, NvicGate, NvicGate>> = StaticCell::new();
static ARRIVAL: StaticCell<VehicleArrival<'static, GpioPort, GpioPort, InputBit>> = StaticCell::new();
static PRESS: StaticCell<TimingPress<'static>> = StaticCell::new();
static PINS: StaticCell<PinDispatcher<'static, PinInterrupts, 1>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    let (mut openings, mut rejections, mut open_ticks) = (0, 0, BARRIER.open_ticks());
    loop {
        cortex_m::asm::wfi();

        if BARRIER.openings() != openings {
            openings = BARRIER.openings();
            rprintln!("opened ({} so far)", openings);
        }
        if BARRIER.rejections() != rejections {
            rejections = BARRIER.rejections();
            rprintln!("rejected ({} so far)", rejections);
        }
        if BARRIER.open_ticks() != open_ticks {
            open_ticks = BARRIER.open_ticks();
            rprintln!("open time now {} ms", open_ticks * TIMER_PERIOD.to_millis());
        }

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);
    let timer_every = tick.period_multiple(TIMER_PERIOD)?;

    let (sensor_port, sensor_pin) = exti::pin_for(VEHICLE);
    let mut ledger = PinLedger::new();
    // the timer closes with the sensor line masked, the arrival opens
    let (timer_bits, arrival_bits) = ledger.claim(0, BARRIER_BIT)?.share_with_override();
    let reject_bits = ledger.claim(1, REJECT_BIT)?;
    ledger.claim(2, bit(PERMIT_PIN))?;
    ledger.claim(sensor_port, bit(sensor_pin))?;
    ledger.claim(TIMING_BUTTON.port, TIMING_BUTTON.mask())?;

    board.pins.configure_pin(0, 15, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, BARRIER_BIT, Direction::Output);
    board.pins.configure_pin(1, 4, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(1, REJECT_BIT, Direction::Output);
    board.pins.configure_pin(2, PERMIT_PIN, PinFunction::Gpio, PullMode::PullDown);
    board.pins.set_direction(2, bit(PERMIT_PIN), Direction::Input);
    board.pins.configure_pin(TIMING_BUTTON.port, TIMING_BUTTON.pin, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(TIMING_BUTTON.port, TIMING_BUTTON.mask(), Direction::Input);
    board.pins.configure_pin(sensor_port, sensor_pin, PinFunction::Alt1, PullMode::PullDown);

    let mut reject = Output::new(board.ports.p1, reject_bits)?;
    reject.clear_all();

    let timer = TIMER.init(BarrierTimer::new(
        Output::new(board.ports.p0, timer_bits)?,
        &BARRIER,
        NvicGate(Irq::from(VEHICLE)),
        NvicGate(Irq::from(PIN_CHANNEL)),
    ));
    timer.close();

    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(timer_every, timer)?)?;
    SCHEDULER.put(scheduler);

    let arrival = ARRIVAL.init(VehicleArrival::new(
        Output::overriding(board.ports.p0, arrival_bits)?,
        reject,
        board.ports.p2.input(PERMIT_PIN),
        &BARRIER,
    ));
    let press = PRESS.init(TimingPress::new(&BARRIER));

    let pins = PINS.init(PinDispatcher::new(PinInterrupts::new(&mut board.gpioint)));
    pins.register(
        PinEdgeConfig {
            line: TIMING_BUTTON,
            trigger: Trigger::FallingEdge,
        },
        press,
    )?;

    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: VEHICLE,
                trigger: Trigger::RisingEdge,
                priority: 0,
            },
            arrival,
        )?;
        edges.register(
            EdgeConfig {
                line: PIN_CHANNEL,
                trigger: Trigger::FallingEdge,
                priority: 1,
            },
            pins,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 2);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("barrier_gate: timer every {} ticks of {} ms", timer_every, TICK.to_millis());

    Ok(())
}

#[exception]
fn SysTick() {
    SCHEDULER.with(|scheduler| scheduler.on_tick_from(&SysTickSource));
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    if let Some(line) = exti::line_for_irq(irqn) {
        // both lines share one dispatcher at different priorities
        EDGES.lock(|edges| edges.dispatch(line));
    }
}

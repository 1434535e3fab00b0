//! Two buttons play two color sequences on the RGB LED (P0.22 red, P3.25
//! green, P3.26 blue, all active low).
//!
//! Button B on EINT1 (P2.11, falling edge, priority 0) asks for red, green,
//! blue. Button A on P0.0 is a GPIO pin interrupt (rising edge) that arrives
//! on the EINT3 channel at priority 1 and asks for yellow, cyan, magenta. The
//! player task runs on every 100 ms tick at priority 2 and holds each color
//! for 500 ms. If both buttons are pending at once, EINT1 is serviced first
//! and button A's request is the one played.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLatch, EdgeLine, Trigger};
use tick_tasks::pin_edge::{PIN_CHANNEL, PinDispatcher, PinEdgeConfig, PinLine};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit};
use tick_tasks::rgb::{Color, ColorPlayer, ColorRequests, PRIMARY_SEQ, PlaySequence, RgbLed, WARM_SEQ};
use tick_tasks::shared::SharedCounter;
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt, PinInterrupts};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(100);
const COLOR_HOLD: TickDuration = TickDuration::millis(500);

const RED_BIT: u32 = bit(22);
const GREEN_BIT: u32 = bit(25);
const BLUE_BIT: u32 = bit(26);

const BUTTON_A: PinLine = PinLine::new(0, 0);
const BUTTON_B: EdgeLine = EdgeLine::Eint1;

const WARM: usize = 0;
const PRIMARY: usize = 1;
static SEQUENCES: [&[Color]; 2] = [&WARM_SEQ, &PRIMARY_SEQ];

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 2>> = IsrSlot::new();
static REQUESTS: ColorRequests = ColorRequests::new();
static FIRED: EdgeLatch = EdgeLatch::new();
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static PLAYER: StaticCell<ColorPlayer<'static, GpioPort, GpioPort>> = StaticCell::new();
static PLAY_WARM: StaticCell<PlaySequence<'static>> = StaticCell::new();
static PLAY_PRIMARY: StaticCell<PlaySequence<'static>> = StaticCell::new();
static PINS: StaticCell<PinDispatcher<'static, PinInterrupts, 1>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    loop {
        cortex_m::asm::wfi();

        while let Some(line) = FIRED.take_any() {
            if line == PIN_CHANNEL {
                rprintln!("button A: yellow, cyan, magenta");
            } else {
                rprintln!("button B: red, green, blue");
            }
        }

        let overruns = OVERRUNS.take();
        if overruns > 0 {
            rprintln!("{} tick overrun(s)", overruns);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);
    let hold = tick.period_multiple(COLOR_HOLD)?;

    let (b_port, b_pin) = exti::pin_for(BUTTON_B);
    let mut ledger = PinLedger::new();
    let red = ledger.claim(0, RED_BIT)?;
    let green_blue = ledger.claim(3, GREEN_BIT | BLUE_BIT)?;
    ledger.claim(BUTTON_A.port, BUTTON_A.mask())?;
    ledger.claim(b_port, bit(b_pin))?;

    board.pins.configure_pins(0, RED_BIT, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, RED_BIT, Direction::Output);
    board.pins.configure_pins(3, GREEN_BIT | BLUE_BIT, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(3, GREEN_BIT | BLUE_BIT, Direction::Output);
    board.pins.configure_pin(BUTTON_A.port, BUTTON_A.pin, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(BUTTON_A.port, BUTTON_A.mask(), Direction::Input);
    board.pins.configure_pin(b_port, b_pin, PinFunction::Alt1, PullMode::PullUp);

    let led = RgbLed::new(
        Output::new(board.ports.p0, red)?,
        Output::new(board.ports.p3, green_blue)?,
        GREEN_BIT,
        BLUE_BIT,
    )?;
    let player = PLAYER.init(ColorPlayer::new(led, &SEQUENCES, &REQUESTS, hold)?);
    player.off();

    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(1, player)?)?;
    SCHEDULER.put(scheduler);

    let play_warm = PLAY_WARM.init(PlaySequence::new(&REQUESTS, WARM));
    let play_primary = PLAY_PRIMARY.init(PlaySequence::new(&REQUESTS, PRIMARY));

    let pins = PINS.init(PinDispatcher::new(PinInterrupts::new(&mut board.gpioint)));
    pins.register(
        PinEdgeConfig {
            line: BUTTON_A,
            trigger: Trigger::RisingEdge,
        },
        play_warm,
    )?;

    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: BUTTON_B,
                trigger: Trigger::FallingEdge,
                priority: 0,
            },
            play_primary,
        )?;
        edges.register(
            EdgeConfig {
                line: PIN_CHANNEL,
                trigger: Trigger::RisingEdge,
                priority: 1,
            },
            pins,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 2);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("multi_seq: {} ticks per color", hold);

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
        let handled = EDGES.lock(|edges| edges.dispatch(line));
        if handled == Some(true) {
            FIRED.post(line);
        }
    }
}

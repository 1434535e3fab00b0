//! Counts debounced presses of the button on P0.0 (to ground, pull-up) and
//! shows the count modulo 16 on a seven-segment display on P2.0-P2.6.
//!
//! No scheduled tasks: SysTick only advances the ticker, and the idle loop
//! polls the button between `wfi`s.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use embedded_hal::digital::PinState;
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::debounce::{ButtonEvent, Debouncer};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit, bits};
use tick_tasks::sequence::{HEX_DIGITS, Sequence};
use tick_tasks::{ConfigError, TickConfig, TickDuration, Ticker};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, halt_on};

const TICK: TickDuration = TickDuration::millis(10);

const SEGMENTS: u32 = bits(7, 0);
const BUTTON_PIN: u8 = 0;

static TICKER: Ticker = Ticker::new(TICK);

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    let (mut display, mut digits) = match setup(&mut board) {
        Ok(parts) => parts,
        Err(err) => halt_on(err),
    };

    let mut button = Debouncer::new(board.ports.p0.input(BUTTON_PIN), PinState::Low, &TICKER);
    display.show(digits.current());

    loop {
        match button.wait_for_press(cortex_m::asm::wfi) {
            Ok(ButtonEvent::Pressed) => {
                display.show(digits.advance());
                rprintln!("digit {:X}", digits.cursor());
            }
            Err(never) => match never {},
        }
    }
}

fn setup(board: &mut Board) -> Result<(Output<GpioPort>, Sequence<u32>), ConfigError> {
    let tick = TickConfig::new(CORE_CLOCK_HZ, TICK);

    let mut ledger = PinLedger::new();
    let segments = ledger.claim(2, SEGMENTS)?;
    ledger.claim(0, bit(BUTTON_PIN))?;

    board.pins.configure_pins(2, SEGMENTS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(2, SEGMENTS, Direction::Output);
    board.pins.configure_pin(0, BUTTON_PIN, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, bit(BUTTON_PIN), Direction::Input);

    let display = Output::new(board.ports.p2, segments)?;
    let digits = Sequence::new(&HEX_DIGITS)?;

    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("hex_counter: {} ms tick, press P0.0", TICK.to_millis());

    Ok((display, digits))
}

#[exception]
fn SysTick() {
    TICKER.on_tick();
}

//! Counts down 0-F on a seven-segment display on P2.0-P2.6, one digit per
//! falling edge on EINT0 (P2.10). The display is updated inside the handler;
//! the idle loop only logs which line fired.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLatch, EdgeLine, Trigger};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit, bits};
use tick_tasks::sequence::{HEX_DIGITS, Sequence, Step, StepOnEdge};
use tick_tasks::ConfigError;
use tick_tasks_firmware::exti::{self, ExtInt};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const SEGMENTS: u32 = bits(7, 0);
const BUTTON: EdgeLine = EdgeLine::Eint0;

static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static FIRED: EdgeLatch = EdgeLatch::new();

static DIGIT: StaticCell<StepOnEdge<GpioPort>> = StaticCell::new();

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
            rprintln!("{:?}: count down", line);
        }
    }
}

fn setup(board: &mut Board) -> Result<(), ConfigError> {
    let (button_port, button_pin) = exti::pin_for(BUTTON);
    let mut ledger = PinLedger::new();
    let segments = ledger.claim(2, SEGMENTS)?;
    ledger.claim(button_port, bit(button_pin))?;

    board.pins.configure_pins(2, SEGMENTS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(2, SEGMENTS, Direction::Output);
    board.pins.configure_pin(button_port, button_pin, PinFunction::Alt1, PullMode::PullUp);

    let digit = DIGIT.init(StepOnEdge::new(
        Output::new(board.ports.p2, segments)?,
        Sequence::new(&HEX_DIGITS)?,
        Step::Backward,
    ));
    digit.show_current();

    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: BUTTON,
                trigger: Trigger::FallingEdge,
                priority: 0,
            },
            digit,
        )?;
        Ok(edges)
    })?;

    rprintln!("rev_count: press EINT0 to count down");
    Ok(())
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    if let Some(line) = exti::line_for_irq(irqn) {
        let handled = EDGES.with(|edges| edges.dispatch(line));
        if handled == Some(true) {
            FIRED.post(line);
        }
    }
}

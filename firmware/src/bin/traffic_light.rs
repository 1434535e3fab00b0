//! Traffic light on P0.0-P0.2 (car) and P0.4-P0.6 (pedestrian), one step
//! every 5 s. The pedestrian button on EINT0 (P2.10) jumps to car amber and
//! restarts the cycle from there.
#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use static_cell::StaticCell;

use tick_tasks::config::CORE_CLOCK_HZ;
use tick_tasks::edge::{EdgeConfig, EdgeDispatcher, EdgeLine, Trigger};
use tick_tasks::port::{Direction, Output, PinConfig, PinFunction, PinLedger, PullMode, bit};
use tick_tasks::shared::SharedCounter;
use tick_tasks::traffic::{LIGHT_BITS, PedestrianRequest, STEP_PERIOD, TRAFFIC_SEQ, TrafficLight, TrafficShared};
use tick_tasks::{ConfigError, PeriodicTask, Scheduler, TickConfig, TickDuration};
use tick_tasks_firmware::exti::{self, ExtInt, Irq, NvicGate};
use tick_tasks_firmware::gpio::GpioPort;
use tick_tasks_firmware::systick::SysTickSource;
use tick_tasks_firmware::{Board, IsrSlot, halt_on};

const TICK: TickDuration = TickDuration::millis(100);

const BUTTON: EdgeLine = EdgeLine::Eint0;

static SCHEDULER: IsrSlot<Scheduler<'static, 1>> = IsrSlot::new();
static EDGES: IsrSlot<EdgeDispatcher<'static, ExtInt, 1>> = IsrSlot::new();
static TRAFFIC: TrafficShared = TrafficShared::new();
static OVERRUNS: SharedCounter = SharedCounter::new(0);

static LIGHT: StaticCell<TrafficLight<'static, GpioPort, NvicGate>> = StaticCell::new();
static REQUEST: StaticCell<PedestrianRequest<'static, GpioPort, SysTickSource>> = StaticCell::new();

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let mut board = Board::init();

    if let Err(err) = setup(&mut board) {
        halt_on(err);
    }

    let mut requests = 0;
    loop {
        cortex_m::asm::wfi();

        let seen = TRAFFIC.requests();
        if seen != requests {
            requests = seen;
            rprintln!("pedestrian request #{}", requests);
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
    // the step task writes with the button line masked, the request overrides
    let (lights, request_lights) = ledger.claim(0, LIGHT_BITS)?.share_with_override();
    ledger.claim(button_port, bit(button_pin))?;

    board.pins.configure_pins(0, LIGHT_BITS, PinFunction::Gpio, PullMode::PullUp);
    board.pins.set_direction(0, LIGHT_BITS, Direction::Output);
    board.pins.configure_pin(button_port, button_pin, PinFunction::Alt1, PullMode::PullUp);

    let light = LIGHT.init(TrafficLight::new(
        Output::new(board.ports.p0, lights)?,
        &TRAFFIC_SEQ,
        &TRAFFIC,
        NvicGate(Irq::from(BUTTON)),
    )?);
    light.start();

    let mut scheduler = Scheduler::new().with_overrun_counter(&OVERRUNS);
    scheduler.add(PeriodicTask::new(step_every, light)?.with_restart(TRAFFIC.restart_flag()))?;
    SCHEDULER.put(scheduler);

    let request = REQUEST.init(PedestrianRequest::new(
        Output::overriding(board.ports.p0, request_lights)?,
        &TRAFFIC_SEQ,
        &TRAFFIC,
        SysTickSource,
    )?);
    let controller = ExtInt::new(&mut board.syscon);
    EDGES.install(move || -> Result<_, ConfigError> {
        let mut edges = EdgeDispatcher::new(controller);
        edges.register(
            EdgeConfig {
                line: BUTTON,
                trigger: Trigger::RisingEdge,
                priority: 0,
            },
            request,
        )?;
        Ok(edges)
    })?;

    SysTickSource::set_priority(&mut board.core.SCB, 1);
    SysTickSource::start(&mut board.core.SYST, &tick)?;
    rprintln!("traffic_light: step every {} ticks of {} ms", step_every, TICK.to_millis());

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

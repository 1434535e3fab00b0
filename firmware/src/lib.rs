//! LPC1769 glue for `tick_tasks`: register access, the SysTick and EINT
//! adapters, and what every program's `main` needs before it starts the tick.
#![no_std]

pub mod clock;
pub mod exti;
pub mod gpio;
pub mod lpc1769;
pub mod systick;

use core::cell::RefCell;

use critical_section::Mutex;
use rtt_target::rprintln;
use tick_tasks::ConfigError;

use gpio::{GpioPorts, PinSetup};
use lpc1769::{GpioInt, Peripherals, SysCon};

/// The LPC176x implements the top five priority bits.
pub const fn nvic_priority(level: u8) -> u8 {
    level << 3
}

/// A value owned by one interrupt handler.
///
/// The handler takes the value out in a short critical section, works on it
/// with interrupts enabled, and puts it back. A handler that finds the slot
/// empty returns without doing anything.
pub struct IsrSlot<T>(Mutex<RefCell<Option<T>>>);

impl<T> IsrSlot<T> {
    pub const fn new() -> Self {
        Self(Mutex::new(RefCell::new(None)))
    }

    pub fn put(&self, value: T) {
        critical_section::with(|cs| {
            self.0.borrow_ref_mut(cs).replace(value);
        });
    }

    /// Build and store the value with interrupts off, so a handler never
    /// fires against a half-configured value.
    pub fn install<E>(&self, build: impl FnOnce() -> Result<T, E>) -> Result<(), E> {
        critical_section::with(|cs| {
            let value = build()?;
            self.0.borrow_ref_mut(cs).replace(value);
            Ok(())
        })
    }

    /// Run `f` on the value with interrupts off.
    ///
    /// For a value shared by handlers of different priorities: a more urgent
    /// handler waits instead of finding the slot empty.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.0.borrow_ref_mut(cs).as_mut().map(f))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut value = critical_section::with(|cs| self.0.borrow_ref_mut(cs).take())?;
        let result = f(&mut value);
        critical_section::with(|cs| self.0.borrow_ref_mut(cs).replace(value));
        Some(result)
    }
}

impl<T> Default for IsrSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Board {
    pub core: cortex_m::Peripherals,
    pub ports: GpioPorts,
    pub pins: PinSetup,
    pub syscon: SysCon,
    pub gpioint: GpioInt,
}

impl Board {
    /// Take the peripherals and bring the core clock up to 100 MHz.
    pub fn init() -> Self {
        let core = cortex_m::Peripherals::take().unwrap();
        let dp = Peripherals::take().unwrap();

        let mut syscon = dp.syscon;
        clock::init_100mhz(&mut syscon);

        Self {
            core,
            ports: dp.gpio.split(),
            pins: PinSetup::new(dp.pincon),
            syscon,
            gpioint: dp.gpioint,
        }
    }
}

/// Log a setup error over RTT and stop.
pub fn halt_on(err: ConfigError) -> ! {
    rprintln!("configuration error: {}", err);
    panic!("halted on configuration error");
}

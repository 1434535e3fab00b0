//! Fast GPIO ports and pin multiplexing.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin};
use tick_tasks::port::{Direction, PinConfig, PinFunction, Port, PullMode, bit};

use crate::lpc1769::{Gpio, GpioBlock, PinConnect, gpio_block, pincon_block};

/// One GPIO port. Writes go through FIOSET and FIOCLR, so any number of
/// handles can drive disjoint bits of the same port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPort {
    id: u8,
}

impl GpioPort {
    fn regs(&self) -> &'static GpioBlock {
        gpio_block(self.id)
    }

    pub fn input(self, pin: u8) -> InputBit {
        InputBit { port: self, pin }
    }
}

impl Port for GpioPort {
    fn id(&self) -> u8 {
        self.id
    }

    fn read(&self) -> u32 {
        self.regs().fiopin.read()
    }

    fn set(&self, mask: u32) {
        unsafe { self.regs().fioset.write(mask) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.regs().fioclr.write(mask) }
    }
}

pub struct GpioPorts {
    pub p0: GpioPort,
    pub p1: GpioPort,
    pub p2: GpioPort,
    pub p3: GpioPort,
    pub p4: GpioPort,
}

impl Gpio {
    pub fn split(self) -> GpioPorts {
        GpioPorts {
            p0: GpioPort { id: 0 },
            p1: GpioPort { id: 1 },
            p2: GpioPort { id: 2 },
            p3: GpioPort { id: 3 },
            p4: GpioPort { id: 4 },
        }
    }
}

/// A single input pin read through FIOPIN.
#[derive(Debug, Clone, Copy)]
pub struct InputBit {
    port: GpioPort,
    pin: u8,
}

impl ErrorType for InputBit {
    type Error = Infallible;
}

impl InputPin for InputBit {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.port.read() & bit(self.pin) != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.port.read() & bit(self.pin) == 0)
    }
}

/// Startup-only pin setup: PINSEL, PINMODE and FIODIR.
pub struct PinSetup {
    _pincon: PinConnect,
}

impl PinSetup {
    pub fn new(pincon: PinConnect) -> Self {
        Self { _pincon: pincon }
    }
}

/// Register index and bit offset of a pin's two-bit field.
fn field(port: u8, pin: u8) -> (usize, u32) {
    (port as usize * 2 + pin as usize / 16, (pin as u32 % 16) * 2)
}

impl PinConfig for PinSetup {
    fn configure_pin(&mut self, port: u8, pin: u8, function: PinFunction, pull: PullMode) {
        let (index, shift) = field(port, pin);
        let regs = pincon_block();

        let function: u32 = match function {
            PinFunction::Gpio => 0b00,
            PinFunction::Alt1 => 0b01,
            PinFunction::Alt2 => 0b10,
            PinFunction::Alt3 => 0b11,
        };
        let pull: u32 = match pull {
            PullMode::PullUp => 0b00,
            PullMode::Repeater => 0b01,
            PullMode::Tristate => 0b10,
            PullMode::PullDown => 0b11,
        };

        let (Some(sel), Some(mode)) = (regs.pinsel.get(index), regs.pinmode.get(index)) else {
            return;
        };

        unsafe {
            sel.modify(|v| (v & !(0b11 << shift)) | (function << shift));
            mode.modify(|v| (v & !(0b11 << shift)) | (pull << shift));
        }
    }

    fn set_direction(&mut self, port: u8, mask: u32, direction: Direction) {
        let regs = gpio_block(port);
        unsafe {
            match direction {
                Direction::Output => regs.fiodir.modify(|v| v | mask),
                Direction::Input => regs.fiodir.modify(|v| v & !mask),
            }
        }
    }
}

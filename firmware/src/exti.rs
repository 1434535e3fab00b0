//! EINT0..EINT3 through the system control block and the NVIC, and the GPIO
//! pin interrupts that share the EINT3 vector.

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use tick_tasks::edge::{EdgeController, EdgeLine, Trigger};
use tick_tasks::pin_edge::{PinController, PinLine};
use tick_tasks::shared::InterruptGate;

use crate::lpc1769::{GpioInt, GpioIntPort, SysCon, gpioint_block, sc_block};
use crate::nvic_priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Irq {
    Eint0 = 18,
    Eint1 = 19,
    Eint2 = 20,
    Eint3 = 21,
}

// SAFETY: the discriminants are the LPC176x IRQ numbers of the four lines
unsafe impl InterruptNumber for Irq {
    fn number(self) -> u16 {
        self as u16
    }
}

impl From<EdgeLine> for Irq {
    fn from(line: EdgeLine) -> Self {
        match line {
            EdgeLine::Eint0 => Irq::Eint0,
            EdgeLine::Eint1 => Irq::Eint1,
            EdgeLine::Eint2 => Irq::Eint2,
            EdgeLine::Eint3 => Irq::Eint3,
        }
    }
}

/// The line behind an IRQ number handed to `DefaultHandler`.
pub fn line_for_irq(irqn: i16) -> Option<EdgeLine> {
    let index = irqn.checked_sub(Irq::Eint0 as i16)?;
    EdgeLine::from_index(usize::try_from(index).ok()?)
}

/// Port and pin that carry a line as their first alternate function.
pub const fn pin_for(line: EdgeLine) -> (u8, u8) {
    (2, 10 + line.index() as u8)
}

/// The external interrupt controller. One handle per dispatcher; every line
/// is touched only through the handle that registered it.
pub struct ExtInt {
    _private: (),
}

impl ExtInt {
    pub fn new(_syscon: &mut SysCon) -> Self {
        Self { _private: () }
    }
}

impl EdgeController for ExtInt {
    fn configure(&mut self, line: EdgeLine, trigger: Trigger) {
        let sc = sc_block();
        let mask = 1 << line.index();

        // mode and polarity only change with the line masked
        NVIC::mask(Irq::from(line));
        let (edge, high) = match trigger {
            Trigger::RisingEdge => (true, true),
            Trigger::FallingEdge => (true, false),
            Trigger::LowLevel => (false, false),
            Trigger::HighLevel => (false, true),
        };
        unsafe {
            sc.extmode.modify(|v| if edge { v | mask } else { v & !mask });
            sc.extpolar.modify(|v| if high { v | mask } else { v & !mask });
        }
    }

    fn clear_pending(&mut self, line: EdgeLine) {
        // write one to clear
        unsafe { sc_block().extint.write(1 << line.index()) }
        NVIC::unpend(Irq::from(line));
    }

    /// EINT3 also counts as pending while any GPIO pin interrupt is.
    fn is_pending(&self, line: EdgeLine) -> bool {
        sc_block().extint.read() & (1 << line.index()) != 0
            || (line == EdgeLine::Eint3 && gpioint_block().status.read() != 0)
    }

    fn enable(&mut self, line: EdgeLine, priority: u8) {
        let irq = Irq::from(line);
        unsafe {
            let mut nvic = cortex_m::Peripherals::steal().NVIC;
            nvic.set_priority(irq, nvic_priority(priority));
            NVIC::unmask(irq);
        }
    }

    fn disable(&mut self, line: EdgeLine) {
        NVIC::mask(Irq::from(line));
    }
}

/// Rising and falling edge interrupts of single pins on ports 0 and 2.
pub struct PinInterrupts {
    _private: (),
}

impl PinInterrupts {
    pub fn new(_gpioint: &mut GpioInt) -> Self {
        Self { _private: () }
    }

    fn regs(port: u8) -> Option<&'static GpioIntPort> {
        let block = gpioint_block();
        match port {
            0 => Some(&block.io0),
            2 => Some(&block.io2),
            _ => None,
        }
    }
}

impl PinController for PinInterrupts {
    fn enable(&mut self, line: PinLine, trigger: Trigger) {
        let Some(regs) = Self::regs(line.port) else {
            return;
        };
        let mask = line.mask();
        unsafe {
            match trigger {
                Trigger::RisingEdge => regs.en_r.modify(|v| v | mask),
                Trigger::FallingEdge => regs.en_f.modify(|v| v | mask),
                Trigger::LowLevel | Trigger::HighLevel => {}
            }
        }
    }

    fn disable(&mut self, line: PinLine) {
        if let Some(regs) = Self::regs(line.port) {
            let mask = line.mask();
            unsafe {
                regs.en_r.modify(|v| v & !mask);
                regs.en_f.modify(|v| v & !mask);
            }
        }
    }

    fn is_pending(&self, line: PinLine, trigger: Trigger) -> bool {
        let Some(regs) = Self::regs(line.port) else {
            return false;
        };
        let status = match trigger {
            Trigger::RisingEdge => regs.stat_r.read(),
            Trigger::FallingEdge => regs.stat_f.read(),
            Trigger::LowLevel | Trigger::HighLevel => 0,
        };
        status & line.mask() != 0
    }

    fn clear_pending(&mut self, line: PinLine) {
        if let Some(regs) = Self::regs(line.port) {
            // clears both edges of the pin
            unsafe { regs.clr.write(line.mask()) }
        }
    }
}

/// Holds off one EINT line for the length of a [`tick_tasks::shared::with_masked`]
/// section. Requests raised meanwhile stay pending and are taken afterwards.
#[derive(Debug, Clone, Copy)]
pub struct NvicGate(pub Irq);

impl InterruptGate for NvicGate {
    fn mask(&self) -> bool {
        let was_masked = !NVIC::is_enabled(self.0);
        NVIC::mask(self.0);
        was_masked
    }

    fn unmask(&self) {
        unsafe { NVIC::unmask(self.0) }
    }
}

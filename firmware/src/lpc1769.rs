//! The handful of LPC1769 register blocks the programs touch.

use core::mem::offset_of;

use portable_atomic::{AtomicBool, Ordering};
use volatile_register::{RO, RW, WO};

pub const GPIO_BASE: usize = 0x2009_C000;
pub const GPIO_STRIDE: usize = 0x20;
pub const GPIOINT_BASE: usize = 0x4002_8080;
pub const PINCON_BASE: usize = 0x4002_C000;
pub const SC_BASE: usize = 0x400F_C000;

/// Fast GPIO, one block per port.
#[repr(C)]
pub struct GpioBlock {
    pub fiodir: RW<u32>,
    _reserved0: [u32; 3],
    pub fiomask: RW<u32>,
    pub fiopin: RW<u32>,
    pub fioset: RW<u32>,
    pub fioclr: WO<u32>,
}

/// Rising and falling edge interrupt registers of one port.
#[repr(C)]
pub struct GpioIntPort {
    pub stat_r: RO<u32>,
    pub stat_f: RO<u32>,
    pub clr: WO<u32>,
    pub en_r: RW<u32>,
    pub en_f: RW<u32>,
}

/// GPIO interrupts. Only ports 0 and 2 have them.
#[repr(C)]
pub struct GpioIntBlock {
    pub status: RO<u32>,
    pub io0: GpioIntPort,
    _reserved0: [u32; 3],
    pub io2: GpioIntPort,
}

/// Pin function select and pull resistor mode, two bits per pin.
#[repr(C)]
pub struct PinConnectBlock {
    pub pinsel: [RW<u32>; 11],
    _reserved0: [u32; 5],
    pub pinmode: [RW<u32>; 10],
}

/// System control: flash timing, PLL0, clock dividers, external interrupts.
#[repr(C)]
pub struct SystemControlBlock {
    pub flashcfg: RW<u32>,
    _reserved0: [u32; 31],
    pub pll0con: RW<u32>,
    pub pll0cfg: RW<u32>,
    pub pll0stat: RO<u32>,
    pub pll0feed: WO<u32>,
    _reserved1: [u32; 29],
    pub cclkcfg: RW<u32>,
    _usbclkcfg: u32,
    pub clksrcsel: RW<u32>,
    _reserved2: [u32; 12],
    pub extint: RW<u32>,
    _reserved3: u32,
    pub extmode: RW<u32>,
    pub extpolar: RW<u32>,
    _reserved4: [u32; 20],
    pub scs: RW<u32>,
    _reserved5: u32,
    pub pclksel0: RW<u32>,
    pub pclksel1: RW<u32>,
}

const _: () = {
    assert!(core::mem::size_of::<GpioBlock>() == GPIO_STRIDE);
    assert!(offset_of!(GpioBlock, fiomask) == 0x10);
    assert!(offset_of!(GpioBlock, fioclr) == 0x1C);
    assert!(offset_of!(GpioIntPort, en_f) == 0x10);
    assert!(offset_of!(GpioIntBlock, io0) == 0x04);
    assert!(offset_of!(GpioIntBlock, io2) == 0x24);
    assert!(offset_of!(PinConnectBlock, pinmode) == 0x40);
    assert!(offset_of!(SystemControlBlock, pll0con) == 0x080);
    assert!(offset_of!(SystemControlBlock, pll0feed) == 0x08C);
    assert!(offset_of!(SystemControlBlock, cclkcfg) == 0x104);
    assert!(offset_of!(SystemControlBlock, clksrcsel) == 0x10C);
    assert!(offset_of!(SystemControlBlock, extint) == 0x140);
    assert!(offset_of!(SystemControlBlock, extpolar) == 0x14C);
    assert!(offset_of!(SystemControlBlock, scs) == 0x1A0);
    assert!(offset_of!(SystemControlBlock, pclksel1) == 0x1AC);
};

pub(crate) fn gpio_block(port: u8) -> &'static GpioBlock {
    // SAFETY: ports 0-4 are mapped at fixed addresses, and every register
    // write the crate makes is a single volatile store
    unsafe { &*((GPIO_BASE + port as usize * GPIO_STRIDE) as *const GpioBlock) }
}

pub(crate) fn gpioint_block() -> &'static GpioIntBlock {
    unsafe { &*(GPIOINT_BASE as *const GpioIntBlock) }
}

pub(crate) fn pincon_block() -> &'static PinConnectBlock {
    unsafe { &*(PINCON_BASE as *const PinConnectBlock) }
}

pub(crate) fn sc_block() -> &'static SystemControlBlock {
    unsafe { &*(SC_BASE as *const SystemControlBlock) }
}

/// The GPIO ports.
pub struct Gpio {
    _private: (),
}

/// The GPIO interrupt registers.
pub struct GpioInt {
    _private: (),
}

/// PINSEL and PINMODE.
pub struct PinConnect {
    _private: (),
}

/// The system control block.
pub struct SysCon {
    _private: (),
}

pub struct Peripherals {
    pub gpio: Gpio,
    pub gpioint: GpioInt,
    pub pincon: PinConnect,
    pub syscon: SysCon,
}

static TAKEN: AtomicBool = AtomicBool::new(false);

impl Peripherals {
    /// The device peripherals, once.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }

        Some(Self {
            gpio: Gpio { _private: () },
            gpioint: GpioInt { _private: () },
            pincon: PinConnect { _private: () },
            syscon: SysCon { _private: () },
        })
    }
}

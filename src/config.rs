//! Board-wide configuration constants.

use crate::ticker::TickDuration;

/// Core clock after the PLL is locked, in Hz.
pub const CORE_CLOCK_HZ: u32 = 100_000_000;

/// SysTick is a 24-bit down counter.
pub const SYSTICK_MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Upper bound for a scheduler's task table. One bit per task in [`crate::scheduler::Fired`].
pub const MAX_TASKS: usize = 32;

/// Number of external interrupt lines (EINT0..EINT3).
pub const EDGE_LINES: usize = 4;

/// Settle time between the first and the confirming sample of a button.
pub const DEBOUNCE_SETTLE: TickDuration = TickDuration::millis(50);

/// Number of 32-bit GPIO ports on the part.
pub const GPIO_PORTS: usize = 5;

/// Pins that can raise a GPIO edge interrupt, one mask per port. Only ports 0
/// and 2 have them, and all of them share the EINT3 vector.
pub const PIN_INTERRUPT_PINS: [u32; GPIO_PORTS] = [0x7FFF_8FFF, 0, 0x0000_3FFF, 0, 0];

//! Core clock bring-up: 12 MHz main oscillator through PLL0 to 100 MHz.

use crate::lpc1769::{SysCon, SystemControlBlock, sc_block};

const SCS_OSCEN: u32 = 1 << 5;
const SCS_OSCSTAT: u32 = 1 << 6;
const CLKSRC_MAIN_OSC: u32 = 1;
/// Divide the 400 MHz PLL output by 4.
const CCLK_DIV_4: u32 = 4 - 1;
/// Fcco = 2 * M * 12 MHz / N with M = 100, N = 6. Both fields hold value - 1.
const PLL0_M_N: u32 = ((6 - 1) << 16) | (100 - 1);
const PLL0_ENABLE: u32 = 1 << 0;
const PLL0_CONNECT: u32 = 1 << 1;
const PLL0STAT_ENABLED: u32 = 1 << 24;
const PLL0STAT_CONNECTED: u32 = 1 << 25;
const PLL0STAT_LOCK: u32 = 1 << 26;
/// Five flash wait states; the part needs them above 80 MHz.
const FLASHTIM_5_CLK: u32 = 0x4 << 12;
const FLASHTIM_MASK: u32 = 0xF << 12;

fn feed(sc: &SystemControlBlock) {
    unsafe {
        sc.pll0feed.write(0xAA);
        sc.pll0feed.write(0x55);
    }
}

/// Run the core at 100 MHz with all peripheral clocks at CCLK/4.
pub fn init_100mhz(_syscon: &mut SysCon) {
    let sc = sc_block();

    unsafe {
        sc.scs.write(SCS_OSCEN);
    }
    while sc.scs.read() & SCS_OSCSTAT == 0 {}

    unsafe {
        sc.cclkcfg.write(CCLK_DIV_4);
        sc.pclksel0.write(0);
        sc.pclksel1.write(0);
        sc.clksrcsel.write(CLKSRC_MAIN_OSC);
        sc.flashcfg.modify(|v| (v & !FLASHTIM_MASK) | FLASHTIM_5_CLK);

        sc.pll0cfg.write(PLL0_M_N);
    }
    feed(sc);

    unsafe {
        sc.pll0con.write(PLL0_ENABLE);
    }
    feed(sc);
    while sc.pll0stat.read() & PLL0STAT_LOCK == 0 {}

    unsafe {
        sc.pll0con.write(PLL0_ENABLE | PLL0_CONNECT);
    }
    feed(sc);
    while sc.pll0stat.read() & (PLL0STAT_ENABLED | PLL0STAT_CONNECTED)
        != (PLL0STAT_ENABLED | PLL0STAT_CONNECTED)
    {}
}

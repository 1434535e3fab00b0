//! SysTick as the scheduler's tick source.

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use tick_tasks::{ConfigError, TickConfig, TickSource};

use crate::nvic_priority;

/// Handle used by interrupt handlers to restart the running SysTick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickSource;

impl SysTickSource {
    /// Validate `config`, then program and start the counter with its
    /// interrupt enabled. Nothing is written if the reload doesn't fit.
    pub fn start(syst: &mut SYST, config: &TickConfig) -> Result<Self, ConfigError> {
        let reload = config.reload()?;

        syst.disable_counter();
        syst.set_reload(reload);
        syst.clear_current();
        syst.set_clock_source(SystClkSource::Core);
        syst.enable_interrupt();
        syst.enable_counter();

        Ok(SysTickSource)
    }

    pub fn set_priority(scb: &mut SCB, level: u8) {
        unsafe { scb.set_priority(SystemHandler::SysTick, nvic_priority(level)) }
    }
}

impl TickSource for SysTickSource {
    fn restart(&mut self) {
        // any write clears the current value and COUNTFLAG
        unsafe { (*SYST::PTR).cvr.write(0) }
        SCB::clear_pendst();
    }

    fn tick_pending(&self) -> bool {
        SCB::is_pendst_pending()
    }
}

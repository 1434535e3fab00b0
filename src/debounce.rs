//! Confirm-then-wait button debouncing, polled from the idle loop.

use embedded_hal::digital::{InputPin, PinState};

use crate::config::DEBOUNCE_SETTLE;
use crate::ticker::{TickDuration, TickTimer, Ticker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
}

enum ButtonState<'a> {
    WaitForPress,
    Settle(TickTimer<'a>),
    WaitForRelease,
}

/// Reports one [`ButtonEvent::Pressed`] per press, on release.
///
/// A press has to still be active after the settle time to count; shorter
/// glitches are dropped. Never call from an interrupt handler: it relies on
/// the ticker advancing underneath it.
pub struct Debouncer<'a, I: InputPin> {
    input: I,
    active: PinState,
    settle: TickDuration,
    state: ButtonState<'a>,
    ticker: &'a Ticker,
}

impl<'a, I: InputPin> Debouncer<'a, I> {
    /// `active` is the level of a pressed button: `Low` for a switch to
    /// ground with a pull-up.
    pub fn new(input: I, active: PinState, ticker: &'a Ticker) -> Self {
        Self {
            input,
            active,
            settle: DEBOUNCE_SETTLE,
            state: ButtonState::WaitForPress,
            ticker,
        }
    }

    pub fn with_settle(mut self, settle: TickDuration) -> Self {
        self.settle = settle;
        self
    }

    pub fn release(self) -> I {
        self.input
    }

    fn pressed(&mut self) -> Result<bool, I::Error> {
        match self.active {
            PinState::Low => self.input.is_low(),
            PinState::High => self.input.is_high(),
        }
    }

    pub fn poll(&mut self) -> nb::Result<ButtonEvent, I::Error> {
        loop {
            match self.state {
                ButtonState::WaitForPress => {
                    if self.pressed()? {
                        let mut timer = TickTimer::new(self.settle, self.ticker);
                        timer.start();
                        self.state = ButtonState::Settle(timer);
                        continue;
                    }
                }
                ButtonState::Settle(ref timer) => {
                    if timer.is_ready() {
                        self.state = if self.pressed()? {
                            ButtonState::WaitForRelease
                        } else {
                            ButtonState::WaitForPress
                        };
                        continue;
                    }
                }
                ButtonState::WaitForRelease => {
                    if !self.pressed()? {
                        self.state = ButtonState::WaitForPress;
                        return Ok(ButtonEvent::Pressed);
                    }
                }
            }

            break;
        }

        Err(nb::Error::WouldBlock)
    }

    /// Block in `idle` until a full press has been seen.
    pub fn wait_for_press<F: FnMut()>(&mut self, mut idle: F) -> Result<ButtonEvent, I::Error> {
        loop {
            match self.poll() {
                Ok(event) => return Ok(event),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => idle(),
            }
        }
    }
}

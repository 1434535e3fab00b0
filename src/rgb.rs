//! Color sequences on an active-low RGB LED, requested by edges and played by
//! a tick task.
//!
//! Edge handlers only post which sequence to play. The [`ColorPlayer`] task
//! is the sole writer of the LED: it starts a posted sequence on the next
//! tick, holds each color for a fixed number of ticks and then turns the LED
//! off. A request that arrives mid-sequence replaces it.

use crate::edge::{EdgeHandler, EdgeLine};
use crate::error::ConfigError;
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::SharedCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Color {
    pub const fn new(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }
}

pub const OFF: Color = Color::new(false, false, false);
pub const RED: Color = Color::new(true, false, false);
pub const GREEN: Color = Color::new(false, true, false);
pub const BLUE: Color = Color::new(false, false, true);
pub const CYAN: Color = Color::new(false, true, true);
pub const MAGENTA: Color = Color::new(true, false, true);
pub const YELLOW: Color = Color::new(true, true, false);
pub const WHITE: Color = Color::new(true, true, true);

pub const WARM_SEQ: [Color; 3] = [YELLOW, CYAN, MAGENTA];
pub const PRIMARY_SEQ: [Color; 3] = [RED, GREEN, BLUE];

/// Three LED channels wired active low, red on one port and green and blue on
/// another.
pub struct RgbLed<R: Port, GB: Port> {
    red: Output<R>,
    green_blue: Output<GB>,
    green: u32,
    blue: u32,
}

impl<R: Port, GB: Port> RgbLed<R, GB> {
    /// `green` and `blue` pick the two channels out of `green_blue`'s mask.
    pub fn new(red: Output<R>, green_blue: Output<GB>, green: u32, blue: u32) -> Result<Self, ConfigError> {
        let owned = green_blue.mask();
        if green == 0 || blue == 0 || green & blue != 0 || (green | blue) != owned {
            return Err(ConfigError::InvalidChannels { owned, green, blue });
        }

        Ok(Self {
            red,
            green_blue,
            green,
            blue,
        })
    }

    pub fn show(&mut self, color: Color) {
        // a low pin lights its channel
        if color.red {
            self.red.clear_all();
        } else {
            self.red.set_all();
        }

        let mut dark = 0;
        if !color.green {
            dark |= self.green;
        }
        if !color.blue {
            dark |= self.blue;
        }
        self.green_blue.show(dark);
    }

    pub fn off(&mut self) {
        self.show(OFF);
    }
}

/// The most recently requested sequence, posted from edge context.
pub struct ColorRequests(SharedCounter);

impl ColorRequests {
    pub const fn new() -> Self {
        Self(SharedCounter::new(0))
    }

    pub fn post(&self, sequence: usize) {
        self.0.store(sequence as u32 + 1);
    }

    pub fn take(&self) -> Option<usize> {
        self.0.take().checked_sub(1).map(|index| index as usize)
    }
}

impl Default for ColorRequests {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge body: ask for one sequence.
pub struct PlaySequence<'a> {
    requests: &'a ColorRequests,
    sequence: usize,
}

impl<'a> PlaySequence<'a> {
    pub fn new(requests: &'a ColorRequests, sequence: usize) -> Self {
        Self { requests, sequence }
    }
}

impl EdgeHandler for PlaySequence<'_> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.requests.post(self.sequence);
    }
}

struct Playing {
    sequence: usize,
    step: usize,
    left: u32,
}

/// Runs every tick and owns the LED.
pub struct ColorPlayer<'a, R: Port, GB: Port> {
    led: RgbLed<R, GB>,
    sequences: &'static [&'static [Color]],
    requests: &'a ColorRequests,
    hold: u32,
    playing: Option<Playing>,
    played: u32,
}

impl<'a, R: Port, GB: Port> ColorPlayer<'a, R, GB> {
    /// Each color stays on for `hold` ticks.
    pub fn new(
        led: RgbLed<R, GB>,
        sequences: &'static [&'static [Color]],
        requests: &'a ColorRequests,
        hold: u32,
    ) -> Result<Self, ConfigError> {
        if sequences.is_empty() || sequences.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::EmptyTable);
        }
        if hold == 0 {
            return Err(ConfigError::ZeroPeriodMultiple);
        }

        Ok(Self {
            led,
            sequences,
            requests,
            hold,
            playing: None,
            played: 0,
        })
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    /// Sequences started so far.
    pub fn played(&self) -> u32 {
        self.played
    }

    pub fn off(&mut self) {
        self.led.off();
    }
}

impl<R: Port, GB: Port> TaskBody for ColorPlayer<'_, R, GB> {
    fn run(&mut self) {
        if let Some(sequence) = self.requests.take() {
            if let Some(colors) = self.sequences.get(sequence) {
                self.led.show(colors[0]);
                self.playing = Some(Playing {
                    sequence,
                    step: 0,
                    left: self.hold,
                });
                self.played = self.played.wrapping_add(1);
                return;
            }
        }

        let Some(playing) = self.playing.as_mut() else {
            return;
        };

        playing.left -= 1;
        if playing.left > 0 {
            return;
        }

        let colors = self.sequences[playing.sequence];
        playing.step += 1;
        if let Some(&color) = colors.get(playing.step) {
            self.led.show(color);
            playing.left = self.hold;
        } else {
            self.led.off();
            self.playing = None;
        }
    }
}

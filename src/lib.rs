//! Cooperative periodic tasks on a single timer tick, with edge-triggered
//! external interrupts feeding shared state.
//!
//! Everything in here is hardware-agnostic: the timer, the GPIO ports and the
//! external interrupt controller are reached through the traits in [`ticker`],
//! [`port`] and [`edge`]. The `firmware` crate implements those traits for the
//! LPC1769 and wires the pieces into interrupt handlers.
#![cfg_attr(not(test), no_std)]

pub mod barrier;
pub mod config;
pub mod debounce;
pub mod edge;
pub mod error;
pub mod period;
pub mod pin_edge;
pub mod port;
pub mod pulse;
pub mod rgb;
pub mod scheduler;
pub mod sequence;
pub mod shared;
pub mod tasks;
pub mod ticker;
pub mod traffic;

#[cfg(test)]
mod testing;

pub use error::ConfigError;
pub use scheduler::{PeriodicTask, Scheduler, TaskBody};
pub use ticker::{TickConfig, TickDuration, TickInstant, TickSource, Ticker};

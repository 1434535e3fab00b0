//! Parking barrier with a vehicle sensor, a permit input and a timing button.
//!
//! A rising edge from the vehicle sensor opens the barrier when the permit
//! input is high and lights the reject LED otherwise. A tick task closes the
//! barrier once it has been open for the current open time. Pressing the
//! timing button opens a counting window; the presses counted when the window
//! closes select the open time used from then on.

use embedded_hal::digital::InputPin;

use crate::edge::{EdgeHandler, EdgeLine};
use crate::port::{Output, Port};
use crate::scheduler::TaskBody;
use crate::shared::{InterruptGate, SharedCounter, SharedFlag, with_masked};

/// Length of the press window, in runs of [`BarrierTimer`].
pub const WINDOW_TICKS: u32 = 15;

/// Open time before any window has closed, in runs of [`BarrierTimer`].
pub const DEFAULT_OPEN_TICKS: u32 = 25;

/// Open time selected by the presses counted in one window.
pub const fn open_ticks_for(presses: u32) -> u32 {
    match presses {
        2 => 50,
        3 => 100,
        4 => 200,
        _ => DEFAULT_OPEN_TICKS,
    }
}

pub struct BarrierShared {
    open: SharedFlag,
    /// Timer runs since the barrier last opened.
    open_for: SharedCounter,
    open_ticks: SharedCounter,
    window: SharedFlag,
    window_ticks: SharedCounter,
    presses: SharedCounter,
    openings: SharedCounter,
    rejections: SharedCounter,
}

impl BarrierShared {
    pub const fn new() -> Self {
        Self {
            open: SharedFlag::new(false),
            open_for: SharedCounter::new(0),
            open_ticks: SharedCounter::new(DEFAULT_OPEN_TICKS),
            window: SharedFlag::new(false),
            window_ticks: SharedCounter::new(0),
            presses: SharedCounter::new(0),
            openings: SharedCounter::new(0),
            rejections: SharedCounter::new(0),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn open_ticks(&self) -> u32 {
        self.open_ticks.get()
    }

    pub fn is_counting(&self) -> bool {
        self.window.get()
    }

    pub fn presses(&self) -> u32 {
        self.presses.get()
    }

    pub fn openings(&self) -> u32 {
        self.openings.get()
    }

    pub fn rejections(&self) -> u32 {
        self.rejections.get()
    }
}

impl Default for BarrierShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge body for the vehicle sensor.
///
/// A rejection leaves an already open barrier on its timer.
pub struct VehicleArrival<'a, P: Port, L: Port, I: InputPin> {
    barrier: Output<P>,
    reject: Output<L>,
    permit: I,
    shared: &'a BarrierShared,
}

impl<'a, P: Port, L: Port, I: InputPin> VehicleArrival<'a, P, L, I> {
    pub fn new(barrier: Output<P>, reject: Output<L>, permit: I, shared: &'a BarrierShared) -> Self {
        Self {
            barrier,
            reject,
            permit,
            shared,
        }
    }
}

impl<P: Port, L: Port, I: InputPin> EdgeHandler for VehicleArrival<'_, P, L, I> {
    fn on_edge(&mut self, _line: EdgeLine) {
        self.reject.clear_all();

        // an unreadable permit input counts as no permit
        if self.permit.is_high().unwrap_or(false) {
            self.barrier.set_all();
            self.shared.open_for.store(0);
            self.shared.open.set(true);
            self.shared.openings.increment();
        } else {
            self.reject.set_all();
            self.shared.rejections.increment();
        }
    }
}

/// Edge body for the timing button: the first press opens the window, every
/// press inside it is counted.
pub struct TimingPress<'a> {
    shared: &'a BarrierShared,
}

impl<'a> TimingPress<'a> {
    pub fn new(shared: &'a BarrierShared) -> Self {
        Self { shared }
    }
}

impl EdgeHandler for TimingPress<'_> {
    fn on_edge(&mut self, _line: EdgeLine) {
        if self.shared.window.get() {
            self.shared.presses.increment();
        } else {
            self.shared.presses.store(1);
            self.shared.window_ticks.store(0);
            self.shared.window.set(true);
        }
    }
}

/// Periodic body: times the open barrier and the press window.
///
/// `vehicle` masks the sensor line while the barrier timer is updated and
/// `button` masks the pin channel while the window is.
pub struct BarrierTimer<'a, P: Port, V: InterruptGate, B: InterruptGate> {
    barrier: Output<P>,
    shared: &'a BarrierShared,
    vehicle: V,
    button: B,
}

impl<'a, P: Port, V: InterruptGate, B: InterruptGate> BarrierTimer<'a, P, V, B> {
    pub fn new(barrier: Output<P>, shared: &'a BarrierShared, vehicle: V, button: B) -> Self {
        Self {
            barrier,
            shared,
            vehicle,
            button,
        }
    }

    pub fn close(&mut self) {
        self.barrier.clear_all();
    }
}

impl<P: Port, V: InterruptGate, B: InterruptGate> TaskBody for BarrierTimer<'_, P, V, B> {
    fn run(&mut self) {
        let shared = self.shared;
        let barrier = &mut self.barrier;

        with_masked(&self.vehicle, || {
            if !shared.open.get() {
                return;
            }
            if shared.open_for.increment() >= shared.open_ticks.get() {
                barrier.clear_all();
                shared.open.set(false);
                shared.open_for.store(0);
            }
        });

        with_masked(&self.button, || {
            if !shared.window.get() {
                return;
            }
            if shared.window_ticks.increment() >= WINDOW_TICKS {
                shared.window.set(false);
                shared.window_ticks.store(0);
                shared.open_ticks.store(open_ticks_for(shared.presses.take()));
            }
        });
    }
}

//! GPIO ports as seen by tasks and handlers, and static ownership of their bits.

use crate::config::GPIO_PORTS;
use crate::error::ConfigError;

/// One 32-bit GPIO port with atomic set/clear registers.
///
/// Writing through `set` and `clear` only touches the bits given, so two
/// owners of disjoint masks never interfere even without a critical section.
pub trait Port {
    fn id(&self) -> u8;
    fn read(&self) -> u32;
    fn set(&self, mask: u32);
    fn clear(&self, mask: u32);
}

impl<P: Port + ?Sized> Port for &P {
    fn id(&self) -> u8 {
        (**self).id()
    }

    fn read(&self) -> u32 {
        (**self).read()
    }

    fn set(&self, mask: u32) {
        (**self).set(mask)
    }

    fn clear(&self, mask: u32) {
        (**self).clear(mask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFunction {
    Gpio,
    Alt1,
    Alt2,
    Alt3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    PullUp,
    Repeater,
    Tristate,
    PullDown,
}

/// Pin multiplexing and direction, done once at startup.
pub trait PinConfig {
    fn configure_pin(&mut self, port: u8, pin: u8, function: PinFunction, pull: PullMode);
    fn set_direction(&mut self, port: u8, mask: u32, direction: Direction);

    fn configure_pins(&mut self, port: u8, mask: u32, function: PinFunction, pull: PullMode) {
        for pin in 0..32 {
            if mask & bit(pin) != 0 {
                self.configure_pin(port, pin, function, pull);
            }
        }
    }
}

pub const fn bit(n: u8) -> u32 {
    1 << n
}

/// `width` consecutive bits starting at `shift`.
pub const fn bits(width: u8, shift: u8) -> u32 {
    if width >= 32 {
        u32::MAX << shift
    } else {
        ((1 << width) - 1) << shift
    }
}

/// Proof that a set of bits on one port belongs to a single owner.
///
/// A claim backs exactly one [`Output`]: building the output consumes it.
///
/// ```compile_fail
/// use tick_tasks::port::{Output, PinLedger, Port};
///
/// struct Pins;
///
/// impl Port for Pins {
///     fn id(&self) -> u8 { 0 }
///     fn read(&self) -> u32 { 0 }
///     fn set(&self, _: u32) {}
///     fn clear(&self, _: u32) {}
/// }
///
/// let owned = PinLedger::new().claim(0, 1).unwrap();
/// let first = Output::new(Pins, owned);
/// let second = Output::new(Pins, owned);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedBits {
    port: u8,
    mask: u32,
}

impl OwnedBits {
    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Split the claim into the primary writer and a single override writer
    /// of the same bits.
    ///
    /// The override belongs to an edge handler that preempts the primary. The
    /// primary must do every write with that handler's line masked.
    pub fn share_with_override(self) -> (OwnedBits, OverrideBits) {
        let shared = OverrideBits {
            port: self.port,
            mask: self.mask,
        };
        (self, shared)
    }
}

/// The second writer of bits whose primary owner holds the [`OwnedBits`].
#[derive(Debug, PartialEq, Eq)]
pub struct OverrideBits {
    port: u8,
    mask: u32,
}

impl OverrideBits {
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

/// Records which bits of which port are already owned.
pub struct PinLedger {
    used: [u32; GPIO_PORTS],
}

impl PinLedger {
    pub const fn new() -> Self {
        Self {
            used: [0; GPIO_PORTS],
        }
    }

    pub fn claim(&mut self, port: u8, mask: u32) -> Result<OwnedBits, ConfigError> {
        let used = self
            .used
            .get_mut(port as usize)
            .ok_or(ConfigError::PinConflict { port, overlap: mask })?;

        let overlap = *used & mask;
        if overlap != 0 {
            return Err(ConfigError::PinConflict { port, overlap });
        }

        *used |= mask;

        Ok(OwnedBits { port, mask })
    }

    pub fn owned(&self, port: u8) -> u32 {
        self.used.get(port as usize).copied().unwrap_or(0)
    }
}

impl Default for PinLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Output bits of one port, restricted to an owned mask.
///
/// Every write is ANDed with the mask, so bits owned by someone else on the
/// same port are never disturbed.
pub struct Output<P: Port> {
    port: P,
    mask: u32,
}

impl<P: Port> Output<P> {
    pub fn new(port: P, owned: OwnedBits) -> Result<Self, ConfigError> {
        Self::on_port(port, owned.port, owned.mask)
    }

    /// Output for the override half of a shared claim.
    pub fn overriding(port: P, shared: OverrideBits) -> Result<Self, ConfigError> {
        Self::on_port(port, shared.port, shared.mask)
    }

    fn on_port(port: P, claimed: u8, mask: u32) -> Result<Self, ConfigError> {
        if port.id() != claimed {
            return Err(ConfigError::PortMismatch {
                claimed,
                port: port.id(),
            });
        }

        Ok(Self { port, mask })
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Current level of the owned bits.
    pub fn level(&self) -> u32 {
        self.port.read() & self.mask
    }

    pub fn set(&mut self, bits: u32) {
        self.port.set(bits & self.mask);
    }

    pub fn clear(&mut self, bits: u32) {
        self.port.clear(bits & self.mask);
    }

    pub fn set_all(&mut self) {
        self.port.set(self.mask);
    }

    pub fn clear_all(&mut self) {
        self.port.clear(self.mask);
    }

    /// Invert every owned bit.
    pub fn toggle(&mut self) {
        let current = self.port.read();
        self.port.set(!current & self.mask);
        self.port.clear(current & self.mask);
    }

    /// Replace the owned bits with `pattern`: clear first, then set, so no two
    /// patterns are ever lit together.
    pub fn show(&mut self, pattern: u32) {
        self.port.clear(self.mask);
        self.port.set(pattern & self.mask);
    }
}

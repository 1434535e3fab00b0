//! State shared between the tick handler and the edge handlers.
//!
//! Every cross-context field is one machine word and every operation on it is
//! a single atomic load, store or read-modify-write. Anything that spans more
//! than one field or more than one access runs inside [`with_masked`], with
//! the conflicting interrupt source held off.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// A run/pause style flag.
pub struct SharedFlag(AtomicBool);

impl SharedFlag {
    pub const fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }

    /// Flip the flag, returning the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }

    /// Read and lower the flag in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// A wrapping counter, cursor or accumulator.
pub struct SharedCounter(AtomicU32);

impl SharedCounter {
    pub const fn new(value: u32) -> Self {
        Self(AtomicU32::new(value))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn store(&self, value: u32) {
        self.0.store(value, Ordering::Release);
    }

    /// Add one, returning the new value.
    pub fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    /// Subtract one, returning the new value.
    pub fn decrement(&self) -> u32 {
        self.0.fetch_sub(1, Ordering::AcqRel).wrapping_sub(1)
    }

    pub fn reset(&self) {
        self.store(0);
    }

    /// Read and zero the counter in one step.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::AcqRel)
    }
}

/// One interrupt source that can be held off for a critical section.
///
/// On the target this masks a single NVIC line; pending requests are kept and
/// delivered once the line is unmasked.
pub trait InterruptGate {
    /// Mask the source, returning whether it was already masked.
    fn mask(&self) -> bool;
    fn unmask(&self);
}

impl<G: InterruptGate + ?Sized> InterruptGate for &G {
    fn mask(&self) -> bool {
        (**self).mask()
    }

    fn unmask(&self) {
        (**self).unmask()
    }
}

/// Run `f` with `gate`'s interrupt source masked. Nested sections leave the
/// source masked until the outermost one ends.
pub fn with_masked<G, R, F>(gate: &G, f: F) -> R
where
    G: InterruptGate + ?Sized,
    F: FnOnce() -> R,
{
    let was_masked = gate.mask();
    let result = f();
    if !was_masked {
        gate.unmask();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGate;

    #[test]
    fn flag_operations() {
        let flag = SharedFlag::new(false);
        assert!(flag.toggle());
        assert!(flag.get());
        assert!(!flag.toggle());
        flag.set(true);
        assert!(flag.take());
        assert!(!flag.get());
        assert!(!flag.take());
    }

    #[test]
    fn counter_wraps() {
        let counter = SharedCounter::new(u32::MAX);
        assert_eq!(counter.increment(), 0);
        assert_eq!(counter.decrement(), u32::MAX);
        counter.store(7);
        assert_eq!(counter.take(), 7);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn masked_section_restores_only_outermost() {
        let gate = MockGate::default();

        let value = with_masked(&gate, || {
            assert!(gate.is_masked());
            with_masked(&gate, || assert!(gate.is_masked()));
            assert!(gate.is_masked());
            42
        });

        assert_eq!(value, 42);
        assert!(!gate.is_masked());
    }
}

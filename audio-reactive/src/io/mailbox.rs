//! Single-slot publish/take mailbox.
//!
//! Carries the latest analysis result from the sampling interrupt to the
//! foreground loop. The producer overwrites, the consumer reads and clears in
//! one critical section, so a result is observed at most once and a stale one
//! never reappears.
//!
//! # Contract
//!
//! - One producer context calls [`publish()`](Mailbox::publish).
//! - One consumer context calls [`take()`](Mailbox::take).
//! - A publish that replaces a value nobody took is counted as an overrun.

use core::cell::Cell;

use critical_section::Mutex;

struct Slot<T> {
    value: Cell<Option<T>>,
    overruns: Cell<u32>,
}

/// Latest-value mailbox guarded by a critical section.
///
/// `const`-constructible, so it can live in a `static`:
///
/// ```
/// use audio_reactive::io::Mailbox;
///
/// static LEVEL: Mailbox<u16> = Mailbox::new();
///
/// LEVEL.publish(10);
/// LEVEL.publish(12);
/// assert_eq!(LEVEL.take(), Some(12));
/// assert_eq!(LEVEL.take(), None);
/// assert_eq!(LEVEL.overruns(), 1);
/// ```
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: Copy> Mailbox<T> {
    /// Empty mailbox.
    pub const fn new() -> Self {
        Mailbox {
            slot: Mutex::new(Slot {
                value: Cell::new(None),
                overruns: Cell::new(0),
            }),
        }
    }

    /// Store `value`, replacing any untaken one. Returns `true` if a value was
    /// overwritten.
    #[inline]
    pub fn publish(&self, value: T) -> bool {
        critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            let overrun = slot.value.replace(Some(value)).is_some();
            if overrun {
                slot.overruns.set(slot.overruns.get().wrapping_add(1));
            }
            overrun
        })
    }

    /// Read and clear the pending value.
    #[inline]
    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow(cs).value.take())
    }

    /// Read the pending value without clearing it.
    pub fn peek(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow(cs).value.get())
    }

    /// `true` if a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.peek().is_some()
    }

    /// Values overwritten before being taken.
    pub fn overruns(&self) -> u32 {
        critical_section::with(|cs| self.slot.borrow(cs).overruns.get())
    }

    /// Drop any pending value and zero the overrun count.
    pub fn clear(&self) {
        critical_section::with(|cs| {
            let slot = self.slot.borrow(cs);
            slot.value.set(None);
            slot.overruns.set(0);
        })
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

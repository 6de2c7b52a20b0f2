//! Sample acquisition and interrupt-to-foreground handoff.
//!
//! ## Components
//!
//! - [`adc`]: oversampled ADC burst averaging
//! - [`mailbox`]: single-slot publish/take channel guarded by a critical section
//!
//! The sampling interrupt is the only producer; the foreground loop takes
//! results whenever it gets to them and only ever sees the newest one.

pub mod adc;
pub mod mailbox;

pub use adc::{average_readings, counts_to_sample};
pub use mailbox::Mailbox;

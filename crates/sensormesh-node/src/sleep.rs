//! Low-power sleep: the deep-sleep ladder and the interrupt wake flag.
//!
//! The hardware can only power down for a fixed set of durations, so a sleep
//! budget is walked down the ladder from the longest duration that still
//! fits, checking between rungs whether an external interrupt fired. The
//! wake flag is a single atomic byte so an interrupt context can set it with
//! one store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// What ended a sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The full sleep budget elapsed.
    Timer,
    /// One of the armed external interrupts fired.
    Interrupt(u8),
    /// Sleep was refused (a firmware update is in flight).
    NotPossible,
}

/// Interrupt-to-sleep signalling: a single byte written from interrupt
/// context and read inside the power-down sequence.
#[derive(Clone, Default)]
pub struct WakeFlag {
    // 0 = no wake; otherwise interrupt id + 1
    flag: Arc<AtomicU8>,
}

impl WakeFlag {
    pub fn new() -> Self {
        WakeFlag::default()
    }

    /// Record that external interrupt `interrupt` fired.
    pub fn trigger(&self, interrupt: u8) {
        self.flag.store(interrupt.saturating_add(1), Ordering::Relaxed);
    }

    /// The pending interrupt id, if any.
    #[must_use]
    pub fn pending(&self) -> Option<u8> {
        match self.flag.load(Ordering::Relaxed) {
            0 => None,
            n => Some(n - 1),
        }
    }

    pub fn clear(&self) {
        self.flag.store(0, Ordering::Relaxed);
    }
}

/// Hardware power-down capability: suspend for (up to) `ms` milliseconds.
pub trait PowerControl {
    fn deep_sleep(&mut self, ms: u32);
}

/// Host implementation: a plain thread sleep.
pub struct HostPower;

impl PowerControl for HostPower {
    fn deep_sleep(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Walk the sleep budget down the available deep-sleep durations.
///
/// Returns early as soon as the wake flag is set; the largest rung repeats
/// until the remaining budget drops below it.
pub fn ladder_sleep(power: &mut dyn PowerControl, flag: &WakeFlag, mut ms: u32) {
    while flag.pending().is_none() && ms >= 8000 {
        power.deep_sleep(8000);
        ms -= 8000;
    }
    // (threshold, rung) pairs: hardware rungs are slightly shorter than
    // round numbers at the bottom of the ladder.
    const RUNGS: [(u32, u32); 9] = [
        (4000, 4000),
        (2000, 2000),
        (1000, 1000),
        (500, 500),
        (250, 250),
        (125, 120),
        (64, 60),
        (32, 30),
        (16, 15),
    ];
    for (threshold, rung) in RUNGS {
        if flag.pending().is_none() && ms >= threshold {
            power.deep_sleep(rung);
            ms -= rung;
        }
    }
}

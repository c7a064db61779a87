//! Runtime toggles shared between a transport and its pipeline.
//!
//! The enabled flag and the minimum accepted level are the only mutable
//! parts of a transport. Both live in atomics so any thread may flip them
//! while the dispatch thread reads them.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::level::Level;

/// Marker stored in the level atomic when no minimum level is set.
const NO_MINIMUM: u8 = u8::MAX;

/// Result of the accept gate for one event on one transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    Accept,
    /// The transport is disabled.
    Disabled,
    /// The event is below the transport's minimum accepted level.
    BelowMinimum,
}

#[derive(Debug)]
pub struct TransportState {
    enabled: AtomicBool,
    minimum_level: AtomicU8,
    /// Set once when setup failed; `enabled` can never be raised again.
    locked_out: AtomicBool,
}

impl TransportState {
    pub fn new(enabled: bool, minimum_level: Option<Level>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            minimum_level: AtomicU8::new(encode(minimum_level)),
            locked_out: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable the transport. Ignored after
    /// [`disable_permanently`](Self::disable_permanently).
    pub fn set_enabled(&self, enabled: bool) {
        if enabled && self.locked_out.load(Ordering::Acquire) {
            log::warn!("femtotransport: ignoring attempt to enable a transport whose setup failed");
            return;
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn disable_permanently(&self) {
        self.locked_out.store(true, Ordering::Release);
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_disabled_permanently(&self) -> bool {
        self.locked_out.load(Ordering::Acquire)
    }

    pub fn minimum_level(&self) -> Option<Level> {
        Level::from_u8(self.minimum_level.load(Ordering::Acquire))
    }

    pub fn set_minimum_level(&self, level: Option<Level>) {
        self.minimum_level.store(encode(level), Ordering::Release);
    }

    /// Evaluate the two-state gate for an event of `level`.
    pub fn check(&self, level: Level) -> Acceptance {
        if !self.is_enabled() {
            return Acceptance::Disabled;
        }
        match self.minimum_level() {
            Some(minimum) if level < minimum => Acceptance::BelowMinimum,
            _ => Acceptance::Accept,
        }
    }

    pub fn accepts(&self, level: Level) -> bool {
        self.check(level) == Acceptance::Accept
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new(true, None)
    }
}

fn encode(level: Option<Level>) -> u8 {
    level.map_or(NO_MINIMUM, u8::from)
}

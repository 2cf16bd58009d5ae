#![forbid(unsafe_code)]

//! Debounce gate for live-preview coalescing.
//!
//! The web layer owns the actual timer; this is the pure part that decides
//! whether an elapsed timer may fire. Each [`DebounceGate::schedule`]
//! supersedes every earlier token, so a burst of edits inside one delay
//! window produces exactly one fire carrying the most recent state. There
//! is no flush: an edit after a fire simply opens the next window.

/// Proof of a particular `schedule()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

/// Coalesces bursts of schedule calls into a single fire.
#[derive(Debug, Clone, Default)]
pub struct DebounceGate {
    generation: u64,
    armed: bool,
}

impl DebounceGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or restart) the delay window. The returned token supersedes
    /// all earlier ones.
    pub fn schedule(&mut self) -> DebounceToken {
        self.generation += 1;
        self.armed = true;
        DebounceToken(self.generation)
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    /// Whether a window is currently open.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Attempt to fire for `token`. Returns `true` only when the token is
    /// the most recent one and the gate is still armed; firing disarms.
    pub fn try_fire(&mut self, token: DebounceToken) -> bool {
        if self.armed && token.0 == self.generation {
            self.armed = false;
            true
        } else {
            false
        }
    }
}

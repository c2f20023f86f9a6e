use std::time::{Duration, Instant};

/// Coalesces a burst of slider changes into the one value the user settled on.
///
/// Every change overwrites the pending value. The pending value comes out of
/// [`SettleGate::poll`] once the interaction ends: either the slider reports a
/// release, or no change has arrived for the quiet period (keyboard nudges
/// have no release). While the pointer is held the quiet period does not
/// count, so pausing mid-drag emits nothing. Intermediate values are never
/// emitted.
pub struct SettleGate<T> {
    pending: Option<T>,
    last_change: Option<Instant>,
    pressed: bool,
    released: bool,
    quiet: Duration,
}

impl<T> SettleGate<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: None,
            last_change: None,
            pressed: false,
            released: false,
            quiet,
        }
    }

    pub fn from_millis(quiet_ms: u64) -> Self {
        Self::new(Duration::from_millis(quiet_ms))
    }

    pub fn note_change(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.last_change = Some(now);
        self.released = false;
    }

    /// Pointer went down on the slider.
    pub fn note_press(&mut self) {
        self.pressed = true;
    }

    /// Pointer let go of the slider.
    pub fn note_release(&mut self) {
        self.pressed = false;
        if self.pending.is_some() {
            self.released = true;
        }
    }

    /// Hand out the settled value, at most once per interaction.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let quiet_elapsed = !self.pressed
            && self
                .last_change
                .is_some_and(|t| now.saturating_duration_since(t) >= self.quiet);
        if self.pending.is_some() && (self.released || quiet_elapsed) {
            self.released = false;
            self.last_change = None;
            self.pending.take()
        } else {
            None
        }
    }

    /// Drop whatever is pending, e.g. when a reset supersedes the drag.
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_change = None;
        self.pressed = false;
        self.released = false;
    }
}

//! Event coalescing.
//!
//! Scroll, resize, free-text filter and masonry ratio invalidation all
//! arrive in bursts. Each burst collapses into a single trailing execution:
//! one deferred slot per event kind, holding only the latest value, executed
//! once the quiet window has elapsed. This is correctness-relevant, not just
//! an optimization — relayout during an in-flight open/close animation would
//! capture transient container dimensions and never be corrected.

use std::time::{Duration, Instant};

/// Scroll windowing recompute window.
pub const SCROLL_WINDOW: Duration = Duration::from_millis(50);
/// Resize-triggered relayout window; must outlast the panel open/close
/// animation (200 ms) so measured dimensions are settled.
pub const RELAYOUT_WINDOW: Duration = Duration::from_millis(250);
/// Free-text filter window.
pub const FILTER_WINDOW: Duration = Duration::from_millis(300);
/// Masonry relayout window after aspect ratios arrive from image loads.
pub const RATIO_WINDOW: Duration = Duration::from_millis(200);

/// A single deferred-task slot: keeps the latest pushed value and releases
/// it once the quiet window has passed.
#[derive(Debug)]
pub struct DebounceSlot<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> DebounceSlot<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    /// Takes the pending value if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// Takes the pending value regardless of the window. Used when a
    /// heavier recompute is about to subsume the deferred one anyway.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instant at which the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_window() {
        let start = Instant::now();
        let mut slot = DebounceSlot::new(Duration::from_millis(50));
        slot.push(1u32, start);

        assert_eq!(slot.poll(start), None);
        assert_eq!(slot.poll(start + Duration::from_millis(49)), None);
        assert!(slot.is_pending());
    }

    #[test]
    fn test_due_after_window() {
        let start = Instant::now();
        let mut slot = DebounceSlot::new(Duration::from_millis(50));
        slot.push(1u32, start);

        assert_eq!(slot.poll(start + Duration::from_millis(50)), Some(1));
        assert!(!slot.is_pending());
        assert_eq!(slot.poll(start + Duration::from_millis(100)), None);
    }

    #[test]
    fn test_burst_keeps_only_last_value() {
        let start = Instant::now();
        let mut slot = DebounceSlot::new(Duration::from_millis(50));
        for i in 0..5u32 {
            slot.push(i, start + Duration::from_millis(i as u64 * 10));
        }

        // The window restarts from the last push.
        assert_eq!(slot.poll(start + Duration::from_millis(60)), None);
        assert_eq!(slot.poll(start + Duration::from_millis(90)), Some(4));
    }

    #[test]
    fn test_take_drains_immediately() {
        let start = Instant::now();
        let mut slot = DebounceSlot::new(Duration::from_millis(300));
        slot.push("abc", start);
        assert_eq!(slot.take(), Some("abc"));
        assert!(!slot.is_pending());
    }
}

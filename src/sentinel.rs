//! Visibility-driven page advance.
//!
//! The view renders a marker after the last card and reports whenever the
//! marker's visibility changes. The sentinel keeps at most one observer bound
//! to that marker and rebinds it whenever the loading flag or the
//! has-more flag changes. No observer is bound while a page is loading or
//! after the stream is exhausted, so a marker that stays on screen across a
//! fetch only triggers again once the new observer sees it.

use tracing::trace;

/// Identifies one rendered marker element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Guard {
    loading: bool,
    has_more: bool,
}

#[derive(Debug)]
struct Observer {
    id: u64,
    marker: MarkerId,
    visible: bool,
}

#[derive(Debug, Default)]
pub struct ScrollSentinel {
    marker: Option<MarkerId>,
    guard: Option<Guard>,
    observer: Option<Observer>,
    next_observer: u64,
    binds: u64,
}

impl ScrollSentinel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view (re)rendered its marker. `None` means the marker is gone.
    pub fn attach(&mut self, marker: Option<MarkerId>) {
        if self.marker == marker {
            return;
        }
        self.marker = marker;
        self.rebind();
    }

    /// Feeds the pagination flags; rebinds only when they changed.
    pub fn update(&mut self, loading: bool, has_more: bool) {
        let guard = Guard { loading, has_more };
        if self.guard == Some(guard) {
            return;
        }
        self.guard = Some(guard);
        self.rebind();
    }

    /// Reports a visibility change for `marker`. Returns true when the page
    /// cursor should advance.
    pub fn observe(&mut self, marker: MarkerId, visible: bool) -> bool {
        let Some(observer) = self.observer.as_mut() else {
            return false;
        };
        if observer.marker != marker {
            return false;
        }
        let entered = visible && !observer.visible;
        observer.visible = visible;
        if entered {
            trace!(observer = observer.id, "sentinel visible");
        }
        entered
    }

    pub fn is_bound(&self) -> bool {
        self.observer.is_some()
    }

    /// How many observers have been bound so far.
    pub fn bind_count(&self) -> u64 {
        self.binds
    }

    /// Disconnects the observer. Called when the owning view goes away.
    pub fn release(&mut self) {
        if let Some(observer) = self.observer.take() {
            trace!(observer = observer.id, "sentinel released");
        }
        self.marker = None;
    }

    fn rebind(&mut self) {
        self.observer = None;
        let Some(marker) = self.marker else {
            return;
        };
        let Some(guard) = self.guard else {
            return;
        };
        if guard.loading || !guard.has_more {
            return;
        }
        self.next_observer += 1;
        self.binds += 1;
        self.observer = Some(Observer {
            id: self.next_observer,
            marker,
            visible: false,
        });
    }
}

impl Drop for ScrollSentinel {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: MarkerId = MarkerId(1);

    fn bound() -> ScrollSentinel {
        let mut sentinel = ScrollSentinel::new();
        sentinel.attach(Some(MARKER));
        sentinel.update(false, true);
        sentinel
    }

    #[test]
    fn fires_once_per_visibility_transition() {
        let mut sentinel = bound();
        assert!(sentinel.observe(MARKER, true));
        assert!(!sentinel.observe(MARKER, true));
        assert!(!sentinel.observe(MARKER, false));
        assert!(sentinel.observe(MARKER, true));
    }

    #[test]
    fn no_observer_while_loading() {
        let mut sentinel = bound();
        sentinel.update(true, true);
        assert!(!sentinel.is_bound());
        assert!(!sentinel.observe(MARKER, true));
    }

    #[test]
    fn still_visible_marker_fires_after_load_finishes() {
        let mut sentinel = bound();
        assert!(sentinel.observe(MARKER, true));
        sentinel.update(true, true);
        assert!(!sentinel.observe(MARKER, true));
        sentinel.update(false, true);
        assert!(sentinel.observe(MARKER, true));
        assert_eq!(sentinel.bind_count(), 2);
    }

    #[test]
    fn exhausted_stream_never_fires() {
        let mut sentinel = bound();
        sentinel.update(false, false);
        assert!(!sentinel.is_bound());
        assert!(!sentinel.observe(MARKER, true));
    }

    #[test]
    fn unchanged_flags_do_not_rebind() {
        let mut sentinel = bound();
        sentinel.update(false, true);
        sentinel.attach(Some(MARKER));
        assert_eq!(sentinel.bind_count(), 1);
    }

    #[test]
    fn other_marker_is_ignored() {
        let mut sentinel = bound();
        assert!(!sentinel.observe(MarkerId(9), true));
        sentinel.attach(Some(MarkerId(9)));
        assert!(sentinel.observe(MarkerId(9), true));
    }

    #[test]
    fn release_disconnects() {
        let mut sentinel = bound();
        sentinel.release();
        assert!(!sentinel.is_bound());
        assert!(!sentinel.observe(MARKER, true));
    }
}

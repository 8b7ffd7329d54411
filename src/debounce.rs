//! Focus permanence: a window must keep focus for a quiescence window before
//! it is recorded, so flicking through windows records only where you stop.

use std::time::Duration;

use tokio::time::Instant;

use crate::wm_ipc::{ChangeEvent, WindowChange};

pub struct Debouncer {
    window: Duration,
    ignore_floating: bool,
    pending: Option<ChangeEvent>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration, ignore_floating: bool) -> Self {
        Debouncer {
            window,
            ignore_floating,
            pending: None,
            deadline: None,
        }
    }

    /// When the pending focus event becomes due, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Feed an event; returns it back if it must be applied right away.
    ///
    /// Call [`Debouncer::take_expired`] first so a due focus event is never
    /// overwritten by the one that arrives after it.
    pub fn offer(&mut self, event: ChangeEvent, now: Instant) -> Option<ChangeEvent> {
        match event.change {
            WindowChange::Close => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.container_id() == event.container_id())
                {
                    self.pending = None;
                    self.deadline = None;
                }
                Some(event)
            }
            WindowChange::Focus if self.ignore_floating && event.is_floating() => {
                if self.pending.is_some() {
                    self.deadline = Some(now + self.window);
                }
                None
            }
            WindowChange::Focus => {
                self.pending = Some(event);
                self.deadline = Some(now + self.window);
                None
            }
            WindowChange::Other => None,
        }
    }

    /// Yield the pending focus event once its deadline has passed
    pub fn take_expired(&mut self, now: Instant) -> Option<ChangeEvent> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm_ipc::WindowId;

    const WINDOW: Duration = Duration::from_millis(800);

    fn event(change: &str, id: WindowId, floating: &str) -> ChangeEvent {
        serde_json::from_str(&format!(
            r#"{{"change":"{change}","container":{{"id":{id},"floating":"{floating}"}}}}"#
        ))
        .unwrap()
    }

    fn focus(id: WindowId) -> ChangeEvent {
        event("focus", id, "auto_off")
    }

    #[test]
    fn test_focus_is_held_until_deadline() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        assert_eq!(debouncer.offer(focus(1), t0), None);
        assert_eq!(debouncer.deadline(), Some(t0 + WINDOW));
        assert_eq!(debouncer.take_expired(t0 + Duration::from_millis(799)), None);

        let due = debouncer.take_expired(t0 + WINDOW).unwrap();
        assert_eq!(due.container_id(), 1);
        assert_eq!(debouncer.deadline(), None);
        // Emitted exactly once
        assert_eq!(debouncer.take_expired(t0 + WINDOW * 2), None);
    }

    #[test]
    fn test_rapid_focus_coalesces_to_last() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(focus(1), t0);
        debouncer.offer(focus(2), t0 + Duration::from_millis(100));
        debouncer.offer(focus(3), t0 + Duration::from_millis(200));

        assert_eq!(debouncer.take_expired(t0 + WINDOW), None);
        let due = debouncer
            .take_expired(t0 + Duration::from_millis(200) + WINDOW)
            .unwrap();
        assert_eq!(due.container_id(), 3);
    }

    #[test]
    fn test_close_bypasses_and_cancels_pending_for_same_window() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(focus(4), t0);
        let immediate = debouncer.offer(event("close", 4, "auto_off"), t0);
        assert_eq!(immediate.map(|e| e.container_id()), Some(4));
        assert_eq!(debouncer.deadline(), None);
        assert_eq!(debouncer.take_expired(t0 + WINDOW), None);
    }

    #[test]
    fn test_close_of_other_window_keeps_pending() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(focus(4), t0);
        assert!(debouncer.offer(event("close", 5, "auto_off"), t0).is_some());
        assert_eq!(debouncer.take_expired(t0 + WINDOW).map(|e| e.container_id()), Some(4));
    }

    #[test]
    fn test_floating_focus_rearms_without_replacing() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(500);
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(focus(1), t0);
        assert_eq!(debouncer.offer(event("focus", 2, "user_on"), later), None);

        assert_eq!(debouncer.deadline(), Some(later + WINDOW));
        assert_eq!(debouncer.take_expired(t0 + WINDOW), None);
        assert_eq!(
            debouncer.take_expired(later + WINDOW).map(|e| e.container_id()),
            Some(1)
        );
    }

    #[test]
    fn test_floating_focus_without_pending_does_nothing() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(event("focus", 2, "user_on"), t0);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_floating_kept_when_not_ignored() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, false);

        debouncer.offer(event("focus", 2, "user_on"), t0);
        assert_eq!(debouncer.take_expired(t0 + WINDOW).map(|e| e.container_id()), Some(2));
    }

    #[test]
    fn test_other_changes_ignored() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW, true);

        debouncer.offer(focus(1), t0);
        assert_eq!(debouncer.offer(event("title", 1, "auto_off"), t0 + WINDOW), None);
        assert_eq!(debouncer.take_expired(t0 + WINDOW).map(|e| e.container_id()), Some(1));
    }
}

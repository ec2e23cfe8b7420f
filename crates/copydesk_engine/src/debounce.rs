use std::time::{Duration, Instant};

use tokio::time;

use copydesk_core::ExtractedContent;

/// Holds the newest event of an edit burst until a quiet period elapses.
///
/// Every push replaces the pending event and restarts the deadline, so only
/// the last edit of a burst survives.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<(ExtractedContent, Instant)>,
}

impl Debouncer {
    pub fn push(&mut self, content: ExtractedContent, quiet: Duration) {
        self.pending = Some((content, Instant::now() + quiet));
    }

    /// Deadline of the pending event, usable with `sleep_until`.
    pub fn deadline(&self) -> Option<time::Instant> {
        self.pending
            .as_ref()
            .map(|(_, deadline)| time::Instant::from_std(*deadline))
    }

    /// Takes the pending event and disarms.
    pub fn take(&mut self) -> Option<ExtractedContent> {
        self.pending.take().map(|(content, _)| content)
    }

    /// Drops any pending event without dispatching it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use copydesk_core::extract_content;

    use super::Debouncer;

    #[test]
    fn idle_debouncer_has_no_deadline() {
        let debouncer = Debouncer::default();
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn push_arms_a_future_deadline() {
        let mut debouncer = Debouncer::default();
        debouncer.push(extract_content("", "hello there"), Duration::from_millis(100));

        let deadline = debouncer.deadline().unwrap();
        assert!(deadline > tokio::time::Instant::from_std(std::time::Instant::now()));
    }

    #[test]
    fn later_push_replaces_the_pending_event_and_extends_the_deadline() {
        let mut debouncer = Debouncer::default();
        debouncer.push(extract_content("", "first draft"), Duration::from_millis(100));
        let first_deadline = debouncer.deadline().unwrap();

        debouncer.push(extract_content("", "second draft"), Duration::from_millis(100));
        let second_deadline = debouncer.deadline().unwrap();

        assert!(second_deadline >= first_deadline);
        assert_eq!(debouncer.take().unwrap().plain_text, "second draft");
    }

    #[test]
    fn take_disarms() {
        let mut debouncer = Debouncer::default();
        debouncer.push(extract_content("", "hello there"), Duration::from_millis(100));

        assert!(debouncer.take().is_some());
        assert!(debouncer.deadline().is_none());
        assert!(debouncer.take().is_none());
    }

    #[test]
    fn cancel_drops_the_pending_event() {
        let mut debouncer = Debouncer::default();
        debouncer.push(extract_content("", "hello there"), Duration::from_millis(100));
        debouncer.cancel();

        assert!(debouncer.deadline().is_none());
        assert!(debouncer.take().is_none());
    }
}

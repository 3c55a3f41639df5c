use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEventKind {
    /// The login affordance should be opened.
    LoginRequested,
    /// A dismissible notification.
    Notice(Severity),
}

/// Side effect requested of the presentation layer.
///
/// The core never renders anything itself; it records what the UI should show
/// and the shell drains the bus once per turn of its event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub seq: u64,
    pub kind: UiEventKind,
    pub message: String,
}

/// Pending events kept before the oldest are dropped.
pub const MAX_PENDING_EVENTS: usize = 256;

#[derive(Debug, Default)]
struct BusInner {
    next_seq: u64,
    events: Vec<UiEvent>,
}

/// Shared queue of UI side effects. Clones share the same queue.
///
/// The shell is expected to [`EventBus::drain`] it regularly. If it does not,
/// only the newest [`MAX_PENDING_EVENTS`] are kept.
#[derive(Debug, Default, Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event and returns its sequence number.
    pub fn emit(&self, kind: UiEventKind, message: impl Into<String>) -> u64 {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.events.push(UiEvent {
            seq,
            kind,
            message: message.into(),
        });
        let excess = inner.events.len().saturating_sub(MAX_PENDING_EVENTS);
        if excess > 0 {
            inner.events.drain(..excess);
        }
        seq
    }

    pub fn notify(&self, severity: Severity, message: impl Into<String>) -> u64 {
        self.emit(UiEventKind::Notice(severity), message)
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.inner.lock().events.clone()
    }

    pub fn login_requests(&self) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| e.kind == UiEventKind::LoginRequested)
            .count()
    }

    pub fn notices(&self) -> Vec<UiEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e.kind, UiEventKind::Notice(_)))
            .cloned()
            .collect()
    }

    /// Removes a single event (e.g. the user closed a notification).
    ///
    /// Returns `true` if the event was still pending.
    pub fn dismiss(&self, seq: u64) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.events.len();
        inner.events.retain(|e| e.seq != seq);
        inner.events.len() != before
    }

    pub fn drain(&self) -> Vec<UiEvent> {
        std::mem::take(&mut self.inner.lock().events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, MAX_PENDING_EVENTS, Severity, UiEventKind};

    #[test]
    fn records_events_in_sequence() {
        let bus = EventBus::new();
        let a = bus.emit(UiEventKind::LoginRequested, "settings");
        let b = bus.notify(Severity::Error, "write blocked");
        assert!(a < b);
        assert_eq!(bus.events().len(), 2);
        assert_eq!(bus.login_requests(), 1);
        assert_eq!(bus.notices()[0].message, "write blocked");
    }

    #[test]
    fn clones_share_the_queue() {
        let bus = EventBus::new();
        let other = bus.clone();
        other.notify(Severity::Info, "hi");
        assert_eq!(bus.events().len(), 1);
    }

    #[test]
    fn dismiss_removes_only_that_event() {
        let bus = EventBus::new();
        let keep = bus.notify(Severity::Info, "keep");
        let gone = bus.notify(Severity::Error, "gone");
        assert!(bus.dismiss(gone));
        assert!(!bus.dismiss(gone));
        let left = bus.events();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].seq, keep);
    }

    #[test]
    fn undrained_queue_keeps_only_the_newest() {
        let bus = EventBus::new();
        for i in 0..MAX_PENDING_EVENTS + 10 {
            bus.notify(Severity::Info, format!("n{i}"));
        }
        let events = bus.events();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        assert_eq!(events[0].seq, 10);
        assert_eq!(
            events.last().map(|e| e.message.clone()),
            Some(format!("n{}", MAX_PENDING_EVENTS + 9))
        );
    }

    #[test]
    fn drain_clears_events() {
        let bus = EventBus::new();
        bus.emit(UiEventKind::LoginRequested, "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());
    }
}

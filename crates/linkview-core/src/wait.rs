//! Blocking wait for changes from an automation thread
//!
//! An [`EventWaiter`] is registered as an observer in the change graph. A
//! script or host thread holding a clone blocks in [`EventWaiter::wait`]
//! until a change arrives after the call; a `Break` change wakes it up with
//! `None`. Only the most recent event is kept.

use crate::error::ObserverError;
use crate::graph::{ChangeKind, ChangeMessage, ChangeObserver, NodeId, Propagation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A change as seen by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub kind: ChangeKind,
    /// Node the change happened on
    pub origin: NodeId,
    pub payload: Option<serde_json::Value>,
}

impl From<&ChangeMessage> for HostEvent {
    fn from(message: &ChangeMessage) -> Self {
        Self {
            kind: message.kind,
            origin: message.origin,
            payload: message.payload.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    latest: Option<HostEvent>,
    /// Ordinary events posted so far
    posted: u64,
    /// Value of `posted` when the latest event was handed out
    taken: u64,
    breaks: u64,
    /// Break posted while no thread was blocked, consumed by the next wait
    pending_break: Option<NodeId>,
    blocked: usize,
}

/// Mutex/condvar mailbox shared between the graph and a waiting thread
#[derive(Debug, Clone, Default)]
pub struct EventWaiter {
    shared: Arc<(Mutex<Mailbox>, Condvar)>,
}

impl EventWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event and wake every waiting thread
    ///
    /// A `Break` event is routed to [`EventWaiter::post_break`].
    pub fn post(&self, event: HostEvent) {
        if event.kind == ChangeKind::Break {
            self.post_break(event.origin);
            return;
        }
        let (mailbox, ready) = &*self.shared;
        if let Ok(mut m) = mailbox.lock() {
            m.latest = Some(event);
            m.posted += 1;
            ready.notify_all();
        }
    }

    /// Wake waiting threads without a change
    ///
    /// With no thread blocked, the break is kept and ends the next wait.
    pub fn post_break(&self, origin: NodeId) {
        let (mailbox, ready) = &*self.shared;
        if let Ok(mut m) = mailbox.lock() {
            m.breaks += 1;
            if m.blocked == 0 {
                m.pending_break = Some(origin);
            }
            ready.notify_all();
        }
    }

    /// Threads currently blocked in a wait
    pub fn waiting_threads(&self) -> usize {
        let (mailbox, _) = &*self.shared;
        mailbox.lock().map_or(0, |m| m.blocked)
    }

    /// Block until an event posted after this call
    ///
    /// Events posted before the call are not returned. Returns `None` when
    /// woken by a break.
    pub fn wait(&self) -> Option<HostEvent> {
        self.wait_inner(None)
    }

    /// Like [`EventWaiter::wait`] but gives up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<HostEvent> {
        self.wait_inner(Some(timeout))
    }

    fn wait_inner(&self, timeout: Option<Duration>) -> Option<HostEvent> {
        let (mailbox, ready) = &*self.shared;
        let mut m = mailbox.lock().ok()?;
        if m.pending_break.take().is_some() {
            return None;
        }
        let (posted, breaks) = (m.posted, m.breaks);
        m.blocked += 1;
        let unchanged = |m: &mut Mailbox| m.posted == posted && m.breaks == breaks;
        let mut m = match timeout {
            Some(timeout) => ready
                .wait_timeout_while(m, timeout, unchanged)
                .ok()
                .map(|(m, _)| m)?,
            None => ready.wait_while(m, unchanged).ok()?,
        };
        m.blocked -= 1;
        if m.breaks != breaks || m.posted == posted {
            return None;
        }
        m.taken = m.posted;
        m.latest.clone()
    }

    /// Take a pending break or an event not yet handed out, without blocking
    pub fn try_take(&self) -> Option<HostEvent> {
        let (mailbox, _) = &*self.shared;
        let mut m = mailbox.lock().ok()?;
        if let Some(origin) = m.pending_break.take() {
            return Some(HostEvent {
                kind: ChangeKind::Break,
                origin,
                payload: None,
            });
        }
        if m.taken == m.posted {
            return None;
        }
        m.taken = m.posted;
        m.latest.clone()
    }
}

impl ChangeObserver for EventWaiter {
    fn on_change(
        &mut self,
        message: &ChangeMessage,
        _path: &[NodeId],
    ) -> Result<Propagation, ObserverError> {
        self.post(HostEvent::from(message));
        Ok(Propagation::Forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChangeGraph;
    use std::thread;

    fn event(kind: ChangeKind, origin: usize) -> HostEvent {
        HostEvent {
            kind,
            origin: NodeId(origin),
            payload: None,
        }
    }

    fn until_blocked(waiter: &EventWaiter) {
        while waiter.waiting_threads() == 0 {
            thread::yield_now();
        }
    }

    #[test]
    fn test_wait_receives_change() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("selection");
        let waiter = EventWaiter::new();
        let node = graph.add_observer_node("waiter", waiter.clone());
        graph.register(node, source);

        let remote = waiter.clone();
        let handle = thread::spawn(move || remote.wait());
        until_blocked(&waiter);
        graph.emit(source, ChangeKind::MarkerChange).unwrap();

        let event = handle.join().unwrap().unwrap();
        assert_eq!(event.kind, ChangeKind::MarkerChange);
        assert_eq!(event.origin, source);
        assert_eq!(waiter.waiting_threads(), 0);
    }

    #[test]
    fn test_earlier_event_is_not_returned() {
        let waiter = EventWaiter::new();
        waiter.post(event(ChangeKind::VariableContent, 1));
        assert_eq!(waiter.wait_timeout(Duration::from_millis(20)), None);

        let remote = waiter.clone();
        let handle = thread::spawn(move || remote.wait());
        until_blocked(&waiter);
        waiter.post(event(ChangeKind::AxisChange, 2));
        assert_eq!(handle.join().unwrap().map(|e| e.kind), Some(ChangeKind::AxisChange));
    }

    #[test]
    fn test_break_returns_none() {
        let waiter = EventWaiter::new();
        let remote = waiter.clone();
        let handle = thread::spawn(move || remote.wait());
        until_blocked(&waiter);
        waiter.post_break(NodeId(0));
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn test_break_before_wait_is_kept() {
        let waiter = EventWaiter::new();
        waiter.post_break(NodeId(0));
        waiter.post(event(ChangeKind::MarkerChange, 3));

        assert_eq!(waiter.wait(), None);
        // consumed by the wait above
        assert_eq!(waiter.wait_timeout(Duration::from_millis(10)), None);
        assert_eq!(waiter.try_take().map(|e| e.kind), Some(ChangeKind::MarkerChange));
    }

    #[test]
    fn test_break_kind_through_post() {
        let waiter = EventWaiter::new();
        waiter.post(event(ChangeKind::Break, 4));
        let taken = waiter.try_take().unwrap();
        assert_eq!(taken.kind, ChangeKind::Break);
        assert_eq!(taken.origin, NodeId(4));
        assert_eq!(waiter.try_take(), None);
    }

    #[test]
    fn test_latest_event_wins() {
        let waiter = EventWaiter::new();
        waiter.post(event(ChangeKind::VariableContent, 1));
        waiter.post(event(ChangeKind::AxisChange, 2));
        let taken = waiter.try_take().unwrap();
        assert_eq!(taken.kind, ChangeKind::AxisChange);
        assert_eq!(waiter.try_take(), None);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let waiter = EventWaiter::new();
        assert_eq!(waiter.wait_timeout(Duration::from_millis(10)), None);
        assert_eq!(waiter.waiting_threads(), 0);
    }
}

//! Change propagation graph
//!
//! Variables, selection masks and axes are *sources*; plots and automation
//! hooks are *observers*. Every participant is a node in an arena addressed
//! by a [`NodeId`], never by object identity, so nodes can be stored and
//! moved freely.
//!
//! A change is broadcast depth-first: each direct observer of the source is
//! visited once, and observers that forward the change pass it on to their
//! own observers. A per-call visited set makes cyclic subscriptions (a plot
//! feeding a derived marker it also observes) safe.
//!
//! Bulk mutations run inside a batch: delivery is suppressed and a single
//! coalesced message per source is flushed when the outermost batch ends.

use crate::error::{ObserverError, ObserverFailure, PropagationError, PropagationResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Stable handle of a node in the change graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Values of a variable changed
    VariableContent,
    /// A variable was categorized or lost its categories
    VariableType,
    /// Primary selection changed
    MarkerChange,
    /// Secondary marks (colouring) changed
    SecondaryMarkerChange,
    /// Axis geometry, range, type or category order changed
    AxisChange,
    /// Several different changes coalesced in a batch
    Bulk,
    /// Request to wake up and stop waiting
    Break,
}

impl ChangeKind {
    /// Combine two kinds of the same source
    pub fn merge(self, other: ChangeKind) -> ChangeKind {
        if self == other {
            self
        } else {
            ChangeKind::Bulk
        }
    }
}

/// A change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMessage {
    /// Kind of change
    pub kind: ChangeKind,
    /// Node the change happened on
    pub origin: NodeId,
    /// Optional host-defined payload
    pub payload: Option<serde_json::Value>,
}

impl ChangeMessage {
    pub fn new(origin: NodeId, kind: ChangeKind) -> Self {
        Self {
            kind,
            origin,
            payload: None,
        }
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Merge a later message from the same source into this one
    ///
    /// The later payload wins.
    pub fn coalesce(mut self, later: ChangeMessage) -> Self {
        self.kind = self.kind.merge(later.kind);
        if later.payload.is_some() {
            self.payload = later.payload;
        }
        self
    }
}

/// Whether an observer passes a change on to its own observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Forward,
    Stop,
}

/// Receives change events
///
/// `path` lists the nodes the change travelled through, origin first, up to
/// the node that delivered it.
pub trait ChangeObserver: Send {
    fn on_change(
        &mut self,
        message: &ChangeMessage,
        path: &[NodeId],
    ) -> Result<Propagation, ObserverError>;
}

struct NodeSlot {
    label: String,
    observers: Vec<NodeId>,
    handler: Option<Box<dyn ChangeObserver>>,
}

/// Directed observer graph with depth-first change delivery
#[derive(Default)]
pub struct ChangeGraph {
    nodes: Vec<Option<NodeSlot>>,
    batch_depth: usize,
    pending: Vec<(NodeId, ChangeMessage)>,
    deliveries: u64,
}

impl fmt::Debug for ChangeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeGraph")
            .field("nodes", &self.node_count())
            .field("batch_depth", &self.batch_depth)
            .field("pending", &self.pending.len())
            .field("deliveries", &self.deliveries)
            .finish()
    }
}

impl ChangeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without a handler (a pure source or relay)
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        self.insert(NodeSlot {
            label: label.into(),
            observers: Vec::new(),
            handler: None,
        })
    }

    /// Add a node that reacts to changes
    pub fn add_observer_node(
        &mut self,
        label: impl Into<String>,
        handler: impl ChangeObserver + 'static,
    ) -> NodeId {
        self.insert(NodeSlot {
            label: label.into(),
            observers: Vec::new(),
            handler: Some(Box::new(handler)),
        })
    }

    fn insert(&mut self, slot: NodeSlot) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(slot));
        id
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(node.0)
            .and_then(Option::take)
            .is_some();
        if removed {
            for slot in self.nodes.iter_mut().flatten() {
                slot.observers.retain(|&o| o != node);
            }
            self.pending.retain(|(source, _)| *source != node);
        }
        removed
    }

    /// Check if a node exists
    pub fn contains(&self, node: NodeId) -> bool {
        self.slot(node).is_some()
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Label of a node
    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.slot(node).map(|s| s.label.as_str())
    }

    /// Direct observers of a node, in registration order
    pub fn observers_of(&self, node: NodeId) -> &[NodeId] {
        self.slot(node).map(|s| s.observers.as_slice()).unwrap_or(&[])
    }

    /// Register `observer` for changes of `source`
    ///
    /// Returns `false` if either node is missing or the edge already exists.
    pub fn register(&mut self, observer: NodeId, source: NodeId) -> bool {
        if !self.contains(observer) {
            return false;
        }
        match self.slot_mut(source) {
            Some(slot) if !slot.observers.contains(&observer) => {
                slot.observers.push(observer);
                true
            }
            _ => false,
        }
    }

    /// Remove the edge from `source` to `observer`
    pub fn unregister(&mut self, observer: NodeId, source: NodeId) -> bool {
        match self.slot_mut(source) {
            Some(slot) => {
                let before = slot.observers.len();
                slot.observers.retain(|&o| o != observer);
                before != slot.observers.len()
            }
            None => false,
        }
    }

    /// Number of handler invocations so far
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }

    /// Check if a batch is open
    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Shorthand for notifying a message of `kind` originating at `source`
    pub fn emit(&mut self, source: NodeId, kind: ChangeKind) -> PropagationResult<()> {
        self.notify(source, ChangeMessage::new(source, kind))
    }

    /// Broadcast a change of `source`
    ///
    /// Inside a batch the message is coalesced and delivered later. A failing
    /// observer does not stop delivery; all failures are returned together
    /// once the fan-out is complete.
    pub fn notify(&mut self, source: NodeId, message: ChangeMessage) -> PropagationResult<()> {
        if self.batch_depth > 0 {
            match self.pending.iter_mut().find(|(s, _)| *s == source) {
                Some((_, queued)) => {
                    let merged = queued.clone().coalesce(message);
                    *queued = merged;
                }
                None => self.pending.push((source, message)),
            }
            return Ok(());
        }

        let mut failures = Vec::new();
        self.broadcast(source, &message, &mut failures);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PropagationError {
                origin: source,
                failures,
            })
        }
    }

    /// Start suppressing delivery
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch; the outermost close flushes coalesced messages
    pub fn end_batch(&mut self) -> PropagationResult<()> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        debug!(sources = pending.len(), "flushing change batch");
        let mut origin = None;
        let mut failures = Vec::new();
        for (source, message) in pending {
            let before = failures.len();
            self.broadcast(source, &message, &mut failures);
            if failures.len() > before && origin.is_none() {
                origin = Some(source);
            }
        }
        match origin {
            Some(origin) => Err(PropagationError { origin, failures }),
            None => Ok(()),
        }
    }

    /// Run `f` inside a batch and flush afterwards
    pub fn batch<R, F>(&mut self, f: F) -> PropagationResult<R>
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.begin_batch();
        let result = f(self);
        self.end_batch()?;
        Ok(result)
    }

    fn broadcast(
        &mut self,
        source: NodeId,
        message: &ChangeMessage,
        failures: &mut Vec<ObserverFailure>,
    ) {
        let mut visited = HashSet::new();
        visited.insert(source);
        let mut path = vec![source];
        debug!(
            source = source.0,
            kind = ?message.kind,
            "delivering change"
        );
        self.deliver(source, message, &mut path, &mut visited, failures);
    }

    fn deliver(
        &mut self,
        node: NodeId,
        message: &ChangeMessage,
        path: &mut Vec<NodeId>,
        visited: &mut HashSet<NodeId>,
        failures: &mut Vec<ObserverFailure>,
    ) {
        let observers = self.observers_of(node).to_vec();
        for observer in observers {
            if !visited.insert(observer) {
                continue;
            }

            // The handler is taken out of its slot while it runs
            let handler = self.slot_mut(observer).and_then(|s| s.handler.take());
            let outcome = match handler {
                Some(mut handler) => {
                    self.deliveries += 1;
                    let outcome = handler.on_change(message, path);
                    if let Some(slot) = self.slot_mut(observer) {
                        slot.handler = Some(handler);
                    }
                    outcome
                }
                None => Ok(Propagation::Forward),
            };

            match outcome {
                Ok(Propagation::Forward) => {
                    path.push(observer);
                    self.deliver(observer, message, path, visited, failures);
                    path.pop();
                }
                Ok(Propagation::Stop) => {}
                Err(error) => {
                    let label = self.label(observer).unwrap_or_default().to_string();
                    warn!(node = observer.0, %label, %error, "observer failed");
                    failures.push(ObserverFailure {
                        node: observer,
                        label,
                        error,
                    });
                }
            }
        }
    }

    fn slot(&self, node: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(node.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(node.0).and_then(Option::as_mut)
    }
}

/// Generation counter shared between a view and its graph node
///
/// Every delivered change bumps the generation. A view remembers the
/// generation it was built at and is stale when that differs. Starting a
/// recomputation takes a token; if another change arrives before the result
/// is committed the token is outdated and the result is dropped, so only the
/// latest recomputation ever lands.
#[derive(Debug, Clone, Default)]
pub struct StaleFlag {
    generation: Arc<AtomicU64>,
}

impl StaleFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Mark dependents stale
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Token for a recomputation starting now
    pub fn begin(&self) -> u64 {
        self.generation()
    }

    /// Check if no change arrived since `token` was taken
    pub fn is_current(&self, token: u64) -> bool {
        self.generation() == token
    }

    /// Accept a recomputation result; `false` when it was superseded
    pub fn commit(&self, token: u64) -> bool {
        self.is_current(token)
    }
}

impl ChangeObserver for StaleFlag {
    fn on_change(
        &mut self,
        _message: &ChangeMessage,
        _path: &[NodeId],
    ) -> Result<Propagation, ObserverError> {
        self.invalidate();
        Ok(Propagation::Forward)
    }
}

/// Observer that records every message it receives
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<(ChangeMessage, Vec<NodeId>)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far
    pub fn messages(&self) -> Vec<ChangeMessage> {
        self.log
            .lock()
            .map(|log| log.iter().map(|(m, _)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// Paths the messages travelled
    pub fn paths(&self) -> Vec<Vec<NodeId>> {
        self.log
            .lock()
            .map(|log| log.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of messages received
    pub fn count(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Forget recorded messages
    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl ChangeObserver for Recorder {
    fn on_change(
        &mut self,
        message: &ChangeMessage,
        path: &[NodeId],
    ) -> Result<Propagation, ObserverError> {
        self.log
            .lock()
            .map_err(|_| ObserverError::new("recorder log poisoned"))?
            .push((message.clone(), path.to_vec()));
        Ok(Propagation::Forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl ChangeObserver for Failing {
        fn on_change(
            &mut self,
            _message: &ChangeMessage,
            _path: &[NodeId],
        ) -> Result<Propagation, ObserverError> {
            Err(ObserverError::new("cannot redraw"))
        }
    }

    struct Stopper(Recorder);

    impl ChangeObserver for Stopper {
        fn on_change(
            &mut self,
            message: &ChangeMessage,
            path: &[NodeId],
        ) -> Result<Propagation, ObserverError> {
            self.0.on_change(message, path)?;
            Ok(Propagation::Stop)
        }
    }

    #[test]
    fn test_direct_observers_notified_in_order() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let first = Recorder::new();
        let second = Recorder::new();
        let a = graph.add_observer_node("a", first.clone());
        let b = graph.add_observer_node("b", second.clone());
        assert!(graph.register(a, source));
        assert!(graph.register(b, source));
        assert!(!graph.register(b, source));

        graph.emit(source, ChangeKind::VariableContent).unwrap();

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
        assert_eq!(graph.observers_of(source), &[a, b]);
        assert_eq!(first.paths()[0], vec![source]);
        assert_eq!(graph.deliveries(), 2);
    }

    #[test]
    fn test_forwarding_and_cycles() {
        let mut graph = ChangeGraph::new();
        let marker = graph.add_node("marker");
        let plot_log = Recorder::new();
        let derived_log = Recorder::new();
        let plot = graph.add_observer_node("plot", plot_log.clone());
        let derived = graph.add_observer_node("derived", derived_log.clone());
        graph.register(plot, marker);
        graph.register(derived, plot);
        graph.register(marker, derived);
        graph.register(plot, derived);

        graph.emit(marker, ChangeKind::MarkerChange).unwrap();

        assert_eq!(plot_log.count(), 1);
        assert_eq!(derived_log.count(), 1);
        assert_eq!(derived_log.paths()[0], vec![marker, plot]);
    }

    #[test]
    fn test_stop_prevents_forwarding() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("axis");
        let stopper_log = Recorder::new();
        let downstream = Recorder::new();
        let stopper = graph.add_observer_node("stopper", Stopper(stopper_log.clone()));
        let after = graph.add_observer_node("after", downstream.clone());
        graph.register(stopper, source);
        graph.register(after, stopper);

        graph.emit(source, ChangeKind::AxisChange).unwrap();
        assert_eq!(stopper_log.count(), 1);
        assert_eq!(downstream.count(), 0);
    }

    #[test]
    fn test_failures_do_not_block_siblings() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let failing = graph.add_observer_node("broken", Failing);
        let log = Recorder::new();
        let healthy = graph.add_observer_node("healthy", log.clone());
        graph.register(failing, source);
        graph.register(healthy, source);

        let err = graph.emit(source, ChangeKind::VariableContent).unwrap_err();
        assert_eq!(err.origin, source);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].node, failing);
        assert_eq!(err.failures[0].label, "broken");
        assert_eq!(log.count(), 1);
    }

    #[test]
    fn test_batch_coalesces_per_source() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let log = Recorder::new();
        let observer = graph.add_observer_node("plot", log.clone());
        graph.register(observer, source);

        graph
            .batch(|g| {
                for _ in 0..5 {
                    g.emit(source, ChangeKind::VariableContent).unwrap();
                }
            })
            .unwrap();

        assert_eq!(log.count(), 1);
        assert_eq!(log.messages()[0].kind, ChangeKind::VariableContent);
    }

    #[test]
    fn test_nested_batches_flush_once() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("mask");
        let log = Recorder::new();
        let observer = graph.add_observer_node("plot", log.clone());
        graph.register(observer, source);

        graph.begin_batch();
        graph.emit(source, ChangeKind::MarkerChange).unwrap();
        graph.begin_batch();
        graph.emit(source, ChangeKind::SecondaryMarkerChange).unwrap();
        graph.end_batch().unwrap();
        assert_eq!(log.count(), 0);
        graph.end_batch().unwrap();

        assert_eq!(log.count(), 1);
        assert_eq!(log.messages()[0].kind, ChangeKind::Bulk);
        assert!(!graph.is_batching());
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let log = Recorder::new();
        let observer = graph.add_observer_node("plot", log.clone());
        graph.register(observer, source);

        assert!(graph.remove_node(observer));
        assert!(!graph.contains(observer));
        graph.emit(source, ChangeKind::VariableContent).unwrap();
        assert_eq!(log.count(), 0);
        assert!(graph.observers_of(source).is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let observer = graph.add_observer_node("plot", Recorder::new());
        graph.register(observer, source);
        assert!(graph.unregister(observer, source));
        assert!(!graph.unregister(observer, source));
    }

    #[test]
    fn test_stale_flag_tokens() {
        let mut graph = ChangeGraph::new();
        let source = graph.add_node("variable");
        let flag = StaleFlag::new();
        let node = graph.add_observer_node("view", flag.clone());
        graph.register(node, source);

        let token = flag.begin();
        assert!(flag.is_current(token));
        graph.emit(source, ChangeKind::VariableContent).unwrap();
        assert!(!flag.is_current(token));
        assert_eq!(flag.generation(), 1);
    }

    #[test]
    fn test_coalesce_keeps_latest_payload() {
        let a = ChangeMessage::new(NodeId(0), ChangeKind::AxisChange)
            .with_payload(serde_json::json!({"step": 1}));
        let b = ChangeMessage::new(NodeId(0), ChangeKind::AxisChange)
            .with_payload(serde_json::json!({"step": 2}));
        let merged = a.coalesce(b);
        assert_eq!(merged.kind, ChangeKind::AxisChange);
        assert_eq!(merged.payload, Some(serde_json::json!({"step": 2})));
    }
}

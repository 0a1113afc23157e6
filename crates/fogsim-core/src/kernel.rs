//! Discrete-event kernel: the future event queue and entity registry.
//!
//! Events are held in a min-heap ordered by timestamp, with a monotonically
//! increasing sequence number breaking ties FIFO. Two runs with identical
//! inputs therefore produce bit-identical event orderings. The queue also
//! supports targeted cancellation (tombstones), which the transfer engine
//! needs for its cancel-and-reschedule bookkeeping.

use crate::node::NodeId;
use crate::task::TaskId;
use crate::transfer::TransferId;
use std::collections::{BinaryHeap, HashSet};

/// Identifier of a registered simulation entity.
pub type EntityId = usize;

/// Events in the discrete-event simulation. Each variant names its
/// recipient through the ids it carries; the dispatch loop matches
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// Synthetic zero-delay event fired once per registered entity so all
    /// entities begin uniformly when the loop starts.
    Init(EntityId),
    /// A task reaches its generation time on its device.
    TaskGenerated(TaskId),
    /// A transfer's propagation latency has elapsed; bits start flowing.
    TransferFlowStart(TransferId),
    /// A transfer's last bit has arrived.
    TransferCompleted(TransferId),
    /// A task finishes executing on a node.
    ExecutionFinished { node: NodeId, task: TaskId },
    /// Periodic static energy accounting for every node.
    EnergyTick,
    /// Periodic device location update and re-attachment.
    MobilityTick,
}

/// Handle to a scheduled event, used for targeted cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

/// A timestamped event in the future event queue.
#[derive(Debug, Clone)]
struct ScheduledEvent {
    time: f64,
    seq: u64,
    event: SimEvent,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; invert for min-heap semantics.
        other
            .time
            .total_cmp(&self.time)
            .then(other.seq.cmp(&self.seq))
    }
}

/// The future event queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    /// Sequence counter for FIFO tie-breaking and event handles.
    seq: u64,
    /// Tombstones for cancelled events, skipped on pop.
    cancelled: HashSet<u64>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at an absolute simulated time.
    pub fn schedule_at(&mut self, time: f64, event: SimEvent) -> EventHandle {
        assert!(
            time.is_finite() && time >= 0.0,
            "invalid event time {time} for {event:?}"
        );
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(ScheduledEvent { time, seq, event });
        EventHandle(seq)
    }

    /// Cancel a previously scheduled event. Cancelling an already-fired
    /// event is a no-op.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Pop the next live event, skipping tombstones.
    pub fn pop(&mut self) -> Option<(f64, SimEvent)> {
        while let Some(ev) = self.heap.pop() {
            if self.cancelled.remove(&ev.seq) {
                continue;
            }
            return Some((ev.time, ev.event));
        }
        None
    }

    /// Number of live events still queued. Tombstones for events that had
    /// already fired when cancelled are not counted against the heap.
    pub fn len(&self) -> usize {
        self.heap.len().saturating_sub(self.cancelled.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry of active simulation entities. Entities register before the
/// loop starts; [`seed_start_events`](EntityRegistry::seed_start_events)
/// enqueues a zero-delay `Init` per entity.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    names: Vec<String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>) -> EntityId {
        self.names.push(name.into());
        self.names.len() - 1
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.names[id]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Enqueue the synthetic start event for every registered entity, in
    /// registration order.
    pub fn seed_start_events(&self, queue: &mut EventQueue) {
        for id in 0..self.names.len() {
            queue.schedule_at(0.0, SimEvent::Init(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_pop_in_time_order() {
        let mut queue = EventQueue::new();
        queue.schedule_at(3.0, SimEvent::EnergyTick);
        queue.schedule_at(1.0, SimEvent::MobilityTick);
        queue.schedule_at(2.0, SimEvent::TaskGenerated(7));

        assert_eq!(queue.pop().unwrap().1, SimEvent::MobilityTick);
        assert_eq!(queue.pop().unwrap().1, SimEvent::TaskGenerated(7));
        assert_eq!(queue.pop().unwrap().1, SimEvent::EnergyTick);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_ties_break_fifo() {
        let mut queue = EventQueue::new();
        for task in 0..100u64 {
            queue.schedule_at(5.0, SimEvent::TaskGenerated(task));
        }
        for expected in 0..100u64 {
            match queue.pop().unwrap().1 {
                SimEvent::TaskGenerated(task) => assert_eq!(task, expected),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_cancelled_events_are_skipped() {
        let mut queue = EventQueue::new();
        queue.schedule_at(1.0, SimEvent::TaskGenerated(1));
        let handle = queue.schedule_at(2.0, SimEvent::TaskGenerated(2));
        queue.schedule_at(3.0, SimEvent::TaskGenerated(3));

        queue.cancel(handle);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().1, SimEvent::TaskGenerated(1));
        assert_eq!(queue.pop().unwrap().1, SimEvent::TaskGenerated(3));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut queue = EventQueue::new();
        let handle = queue.schedule_at(1.0, SimEvent::EnergyTick);
        assert!(queue.pop().is_some());
        queue.cancel(handle);
        assert!(queue.pop().is_none());
    }

    #[test]
    #[should_panic(expected = "invalid event time")]
    fn test_negative_time_is_rejected() {
        let mut queue = EventQueue::new();
        queue.schedule_at(-1.0, SimEvent::EnergyTick);
    }

    #[test]
    fn test_registry_seeds_init_events() {
        let mut registry = EntityRegistry::new();
        let manager = registry.register("manager");
        let node = registry.register("node-0");

        let mut queue = EventQueue::new();
        registry.seed_start_events(&mut queue);

        assert_eq!(queue.pop().unwrap(), (0.0, SimEvent::Init(manager)));
        assert_eq!(queue.pop().unwrap(), (0.0, SimEvent::Init(node)));
        assert_eq!(registry.name(node), "node-0");
    }
}

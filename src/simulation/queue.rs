//! Scheduled-event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use crate::event::EventShared;
use crate::time::SimTime;

/// An event queued for processing at a given time.
///
/// Entries compare by time in reverse so the `BinaryHeap` pops the earliest
/// one first, with the sequence number breaking ties in insertion order.
struct ScheduledEntry {
    time: SimTime,
    seq: u64,
    event: Rc<EventShared>,
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for ScheduledEntry {}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.time == other.time) && (self.seq == other.seq)
    }
}

/// The scheduled events of a simulation, earliest first.
///
/// Events queued for the same time are pulled in the order they were
/// inserted, which makes runs reproducible.
pub(crate) struct EventQueue {
    heap: BinaryHeap<ScheduledEntry>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Queues an event for processing at the given time.
    pub(crate) fn insert(&mut self, time: SimTime, event: Rc<EventShared>) {
        let seq = self.next_seq;
        assert_ne!(seq, u64::MAX);
        self.next_seq += 1;

        self.heap.push(ScheduledEntry { time, seq, event });
    }

    /// Pulls the earliest entry, breaking time ties in insertion order.
    pub(crate) fn pull(&mut self) -> Option<(SimTime, Rc<EventShared>)> {
        let ScheduledEntry { time, event, .. } = self.heap.pop()?;

        Some((time, event))
    }

    /// Returns the time of the earliest entry, leaving it in the queue.
    pub(crate) fn next_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|entry| entry.time)
    }

    /// Whether no events are queued.
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

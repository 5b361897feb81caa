use std::cmp::{Eq, Ordering, PartialEq};
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::EmptyQueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Arrival,
    ServiceCompletion,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Arrival => "arrival",
            EventKind::ServiceCompletion => "service_completion",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happens at a point in logical time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
}

impl Event {
    pub fn arrival(time: f64) -> Self {
        Event {
            time,
            kind: EventKind::Arrival,
        }
    }

    pub fn service_completion(time: f64) -> Self {
        Event {
            time,
            kind: EventKind::ServiceCompletion,
        }
    }
}

struct ScheduledEvent {
    event: Event,
    sequence: u64,
}

// Reversed so the max-heap yields the earliest event; equal times fall back
// to insertion order.
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .time
            .total_cmp(&other.event.time)
            .then(self.sequence.cmp(&other.sequence))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

/// Pending events, ordered by time.
///
/// Events with equal times come out in the order they were inserted.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, event: Event) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledEvent { event, sequence });
    }

    pub fn pop_earliest(&mut self) -> Result<Event, EmptyQueueError> {
        self.heap
            .pop()
            .map(|scheduled| scheduled.event)
            .ok_or(EmptyQueueError)
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|scheduled| scheduled.event.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events of `kind`.
    pub fn pending(&self, kind: EventKind) -> usize {
        self.heap
            .iter()
            .filter(|scheduled| scheduled.event.kind == kind)
            .count()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.heap.len())
            .field("next_time", &self.peek_time())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn pop_on_empty_queue_fails() {
        let mut queue = EventQueue::new();
        assert_eq!(queue.pop_earliest(), Err(EmptyQueueError));
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.insert(Event::arrival(3.0));
        queue.insert(Event::service_completion(1.0));
        queue.insert(Event::arrival(2.0));

        assert_eq!(queue.peek_time(), Some(1.0));
        assert_eq!(queue.pop_earliest().unwrap().time, 1.0);
        assert_eq!(queue.pop_earliest().unwrap().time, 2.0);
        assert_eq!(queue.pop_earliest().unwrap().time, 3.0);
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut queue = EventQueue::new();
        queue.insert(Event::service_completion(5.0));
        queue.insert(Event::arrival(5.0));
        queue.insert(Event::arrival(4.0));
        queue.insert(Event::service_completion(5.0));

        let kinds: Vec<EventKind> = (0..4).map(|_| queue.pop_earliest().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Arrival,
                EventKind::ServiceCompletion,
                EventKind::Arrival,
                EventKind::ServiceCompletion,
            ]
        );
    }

    #[test]
    fn interior_insert_lands_after_earlier_events() {
        // An event inserted between two others must not jump ahead of the earlier one.
        let mut queue = EventQueue::new();
        queue.insert(Event::arrival(1.0));
        queue.insert(Event::arrival(3.0));
        queue.insert(Event::service_completion(2.0));

        let times: Vec<f64> = (0..3).map(|_| queue.pop_earliest().unwrap().time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn random_interleaving_pops_non_decreasing() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(11);
        let mut queue = EventQueue::new();
        let mut last = f64::NEG_INFINITY;

        for _ in 0..1_000 {
            for _ in 0..rng.gen_range(0..4) {
                queue.insert(Event::arrival(last.max(0.0) + rng.gen_range(0.0..10.0)));
            }
            if let Ok(event) = queue.pop_earliest() {
                assert!(event.time >= last);
                last = event.time;
            }
        }
        while let Ok(event) = queue.pop_earliest() {
            assert!(event.time >= last);
            last = event.time;
        }
    }

    #[test]
    fn counts_pending_by_kind() {
        let mut queue = EventQueue::new();
        queue.insert(Event::arrival(1.0));
        queue.insert(Event::service_completion(2.0));
        queue.insert(Event::arrival(3.0));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending(EventKind::Arrival), 2);
        assert_eq!(queue.pending(EventKind::ServiceCompletion), 1);
    }
}

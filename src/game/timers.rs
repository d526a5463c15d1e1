//! Scheduled-event queue polled by the tick engine

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use uuid::Uuid;

/// Deferred action owned by an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Bring a dead participant back
    Respawn { participant_id: Uuid },
    /// Planted objective resolves in the attackers' favour
    ObjectiveDetonation { plant_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    fire_at: u64,
    seq: u64,
    kind: TimerKind,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of timers keyed by fire time; insertion order breaks ties.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn schedule(&mut self, fire_at: u64, kind: TimerKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { fire_at, seq, kind }));
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn pop_due(&mut self, now: u64) -> Vec<TimerKind> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.fire_at > now {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry.kind);
            }
        }
        due
    }

    /// Fire time of a pending timer
    pub fn fire_time(&self, kind: &TimerKind) -> Option<u64> {
        self.heap
            .iter()
            .find(|Reverse(s)| &s.kind == kind)
            .map(|Reverse(s)| s.fire_at)
    }

    /// Drop every timer matching `pred`; returns how many were cancelled
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&TimerKind) -> bool,
    {
        let before = self.heap.len();
        self.heap.retain(|Reverse(s)| !pred(&s.kind));
        before - self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respawn(id: Uuid) -> TimerKind {
        TimerKind::Respawn { participant_id: id }
    }

    #[test]
    fn pops_in_fire_time_order() {
        let mut q = TimerQueue::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        q.schedule(300, respawn(a));
        q.schedule(100, respawn(b));
        q.schedule(200, respawn(c));

        assert!(q.pop_due(50).is_empty());
        assert_eq!(q.pop_due(250), vec![respawn(b), respawn(c)]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(300), vec![respawn(a)]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_fire_times_keep_insertion_order() {
        let mut q = TimerQueue::new();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            q.schedule(10, respawn(*id));
        }
        let expected: Vec<TimerKind> = ids.iter().map(|id| respawn(*id)).collect();
        assert_eq!(q.pop_due(10), expected);
    }

    #[test]
    fn cancel_removes_matching_entries() {
        let mut q = TimerQueue::new();
        let id = Uuid::new_v4();
        q.schedule(100, respawn(id));
        q.schedule(500, TimerKind::ObjectiveDetonation { plant_id: 1 });

        let cancelled =
            q.cancel_where(|k| matches!(k, TimerKind::ObjectiveDetonation { .. }));
        assert_eq!(cancelled, 1);
        assert_eq!(q.fire_time(&respawn(id)), Some(100));
        assert!(q.pop_due(1_000).iter().all(|k| matches!(k, TimerKind::Respawn { .. })));
    }
}

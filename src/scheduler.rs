// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Chain Merge Visualizer - Delayed Action Queue
//
// Side effects that must happen later (staggered particles, preset chains)
// are queued here by wall-clock due time and drained at the top of each tick.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::config::ChainPreset;
use crate::types::{ActionId, BlockRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// Launch the particle carrying a merged block's event to its action.
    SpawnEventParticle { action: ActionId, block: BlockRef, color: String },
    /// Add a chain from the start-up schedule.
    AddChain(ChainPreset),
}

#[derive(Debug, Clone)]
struct Entry {
    due: f64,
    seq: u64,
    task: Deferred,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // (due ASC, seq ASC): equal due times drain in scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.total_cmp(&other.due).then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DelayedQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

impl DelayedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, task: Deferred) {
        self.seq += 1;
        self.heap.push(Reverse(Entry { due, seq: self.seq, task }));
    }

    /// Pop everything due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<Deferred> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.due > now {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drop pending tasks matching `pred` (e.g. particles for a removed chain).
    pub fn retain<F: FnMut(&Deferred) -> bool>(&mut self, mut pred: F) {
        let entries = std::mem::take(&mut self.heap).into_vec();
        self.heap = entries.into_iter().filter(|Reverse(e)| pred(&e.task)).collect();
    }

    pub(crate) fn shift_timestamps(&mut self, delta: f64) {
        let entries = std::mem::take(&mut self.heap).into_vec();
        self.heap = entries
            .into_iter()
            .map(|Reverse(mut e)| {
                e.due += delta;
                Reverse(e)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::xai_preset;
    use crate::types::ChainId;

    fn particle(action: u64) -> Deferred {
        Deferred::SpawnEventParticle {
            action: ActionId(action),
            block: BlockRef { chain: ChainId(1), index: 0 },
            color: "#fff".into(),
        }
    }

    #[test]
    fn drains_in_due_then_schedule_order() {
        let mut q = DelayedQueue::new();
        q.schedule(200.0, particle(3));
        q.schedule(100.0, particle(1));
        q.schedule(100.0, particle(2));
        q.schedule(500.0, Deferred::AddChain(xai_preset(500.0)));
        assert_eq!(q.drain_due(50.0), vec![]);
        assert_eq!(q.drain_due(200.0), vec![particle(1), particle(2), particle(3)]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(500.0));
    }

    #[test]
    fn shift_delays_everything() {
        let mut q = DelayedQueue::new();
        q.schedule(100.0, particle(1));
        q.shift_timestamps(1_000.0);
        assert!(q.drain_due(500.0).is_empty());
        assert_eq!(q.drain_due(1_100.0), vec![particle(1)]);
    }

    #[test]
    fn retain_filters_pending() {
        let mut q = DelayedQueue::new();
        q.schedule(100.0, particle(1));
        q.schedule(100.0, Deferred::AddChain(xai_preset(100.0)));
        q.retain(|t| matches!(t, Deferred::AddChain(_)));
        assert_eq!(q.len(), 1);
        q.clear();
        assert!(q.is_empty());
    }
}

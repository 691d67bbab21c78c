//! Delayed task queue keyed by tick number.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Work items waiting for a future tick.
///
/// Tasks due on the same tick come out in the order they were scheduled.
/// The queue is plain data; the owner decides what a task is and runs it.
#[derive(Debug)]
pub struct TaskQueue<T> {
    /// Min-heap on `(due_tick, seq)`. `seq` keeps FIFO order among
    /// tasks due on the same tick.
    heap: BinaryHeap<Reverse<(u64, u64, Slot<T>)>>,
    next_seq: u64,
}

/// Wrapper that opts the payload out of heap ordering.
#[derive(Debug)]
struct Slot<T>(T);

impl<T> PartialEq for Slot<T> {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, _: &Self) -> std::cmp::Ordering {
        std::cmp::Ordering::Equal
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to run `delay_ticks` after `current_tick`.
    ///
    /// A delay of 0 still waits for the next tick boundary; nothing
    /// scheduled from inside a tick runs in that same tick.
    pub fn schedule(&mut self, current_tick: u64, delay_ticks: u64, task: T) {
        let due = current_tick + delay_ticks.max(1);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((due, seq, Slot(task))));
    }

    /// Removes and returns every task due at or before `tick`, earliest
    /// first.
    pub fn drain_due(&mut self, tick: u64) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(Reverse((due_tick, _, _))) = self.heap.peek() {
            if *due_tick > tick {
                break;
            }
            if let Some(Reverse((_, _, Slot(task)))) = self.heap.pop() {
                due.push(task);
            }
        }
        due
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use super::{Task, TaskHandle};

/// One queued unit of work with its absolute due time.
pub(crate) struct ScheduledEntry {
  pub due: Duration,
  pub seq: usize,
  pub task: Task,
  pub handle: TaskHandle,
}

impl PartialEq for ScheduledEntry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for ScheduledEntry {}

impl PartialOrd for ScheduledEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earliest due time first, then FIFO by sequence number.
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Due-time-ordered work queue with stable insertion order for ties.
#[derive(Default)]
pub(crate) struct DueQueue {
  heap: BinaryHeap<ScheduledEntry>,
  next_seq: usize,
}

impl DueQueue {
  pub fn push(&mut self, due: Duration, task: Task, handle: TaskHandle) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(ScheduledEntry { due, seq, task, handle });
  }

  /// Pop the earliest entry, restricted to entries due at or before `limit`
  /// when one is given.
  pub fn pop_due(&mut self, limit: Option<Duration>) -> Option<ScheduledEntry> {
    let head_due = self.heap.peek()?.due;
    if limit.is_some_and(|limit| head_due > limit) {
      return None;
    }
    self.heap.pop()
  }

  pub fn peek_due(&self) -> Option<Duration> { self.heap.peek().map(|e| e.due) }

  pub fn len(&self) -> usize { self.heap.len() }

  pub fn is_empty(&self) -> bool { self.heap.is_empty() }
}

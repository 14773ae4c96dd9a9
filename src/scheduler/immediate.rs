use std::thread;
use std::time::Duration;

use super::{clock_now, Scheduler, Task, TaskHandle};

/// Runs every task synchronously on the calling thread.
///
/// The delayed variants sleep the calling thread until the due time before
/// running. A panicking task unwinds straight into the caller of `schedule`.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
  pub fn new() -> Self { ImmediateScheduler }
}

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Duration { clock_now() }

  fn schedule(&self, task: Task) -> TaskHandle {
    task();
    TaskHandle::finished()
  }

  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle {
    let now = clock_now();
    if due > now {
      thread::sleep(due - now);
    }
    task();
    TaskHandle::finished()
  }
}

use std::cell::RefCell;
use std::thread;
use std::time::Duration;

use super::{clock_now, queue::DueQueue, Scheduler, Task, TaskHandle};

/// Per-thread trampoline scheduler.
///
/// The first `schedule` call on a thread with no dispatch running becomes the
/// drain loop: it runs the scheduled task and every task recursively
/// scheduled from inside it, in due-time order, on the same thread, before
/// returning. Nested `schedule` calls merely enqueue. This flattens
/// recursively-defined streams into iteration instead of growing the call
/// stack.
#[derive(Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

#[derive(Default)]
struct Trampoline {
  queue: DueQueue,
  draining: bool,
}

thread_local! {
  static TRAMPOLINE: RefCell<Trampoline> = RefCell::new(Trampoline::default());
}

/// Resets the draining flag even when a task unwinds, so the thread's
/// trampoline stays usable afterwards.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) {
    TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      t.draining = false;
    });
  }
}

impl CurrentThreadScheduler {
  pub fn new() -> Self { CurrentThreadScheduler }

  /// Whether a `schedule` call on this thread would have to enter the
  /// trampoline itself (true), or merely enqueue onto a dispatch that is
  /// already running (false).
  pub fn is_schedule_required() -> bool { TRAMPOLINE.with(|t| !t.borrow().draining) }
}

impl Scheduler for CurrentThreadScheduler {
  fn now(&self) -> Duration { clock_now() }

  fn schedule(&self, task: Task) -> TaskHandle { self.schedule_at(clock_now(), task) }

  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let already_draining = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      t.queue.push(due, task, handle.clone());
      std::mem::replace(&mut t.draining, true)
    });

    if !already_draining {
      let _guard = DrainGuard;
      loop {
        // The queue borrow must end before the task runs, so tasks can
        // re-enter `schedule`.
        let entry = TRAMPOLINE.with(|t| t.borrow_mut().queue.pop_due(None));
        let Some(entry) = entry else { break };
        if entry.handle.is_cancelled() {
          continue;
        }
        let now = clock_now();
        if entry.due > now {
          thread::sleep(entry.due - now);
        }
        (entry.task)();
        entry.handle.mark_finished();
      }
    }
    handle
  }
}

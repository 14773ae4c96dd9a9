use std::time::Duration;

use tokio::runtime::Handle;

use super::{clock_now, run_pooled, Scheduler, Task, TaskHandle};

/// Dispatches tasks onto a tokio runtime.
///
/// Construct it from an explicit [`Handle`], or with [`TaskPoolScheduler::current`]
/// inside a running runtime. Same cancellation and panic semantics as the
/// futures-backed pool scheduler.
#[derive(Clone)]
pub struct TaskPoolScheduler {
  handle: Handle,
}

impl TaskPoolScheduler {
  pub fn new(handle: Handle) -> Self { TaskPoolScheduler { handle } }

  /// The runtime the calling context runs on.
  ///
  /// # Panics
  ///
  /// Panics when called outside a tokio runtime.
  pub fn current() -> Self { TaskPoolScheduler { handle: Handle::current() } }
}

impl Scheduler for TaskPoolScheduler {
  fn now(&self) -> Duration { clock_now() }

  fn schedule(&self, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    let _join = self
      .handle
      .spawn(async move { run_pooled(&task_handle, task) });
    handle
  }

  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    let _join = self.handle.spawn(async move {
      let now = clock_now();
      if due > now {
        tokio::time::sleep(due - now).await;
      }
      run_pooled(&task_handle, task);
    });
    handle
  }
}

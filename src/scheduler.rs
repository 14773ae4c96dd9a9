//! Scheduler contract and implementations.
//!
//! A [`Scheduler`] decouples "run this action, optionally after a delay or at
//! an absolute time" from the actual thread/timer mechanics. Stream logic
//! only ever talks to the contract, so the same pipeline can run on the
//! calling thread, on a pool, or against a manually advanced virtual clock.
//!
//! Time is a [`Duration`] elapsed since a clock epoch: the process-wide
//! monotonic epoch for real schedulers, or zero for a fresh
//! [`VirtualTimeScheduler`]. Recursive scheduling is done by capturing a
//! clone of the scheduler in the action itself.

mod current_thread;
mod immediate;
mod queue;
#[cfg(feature = "tokio-scheduler")]
mod task_pool;
#[cfg(feature = "futures-scheduler")]
mod thread_pool;
mod virtual_time;

pub use current_thread::CurrentThreadScheduler;
pub use immediate::ImmediateScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use task_pool::TaskPoolScheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool::ThreadPoolScheduler;
pub use virtual_time::VirtualTimeScheduler;

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::subscription::{CancelToken, Subscription};

/// One unit of deferred work. State rides in the closure's environment.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The process-wide epoch every real-time scheduler measures against.
static CLOCK_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Elapsed real time since the process clock epoch.
pub(crate) fn clock_now() -> Duration { CLOCK_EPOCH.elapsed() }

/// The scheduling contract.
pub trait Scheduler {
  /// The scheduler's notion of the current time.
  fn now(&self) -> Duration;

  /// Run `task` as soon as possible.
  fn schedule(&self, task: Task) -> TaskHandle;

  /// Run `task` once the scheduler clock reaches `due`.
  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle;

  /// Run `task` after `delay` has elapsed on the scheduler clock.
  fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
    self.schedule_at(self.now() + delay, task)
  }
}

/// Cancellation handle for a scheduled task.
///
/// Closed once the task was cancelled or has finished running. Cancellation
/// is best-effort: a task that already started cannot be interrupted.
#[derive(Clone, Default)]
pub struct TaskHandle {
  token: CancelToken,
  finished: Arc<AtomicBool>,
}

impl TaskHandle {
  pub(crate) fn new() -> Self { Self::default() }

  /// A handle for work that already ran to completion.
  pub(crate) fn finished() -> Self {
    let handle = Self::default();
    handle.mark_finished();
    handle
  }

  #[inline]
  pub(crate) fn mark_finished(&self) { self.finished.store(true, Ordering::SeqCst) }

  #[inline]
  pub(crate) fn is_cancelled(&self) -> bool { self.token.is_cancelled() }
}

impl Subscription for TaskHandle {
  #[inline]
  fn unsubscribe(&mut self) { self.token.cancel() }

  fn is_closed(&self) -> bool {
    self.token.is_cancelled() || self.finished.load(Ordering::SeqCst)
  }
}

/// Run a task on a pool worker: skip it when cancelled, and keep the worker
/// alive if the task panics by re-raising the payload on a detached thread,
/// where the process-level panic policy applies.
#[cfg(any(feature = "futures-scheduler", feature = "tokio-scheduler"))]
pub(crate) fn run_pooled(handle: &TaskHandle, task: Task) {
  if handle.is_cancelled() {
    log::trace!("scheduled task cancelled before it ran");
    return;
  }
  let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
  handle.mark_finished();
  if let Err(payload) = result {
    log::error!("scheduled task panicked on a pool worker; re-raising on a detached thread");
    std::thread::spawn(move || std::panic::resume_unwind(payload));
  }
}

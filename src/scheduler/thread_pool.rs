use std::time::Duration;

use futures::executor::ThreadPool;
use futures::task::SpawnExt;
use once_cell::sync::Lazy;

use super::{clock_now, run_pooled, Scheduler, Task, TaskHandle};

static DEFAULT_POOL: Lazy<ThreadPool> =
  Lazy::new(|| ThreadPool::new().expect("create default thread pool"));

/// Dispatches tasks onto a `futures` thread pool.
///
/// Delayed scheduling rides an executor-agnostic timer. The returned handle
/// cancels the task best-effort: the flag is checked immediately before the
/// task runs, so work that already started keeps running.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl Default for ThreadPoolScheduler {
  /// The shared process-wide pool.
  fn default() -> Self { ThreadPoolScheduler { pool: DEFAULT_POOL.clone() } }
}

impl ThreadPoolScheduler {
  pub fn new(pool: ThreadPool) -> Self { ThreadPoolScheduler { pool } }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> Duration { clock_now() }

  fn schedule(&self, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    self
      .pool
      .spawn(async move { run_pooled(&task_handle, task) })
      .expect("spawn on thread pool");
    handle
  }

  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let task_handle = handle.clone();
    self
      .pool
      .spawn(async move {
        let now = clock_now();
        if due > now {
          futures_time::task::sleep((due - now).into()).await;
        }
        run_pooled(&task_handle, task);
      })
      .expect("spawn on thread pool");
    handle
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::Subscription;
  use std::sync::mpsc::channel;
  use std::sync::{Arc, Mutex};
  use std::thread;
  use std::time::Instant;

  #[test]
  fn runs_off_the_calling_thread() {
    let scheduler = ThreadPoolScheduler::default();
    let (tx, rx) = channel();
    let caller = thread::current().id();
    scheduler.schedule(Box::new(move || {
      tx.send(thread::current().id()).unwrap();
    }));
    let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(worker, caller);
  }

  #[test]
  fn delayed_task_waits_for_its_due_time() {
    let scheduler = ThreadPoolScheduler::default();
    let (tx, rx) = channel();
    let start = Instant::now();
    scheduler.schedule_after(Duration::from_millis(30), Box::new(move || {
      tx.send(()).unwrap();
    }));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(30));
  }

  #[test]
  fn cancel_before_run_suppresses_the_task() {
    let scheduler = ThreadPoolScheduler::default();
    let fired = Arc::new(Mutex::new(false));
    let c_fired = fired.clone();
    let mut handle = scheduler.schedule_after(
      Duration::from_millis(50),
      Box::new(move || *c_fired.lock().unwrap() = true),
    );
    handle.unsubscribe();
    thread::sleep(Duration::from_millis(120));
    assert!(!*fired.lock().unwrap());
    assert!(handle.is_closed());
  }

  #[test]
  fn panicking_task_does_not_poison_the_pool() {
    let scheduler = ThreadPoolScheduler::default();
    scheduler.schedule(Box::new(|| panic!("worker task failed")));
    thread::sleep(Duration::from_millis(80));

    // The panic was re-raised off the worker; the pool still runs work.
    let (tx, rx) = channel();
    scheduler.schedule(Box::new(move || tx.send(()).unwrap()));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
  }
}

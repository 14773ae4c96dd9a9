use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{queue::DueQueue, Scheduler, Task, TaskHandle};

/// A scheduler with an explicit, manually advanced clock.
///
/// The clock starts at zero and only moves when [`advance_to`],
/// [`advance_by`] or [`flush`] is called, which makes timing-dependent
/// pipelines fully deterministic: queued work runs in (due time, insertion
/// order), and the clock lands on each entry's due time as it fires.
///
/// State is owned by the instance: create one per test and pass clones
/// wherever a scheduler is consumed.
///
/// [`advance_to`]: VirtualTimeScheduler::advance_to
/// [`advance_by`]: VirtualTimeScheduler::advance_by
/// [`flush`]: VirtualTimeScheduler::flush
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler {
  core: Arc<Mutex<VirtualCore>>,
}

#[derive(Default)]
struct VirtualCore {
  clock: Duration,
  queue: DueQueue,
  advancing: bool,
}

/// Clears the advancing flag even when a task unwinds.
struct AdvanceGuard {
  core: Arc<Mutex<VirtualCore>>,
}

impl Drop for AdvanceGuard {
  fn drop(&mut self) {
    // Runs during unwinding too, so a poisoned lock must not double-panic.
    let mut core = match self.core.lock() {
      Ok(core) => core,
      Err(poisoned) => poisoned.into_inner(),
    };
    core.advancing = false;
  }
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of queued entries that have not run yet.
  pub fn pending_count(&self) -> usize { self.core.lock().unwrap().queue.len() }

  /// Move the clock to `target`, running every queued entry due at or before
  /// it, in (due time, insertion order). Entries scheduled by running tasks
  /// join the same pass when they fall inside the target.
  ///
  /// # Panics
  ///
  /// Panics when called from inside a task this scheduler is currently
  /// running (re-entrant advancement), or when `target` is behind the clock.
  pub fn advance_to(&self, target: Duration) {
    {
      let mut core = self.core.lock().unwrap();
      assert!(!core.advancing, "advance re-entered while an advance is already running");
      assert!(target >= core.clock, "cannot move the virtual clock backwards");
      core.advancing = true;
    }
    let _guard = AdvanceGuard { core: self.core.clone() };

    loop {
      // Pop under the lock, run outside it so tasks can schedule more work.
      let entry = {
        let mut core = self.core.lock().unwrap();
        let entry = core.queue.pop_due(Some(target));
        if let Some(entry) = &entry {
          core.clock = core.clock.max(entry.due);
        }
        entry
      };
      let Some(entry) = entry else { break };
      if entry.handle.is_cancelled() {
        continue;
      }
      (entry.task)();
      entry.handle.mark_finished();
    }

    self.core.lock().unwrap().clock = target;
  }

  /// Move the clock forward by `delta`. See [`advance_to`].
  ///
  /// [`advance_to`]: VirtualTimeScheduler::advance_to
  pub fn advance_by(&self, delta: Duration) {
    let target = self.core.lock().unwrap().clock + delta;
    self.advance_to(target);
  }

  /// Run the queue dry, advancing the clock to each entry's due time.
  pub fn flush(&self) {
    loop {
      let next = {
        let core = self.core.lock().unwrap();
        core.queue.peek_due().map(|due| due.max(core.clock))
      };
      match next {
        Some(target) => self.advance_to(target),
        None => break,
      }
    }
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration { self.core.lock().unwrap().clock }

  fn schedule(&self, task: Task) -> TaskHandle {
    let due = self.now();
    self.schedule_at(due, task)
  }

  fn schedule_at(&self, due: Duration, task: Task) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut core = self.core.lock().unwrap();
    core.queue.push(due, task, handle.clone());
    handle
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subscription::Subscription;
  use std::sync::{Arc, Mutex};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  #[test]
  fn advance_runs_exactly_the_due_entries_in_order() {
    let scheduler = VirtualTimeScheduler::new();
    let order = Arc::new(Mutex::new(vec![]));
    for (label, due) in [("c", 30u64), ("a", 10), ("b", 20), ("late", 99)] {
      let order = order.clone();
      scheduler.schedule_at(ms(due), Box::new(move || order.lock().unwrap().push(label)));
    }

    scheduler.advance_to(ms(30));
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(scheduler.now(), ms(30));
    assert_eq!(scheduler.pending_count(), 1);
  }

  #[test]
  fn ties_fire_in_insertion_order() {
    let scheduler = VirtualTimeScheduler::new();
    let order = Arc::new(Mutex::new(vec![]));
    for label in ["first", "second", "third"] {
      let order = order.clone();
      scheduler.schedule_at(ms(5), Box::new(move || order.lock().unwrap().push(label)));
    }
    scheduler.advance_by(ms(5));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
  }

  #[test]
  fn clock_lands_on_each_due_time_while_firing() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    for due in [10u64, 25] {
      let seen = seen.clone();
      let probe = scheduler.clone();
      scheduler.schedule_at(ms(due), Box::new(move || seen.lock().unwrap().push(probe.now())));
    }
    scheduler.advance_to(ms(40));
    assert_eq!(*seen.lock().unwrap(), vec![ms(10), ms(25)]);
    assert_eq!(scheduler.now(), ms(40));
  }

  #[test]
  fn tasks_scheduled_during_a_pass_join_it_when_due() {
    let scheduler = VirtualTimeScheduler::new();
    let order = Arc::new(Mutex::new(vec![]));
    let c_order = order.clone();
    let inner = scheduler.clone();
    scheduler.schedule_at(
      ms(10),
      Box::new(move || {
        c_order.lock().unwrap().push("outer");
        let order = c_order.clone();
        inner.schedule_at(ms(15), Box::new(move || order.lock().unwrap().push("inner")));
      }),
    );
    scheduler.advance_to(ms(20));
    assert_eq!(*order.lock().unwrap(), vec!["outer", "inner"]);
  }

  #[test]
  #[should_panic(expected = "re-entered")]
  fn reentrant_advance_is_rejected() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = scheduler.clone();
    scheduler.schedule(Box::new(move || inner.advance_by(ms(1))));
    scheduler.advance_by(ms(1));
  }

  #[test]
  #[should_panic(expected = "backwards")]
  fn backwards_advance_is_rejected() {
    let scheduler = VirtualTimeScheduler::new();
    scheduler.advance_to(ms(10));
    scheduler.advance_to(ms(5));
  }

  #[test]
  fn cancelled_entries_are_skipped() {
    let scheduler = VirtualTimeScheduler::new();
    let fired = Arc::new(Mutex::new(false));
    let c_fired = fired.clone();
    let mut handle =
      scheduler.schedule_at(ms(5), Box::new(move || *c_fired.lock().unwrap() = true));
    handle.unsubscribe();
    scheduler.advance_to(ms(10));
    assert!(!*fired.lock().unwrap());
  }

  #[test]
  fn flush_runs_the_queue_dry() {
    let scheduler = VirtualTimeScheduler::new();
    let count = Arc::new(Mutex::new(0));
    for due in [5u64, 50, 500] {
      let count = count.clone();
      scheduler.schedule_at(ms(due), Box::new(move || *count.lock().unwrap() += 1));
    }
    scheduler.flush();
    assert_eq!(*count.lock().unwrap(), 3);
    assert_eq!(scheduler.now(), ms(500));
    assert_eq!(scheduler.pending_count(), 0);
  }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{
  subscribers::{share_observer, SharedObserver},
  SubjectState,
};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subscription::SingleSubscription;

/// Multicast subject that replays a bounded history to new subscribers.
///
/// History is bounded by a maximum entry count and/or a maximum age; either
/// bound may be absent. Entry age is measured against the *scheduler's*
/// clock, so a [`VirtualTimeScheduler`] makes window trimming fully
/// deterministic in tests.
///
/// A new subscriber receives the trimmed history in original order, and then,
/// depending on the subject's phase, goes live or gets the terminal
/// notification. One lock covers the buffer and the audience.
///
/// [`VirtualTimeScheduler`]: crate::scheduler::VirtualTimeScheduler
pub struct ReplaySubject<Item, Err> {
  core: Arc<ReplayCore<Item, Err>>,
}

struct ReplayCore<Item, Err> {
  inner: Mutex<ReplayInner<Item, Err>>,
  scheduler: Arc<dyn Scheduler + Send + Sync>,
  max_count: usize,
  window: Option<Duration>,
}

struct ReplayInner<Item, Err> {
  state: SubjectState<Item, Err>,
  buffer: VecDeque<(Duration, Item)>,
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { ReplaySubject { core: self.core.clone() } }
}

impl<Item, Err> ReplaySubject<Item, Err> {
  /// Keep the whole history.
  pub fn unbounded() -> Self { Self::build(usize::MAX, None, Arc::new(ImmediateScheduler)) }

  /// Keep at most the `count` most recent values.
  pub fn with_count(count: usize) -> Self {
    Self::build(count, None, Arc::new(ImmediateScheduler))
  }

  /// Keep only values younger than `window` on `scheduler`'s clock.
  pub fn with_window<S>(window: Duration, scheduler: S) -> Self
  where
    S: Scheduler + Send + Sync + 'static,
  {
    Self::build(usize::MAX, Some(window), Arc::new(scheduler))
  }

  /// Bound the history by count and age at once.
  pub fn with_count_and_window<S>(count: usize, window: Duration, scheduler: S) -> Self
  where
    S: Scheduler + Send + Sync + 'static,
  {
    Self::build(count, Some(window), Arc::new(scheduler))
  }

  fn build(
    max_count: usize, window: Option<Duration>, scheduler: Arc<dyn Scheduler + Send + Sync>,
  ) -> Self {
    ReplaySubject {
      core: Arc::new(ReplayCore {
        inner: Mutex::new(ReplayInner {
          state: SubjectState::default(),
          buffer: VecDeque::new(),
        }),
        scheduler,
        max_count,
        window,
      }),
    }
  }

  pub fn subscriber_count(&self) -> usize { self.core.inner.lock().unwrap().state.audience_len() }

  pub fn has_observers(&self) -> bool { self.subscriber_count() > 0 }

  /// Number of values currently held for replay.
  pub fn buffered_len(&self) -> usize { self.core.inner.lock().unwrap().buffer.len() }

  /// Shut the subject down. Idempotent; any use afterwards panics.
  pub fn dispose(&self) { self.core.inner.lock().unwrap().state.dispose(); }
}

impl<Item, Err> ReplayCore<Item, Err> {
  /// Drop from the front while either bound is exceeded.
  fn trim(&self, buffer: &mut VecDeque<(Duration, Item)>, now: Duration) {
    while buffer.len() > self.max_count {
      buffer.pop_front();
    }
    if let Some(window) = self.window {
      while buffer
        .front()
        .is_some_and(|(stamp, _)| now.saturating_sub(*stamp) > window)
      {
        buffer.pop_front();
      }
    }
  }
}

impl<Item, Err> Observer<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let snapshot = {
      let mut inner = self.core.inner.lock().unwrap();
      let snapshot = inner.state.dispatch_snapshot();
      if snapshot.is_some() {
        let now = self.core.scheduler.now();
        inner.buffer.push_back((now, value.clone()));
        self.core.trim(&mut inner.buffer, now);
      }
      snapshot
    };
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_value(value);
    }
  }

  fn error(&mut self, err: Err) {
    let snapshot = self
      .core
      .inner
      .lock()
      .unwrap()
      .state
      .terminate(Some(err.clone()));
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_error(err);
    }
  }

  fn complete(&mut self) {
    let snapshot = self.core.inner.lock().unwrap().state.terminate(None);
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_complete();
    }
  }

  fn is_closed(&self) -> bool { !self.core.inner.lock().unwrap().state.is_active() }
}

impl<Item, Err> Observable<Item, Err> for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SingleSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let shared: SharedObserver<Item, Err> = share_observer(observer);
    let replay = {
      let mut inner = self.core.inner.lock().unwrap();
      let now = self.core.scheduler.now();

      // Replay happens under the lock: history and membership stay
      // consistent for the newcomer.
      let terminal = match &inner.state {
        SubjectState::Active(_) => None,
        SubjectState::Terminated(err) => Some(err.clone()),
        SubjectState::Disposed => panic!("subscribe on a disposed subject"),
      };

      let ReplayInner { state, buffer } = &mut *inner;
      self.core.trim(buffer, now);
      {
        let mut observer = shared.lock().unwrap();
        for (_, value) in buffer.iter() {
          observer.next(value.clone());
        }
        match &terminal {
          Some(Some(err)) => observer.error(err.clone()),
          Some(None) => observer.complete(),
          None => {}
        }
      }
      if terminal.is_none() {
        state.insert_observer(shared.clone());
      }
      terminal
    };

    match replay {
      None => {
        let core = self.core.clone();
        SingleSubscription::new(move || {
          core.inner.lock().unwrap().state.remove_observer(&shared);
        })
      }
      Some(_) => SingleSubscription::closed(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observable::ObservableExt;
  use crate::scheduler::VirtualTimeScheduler;
  use std::sync::{Arc, Mutex};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  #[test]
  fn unbounded_replays_everything_in_order() {
    let subject = ReplaySubject::<i32, ()>::unbounded();
    for v in 1..=4 {
      subject.clone().next(v);
    }

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);

    subject.clone().next(5);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn count_bound_keeps_only_the_tail() {
    let subject = ReplaySubject::<i32, ()>::with_count(2);
    subject.clone().next(1);
    subject.clone().next(2);
    subject.clone().next(3);

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);

    // Still live afterwards.
    subject.clone().next(4);
    assert_eq!(*seen.lock().unwrap(), vec![2, 3, 4]);
  }

  #[test]
  fn window_bound_trims_by_scheduler_time() {
    let clock = VirtualTimeScheduler::new();
    let subject = ReplaySubject::<i32, ()>::with_window(ms(10), clock.clone());

    subject.clone().next(1);
    clock.advance_by(ms(6));
    subject.clone().next(2);
    clock.advance_by(ms(6));
    // 1 is now 12ms old and falls out; 2 is 6ms old and stays.
    subject.clone().next(3);

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
  }

  #[test]
  fn subscribe_time_trimming_uses_the_current_clock() {
    let clock = VirtualTimeScheduler::new();
    let subject = ReplaySubject::<i32, ()>::with_window(ms(10), clock.clone());
    subject.clone().next(1);
    subject.clone().next(2);

    // Let the whole buffer age out before anyone subscribes.
    clock.advance_by(ms(30));
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert!(seen.lock().unwrap().is_empty());
  }

  #[test]
  fn count_and_window_compose() {
    let clock = VirtualTimeScheduler::new();
    let subject = ReplaySubject::<i32, ()>::with_count_and_window(2, ms(100), clock.clone());
    subject.clone().next(1);
    subject.clone().next(2);
    subject.clone().next(3);
    assert_eq!(subject.buffered_len(), 2);
  }

  #[test]
  fn history_replays_before_the_terminal_notification() {
    let subject = ReplaySubject::<i32, &str>::unbounded();
    subject.clone().next(1);
    subject.clone().next(2);
    subject.clone().error("done for");

    let log = Arc::new(Mutex::new(vec![]));
    let c_values = log.clone();
    let c_err = log.clone();
    subject.clone().subscribe_err(
      move |v| c_values.lock().unwrap().push(format!("next {v}")),
      move |e| c_err.lock().unwrap().push(format!("err {e}")),
    );
    assert_eq!(
      *log.lock().unwrap(),
      vec!["next 1".to_string(), "next 2".to_string(), "err done for".to_string()]
    );
  }

  #[test]
  fn live_subscribers_also_buffer_for_later_ones() {
    let subject = ReplaySubject::<i32, ()>::unbounded();
    let early = Arc::new(Mutex::new(vec![]));
    let c_early = early.clone();
    let _sub = subject.clone().subscribe(move |v| c_early.lock().unwrap().push(v));

    subject.clone().next(1);
    subject.clone().next(2);

    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    let _sub2 = subject.clone().subscribe(move |v| c_late.lock().unwrap().push(v));

    assert_eq!(*early.lock().unwrap(), vec![1, 2]);
    assert_eq!(*late.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  #[should_panic(expected = "disposed")]
  fn subscribe_after_dispose_panics() {
    let subject = ReplaySubject::<i32, ()>::unbounded();
    subject.dispose();
    subject.clone().subscribe(|_| {});
  }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};

use super::{
  subscribers::{share_observer, SharedObserver},
  SubjectState,
};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::SingleSubscription;

/// Subject representing one eventual result.
///
/// Any number of `next` calls may land while active, but only the most
/// recent value is retained; nothing is delivered until the terminal
/// transition. `complete` then hands every observer the retained value (if
/// any) followed by completion, `error` hands them the error. Late
/// subscribers get the same terminal replay.
///
/// The result is also reachable outside the observer protocol: [`result`]
/// blocks the calling thread until the subject terminates, [`to_future`]
/// yields it to an async caller, and [`on_terminate`] registers a
/// continuation run at (or after) the terminal transition, on whichever
/// thread performs it.
///
/// [`result`]: AsyncSubject::result
/// [`to_future`]: AsyncSubject::to_future
/// [`on_terminate`]: AsyncSubject::on_terminate
pub struct AsyncSubject<Item, Err> {
  core: Arc<AsyncCore<Item, Err>>,
}

struct AsyncCore<Item, Err> {
  inner: Mutex<AsyncInner<Item, Err>>,
  done: Condvar,
}

struct AsyncInner<Item, Err> {
  state: SubjectState<Item, Err>,
  value: Option<Item>,
  continuations: Vec<Box<dyn FnOnce() + Send>>,
  wakers: Vec<Waker>,
}

impl<Item, Err> Clone for AsyncSubject<Item, Err> {
  fn clone(&self) -> Self { AsyncSubject { core: self.core.clone() } }
}

impl<Item, Err> Default for AsyncSubject<Item, Err> {
  fn default() -> Self {
    AsyncSubject {
      core: Arc::new(AsyncCore {
        inner: Mutex::new(AsyncInner {
          state: SubjectState::default(),
          value: None,
          continuations: Vec::new(),
          wakers: Vec::new(),
        }),
        done: Condvar::new(),
      }),
    }
  }
}

impl<Item, Err> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  pub fn subscriber_count(&self) -> usize { self.core.inner.lock().unwrap().state.audience_len() }

  pub fn has_observers(&self) -> bool { self.subscriber_count() > 0 }

  /// Shut the subject down. Idempotent; any use afterwards panics. Blocked
  /// [`result`] callers are woken and panic in turn.
  ///
  /// [`result`]: AsyncSubject::result
  pub fn dispose(&self) {
    {
      let mut inner = self.core.inner.lock().unwrap();
      inner.state.dispose();
      inner.value = None;
      inner.continuations.clear();
      for waker in inner.wakers.drain(..) {
        waker.wake();
      }
    }
    self.core.done.notify_all();
  }

  /// Register a continuation for the terminal transition. Runs immediately
  /// when the subject already terminated.
  pub fn on_terminate(&self, f: impl FnOnce() + Send + 'static) {
    let run_now = {
      let mut inner = self.core.inner.lock().unwrap();
      if inner.state.is_active() {
        inner.continuations.push(Box::new(f));
        None
      } else {
        Some(f)
      }
    };
    if let Some(f) = run_now {
      f();
    }
  }
}

impl<Item, Err> AsyncSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  /// Block until the subject terminates, then return the retained value
  /// (`Ok(None)` when it completed without one) or the stored error.
  ///
  /// # Panics
  ///
  /// Panics when the subject is (or becomes) disposed.
  pub fn result(&self) -> Result<Option<Item>, Err> {
    let mut inner = self.core.inner.lock().unwrap();
    loop {
      match &inner.state {
        SubjectState::Active(_) => {
          inner = self.core.done.wait(inner).unwrap();
        }
        SubjectState::Terminated(None) => return Ok(inner.value.clone()),
        SubjectState::Terminated(Some(err)) => return Err(err.clone()),
        SubjectState::Disposed => panic!("result read from a disposed subject"),
      }
    }
  }

  /// An awaitable view of the eventual result.
  pub fn to_future(&self) -> ResultFuture<Item, Err> { ResultFuture { core: self.core.clone() } }
}

impl<Item, Err> AsyncCore<Item, Err> {
  /// Wake every blocked or parked consumer and return the continuations to
  /// run. Call with the terminal state already stored.
  fn take_terminal_callbacks(inner: &mut AsyncInner<Item, Err>) -> Vec<Box<dyn FnOnce() + Send>> {
    for waker in inner.wakers.drain(..) {
      waker.wake();
    }
    std::mem::take(&mut inner.continuations)
  }
}

impl<Item, Err> Observer<Item, Err> for AsyncSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let mut inner = self.core.inner.lock().unwrap();
    // dispatch_snapshot enforces the disposed contract; nothing is delivered
    // until the terminal transition.
    if inner.state.dispatch_snapshot().is_some() {
      inner.value = Some(value);
    }
  }

  fn error(&mut self, err: Err) {
    let (snapshot, continuations) = {
      let mut inner = self.core.inner.lock().unwrap();
      let snapshot = inner.state.terminate(Some(err.clone()));
      let continuations = if snapshot.is_some() {
        AsyncCore::take_terminal_callbacks(&mut inner)
      } else {
        Vec::new()
      };
      (snapshot, continuations)
    };
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_error(err);
      self.core.done.notify_all();
      for f in continuations {
        f();
      }
    }
  }

  fn complete(&mut self) {
    let (snapshot, value, continuations) = {
      let mut inner = self.core.inner.lock().unwrap();
      let snapshot = inner.state.terminate(None);
      let (value, continuations) = if snapshot.is_some() {
        (inner.value.clone(), AsyncCore::take_terminal_callbacks(&mut inner))
      } else {
        (None, Vec::new())
      };
      (snapshot, value, continuations)
    };
    if let Some(snapshot) = snapshot {
      if let Some(value) = value {
        snapshot.broadcast_value(value);
      }
      snapshot.broadcast_complete();
      self.core.done.notify_all();
      for f in continuations {
        f();
      }
    }
  }

  fn is_closed(&self) -> bool { !self.core.inner.lock().unwrap().state.is_active() }
}

impl<Item, Err> Observable<Item, Err> for AsyncSubject<Item, Err>
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
      match &inner.state {
        SubjectState::Active(_) => {
          inner.state.insert_observer(shared.clone());
          None
        }
        SubjectState::Terminated(err) => Some((err.clone(), inner.value.clone())),
        SubjectState::Disposed => panic!("subscribe on a disposed subject"),
      }
    };

    match replay {
      None => {
        let core = self.core.clone();
        SingleSubscription::new(move || {
          core.inner.lock().unwrap().state.remove_observer(&shared);
        })
      }
      Some((stored, value)) => {
        let mut observer = shared.lock().unwrap();
        match stored {
          Some(err) => observer.error(err),
          None => {
            if let Some(value) = value {
              observer.next(value);
            }
            observer.complete();
          }
        }
        SingleSubscription::closed()
      }
    }
  }
}

/// Future resolving to the subject's terminal result.
pub struct ResultFuture<Item, Err> {
  core: Arc<AsyncCore<Item, Err>>,
}

impl<Item, Err> Future for ResultFuture<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  type Output = Result<Option<Item>, Err>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut inner = self.core.inner.lock().unwrap();
    match &inner.state {
      SubjectState::Active(_) => {
        let waker = cx.waker();
        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
          inner.wakers.push(waker.clone());
        }
        Poll::Pending
      }
      SubjectState::Terminated(None) => Poll::Ready(Ok(inner.value.clone())),
      SubjectState::Terminated(Some(err)) => Poll::Ready(Err(err.clone())),
      SubjectState::Disposed => panic!("result polled on a disposed subject"),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observable::ObservableExt;
  use std::sync::{Arc, Mutex};
  use std::thread;
  use std::time::Duration;

  #[test]
  fn only_the_last_value_is_delivered_at_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_values = log.clone();
    let c_done = log.clone();
    let _sub = subject.clone().subscribe_all(
      move |v| c_values.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || c_done.lock().unwrap().push("complete".to_string()),
    );

    subject.clone().next(1);
    subject.clone().next(2);
    subject.clone().next(3);
    assert!(log.lock().unwrap().is_empty());

    subject.clone().complete();
    assert_eq!(*log.lock().unwrap(), vec!["next 3".to_string(), "complete".to_string()]);
  }

  #[test]
  fn completing_without_a_value_delivers_bare_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_values = log.clone();
    let c_done = log.clone();
    let _sub = subject.clone().subscribe_all(
      move |v| c_values.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || c_done.lock().unwrap().push("complete".to_string()),
    );

    subject.clone().complete();
    assert_eq!(*log.lock().unwrap(), vec!["complete".to_string()]);
  }

  #[test]
  fn late_subscriber_gets_the_terminal_replay() {
    let subject = AsyncSubject::<i32, ()>::new();
    subject.clone().next(9);
    subject.clone().complete();

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _sub = subject.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![9]);
  }

  #[test]
  fn result_blocks_until_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    let producer = subject.clone();
    let handle = thread::spawn(move || {
      thread::sleep(Duration::from_millis(30));
      producer.clone().next(11);
      producer.clone().complete();
    });

    assert_eq!(subject.result(), Ok(Some(11)));
    handle.join().unwrap();
  }

  #[test]
  fn result_reports_empty_completion() {
    let subject = AsyncSubject::<i32, ()>::new();
    subject.clone().complete();
    assert_eq!(subject.result(), Ok(None));
  }

  #[test]
  fn result_rethrows_the_stored_error() {
    let subject = AsyncSubject::<i32, &str>::new();
    subject.clone().next(5);
    subject.clone().error("fell over");
    assert_eq!(subject.result(), Err("fell over"));
  }

  #[test]
  fn future_resolves_with_the_result() {
    let subject = AsyncSubject::<i32, ()>::new();
    let future = subject.to_future();
    let producer = subject.clone();
    let handle = thread::spawn(move || {
      thread::sleep(Duration::from_millis(20));
      producer.clone().next(21);
      producer.clone().complete();
    });

    assert_eq!(futures::executor::block_on(future), Ok(Some(21)));
    handle.join().unwrap();
  }

  #[test]
  fn continuations_run_at_the_terminal_transition() {
    let subject = AsyncSubject::<i32, ()>::new();
    let ran = Arc::new(Mutex::new(vec![]));

    let c_ran = ran.clone();
    subject.on_terminate(move || c_ran.lock().unwrap().push("registered before"));
    subject.clone().complete();
    assert_eq!(*ran.lock().unwrap(), vec!["registered before"]);

    // Registered after the fact: runs on the spot.
    let c_ran = ran.clone();
    subject.on_terminate(move || c_ran.lock().unwrap().push("registered after"));
    assert_eq!(*ran.lock().unwrap(), vec!["registered before", "registered after"]);
  }

  #[test]
  fn next_after_terminal_is_ignored() {
    let subject = AsyncSubject::<i32, ()>::new();
    subject.clone().next(1);
    subject.clone().complete();
    subject.clone().next(2);
    assert_eq!(subject.result(), Ok(Some(1)));
  }
}

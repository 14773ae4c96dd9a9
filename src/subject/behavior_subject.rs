use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use super::{
  subscribers::{share_observer, SharedObserver},
  SubjectState,
};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::SingleSubscription;

/// Multicast subject that replays its latest value to every new subscriber.
///
/// One lock covers both the value slot and the audience, so a subscriber
/// joining mid-stream sees a consistent pair: the delivery of the current
/// value and the list append happen in a single critical section, and no
/// concurrent producer can slip a value in between.
pub struct BehaviorSubject<Item, Err> {
  inner: Arc<Mutex<BehaviorInner<Item, Err>>>,
}

struct BehaviorInner<Item, Err> {
  state: SubjectState<Item, Err>,
  value: Item,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self { BehaviorSubject { inner: self.inner.clone() } }
}

impl<Item, Err> BehaviorSubject<Item, Err> {
  /// A new subject whose current value starts as `value`.
  pub fn new(value: Item) -> Self {
    BehaviorSubject {
      inner: Arc::new(Mutex::new(BehaviorInner { state: SubjectState::default(), value })),
    }
  }

  pub fn subscriber_count(&self) -> usize { self.inner.lock().unwrap().state.audience_len() }

  pub fn has_observers(&self) -> bool { self.subscriber_count() > 0 }

  /// Shut the subject down. Idempotent; any use afterwards panics.
  pub fn dispose(&self) { self.inner.lock().unwrap().state.dispose(); }
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone,
{
  /// The current value, when one is still observable: the latest `next`
  /// while active, frozen after completion, gone after an error or dispose.
  pub fn try_value(&self) -> Option<Item> {
    let inner = self.inner.lock().unwrap();
    match &inner.state {
      SubjectState::Active(_) | SubjectState::Terminated(None) => Some(inner.value.clone()),
      SubjectState::Terminated(Some(_)) | SubjectState::Disposed => None,
    }
  }

  /// The current value.
  ///
  /// # Panics
  ///
  /// Panics when the subject terminated with an error or was disposed.
  pub fn value(&self) -> Item
  where
    Err: Debug,
  {
    let inner = self.inner.lock().unwrap();
    match &inner.state {
      SubjectState::Active(_) | SubjectState::Terminated(None) => inner.value.clone(),
      SubjectState::Terminated(Some(err)) => {
        panic!("value read from a subject that failed: {err:?}")
      }
      SubjectState::Disposed => panic!("value read from a disposed subject"),
    }
  }
}

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let snapshot = {
      let mut inner = self.inner.lock().unwrap();
      let snapshot = inner.state.dispatch_snapshot();
      if snapshot.is_some() {
        inner.value = value.clone();
      }
      snapshot
    };
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_value(value);
    }
  }

  fn error(&mut self, err: Err) {
    let snapshot = self.inner.lock().unwrap().state.terminate(Some(err.clone()));
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_error(err);
    }
  }

  fn complete(&mut self) {
    let snapshot = self.inner.lock().unwrap().state.terminate(None);
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_complete();
    }
  }

  fn is_closed(&self) -> bool { !self.inner.lock().unwrap().state.is_active() }
}

impl<Item, Err> Observable<Item, Err> for BehaviorSubject<Item, Err>
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
      let mut inner = self.inner.lock().unwrap();
      match &inner.state {
        SubjectState::Active(_) => {
          // Current value and list append form one critical section; the
          // newcomer cannot miss a value or see one twice.
          shared.lock().unwrap().next(inner.value.clone());
          inner.state.insert_observer(shared.clone());
          None
        }
        SubjectState::Terminated(err) => Some(err.clone()),
        SubjectState::Disposed => panic!("subscribe on a disposed subject"),
      }
    };

    match replay {
      None => {
        let inner = self.inner.clone();
        SingleSubscription::new(move || {
          inner.lock().unwrap().state.remove_observer(&shared);
        })
      }
      Some(stored) => {
        let mut observer = shared.lock().unwrap();
        match stored {
          Some(err) => observer.error(err),
          None => observer.complete(),
        }
        SingleSubscription::closed()
      }
    }
  }
}

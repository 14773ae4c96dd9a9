use std::sync::{Arc, Mutex};

use super::{
  subscribers::{share_observer, SharedObserver},
  SubjectState,
};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::SingleSubscription;

/// Plain multicast subject: every value goes to the audience subscribed at
/// the moment `next` is called, on the calling thread.
///
/// The state lock is held only to read or swap the audience snapshot, never
/// while notifying, so concurrent producers dispatch without blocking each
/// other and subscribe/unsubscribe during a broadcast only shape the next
/// snapshot.
pub struct PublishSubject<Item, Err> {
  state: Arc<Mutex<SubjectState<Item, Err>>>,
}

impl<Item, Err> Clone for PublishSubject<Item, Err> {
  fn clone(&self) -> Self { PublishSubject { state: self.state.clone() } }
}

impl<Item, Err> Default for PublishSubject<Item, Err> {
  fn default() -> Self { PublishSubject { state: Arc::new(Mutex::new(SubjectState::default())) } }
}

impl<Item, Err> PublishSubject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// True while at least one subscription is live and the subject is neither
  /// terminated nor disposed.
  pub fn has_observers(&self) -> bool { self.subscriber_count() > 0 }

  pub fn subscriber_count(&self) -> usize { self.state.lock().unwrap().audience_len() }

  /// Shut the subject down. Idempotent; any use afterwards panics.
  pub fn dispose(&self) { self.state.lock().unwrap().dispose(); }
}

impl<Item, Err> Observer<Item, Err> for PublishSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let snapshot = self.state.lock().unwrap().dispatch_snapshot();
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_value(value);
    }
  }

  fn error(&mut self, err: Err) {
    let snapshot = self.state.lock().unwrap().terminate(Some(err.clone()));
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_error(err);
    }
  }

  fn complete(&mut self) {
    let snapshot = self.state.lock().unwrap().terminate(None);
    if let Some(snapshot) = snapshot {
      snapshot.broadcast_complete();
    }
  }

  fn is_closed(&self) -> bool { !self.state.lock().unwrap().is_active() }
}

impl<Item, Err> Observable<Item, Err> for PublishSubject<Item, Err>
where
  Item: 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SingleSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let shared: SharedObserver<Item, Err> = share_observer(observer);
    let replay = {
      let mut state = self.state.lock().unwrap();
      match &mut *state {
        SubjectState::Active(_) => {
          state.insert_observer(shared.clone());
          None
        }
        SubjectState::Terminated(err) => Some(err.clone()),
        SubjectState::Disposed => panic!("subscribe on a disposed subject"),
      }
    };

    match replay {
      None => {
        let state = self.state.clone();
        SingleSubscription::new(move || {
          state.lock().unwrap().remove_observer(&shared);
        })
      }
      Some(stored) => {
        // Late subscriber: synchronously hand over the terminal notification.
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

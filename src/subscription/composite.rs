use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use super::Subscription;

/// An unordered, thread-safe bag of subscriptions released together.
///
/// Adding to an already-released bag releases the newcomer immediately
/// instead of storing it.
#[derive(Clone, Default)]
pub struct CompositeSubscription {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  closed: bool,
  teardown: SmallVec<[Box<dyn Subscription + Send>; 1]>,
}

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  pub fn add(&self, subscription: impl Subscription + Send + 'static) {
    let mut subscription = subscription;
    {
      let mut inner = self.inner.lock().unwrap();
      if !inner.closed {
        inner.teardown.retain(|s| !s.is_closed());
        inner.teardown.push(Box::new(subscription));
        return;
      }
    }
    // The bag is already released; release the newcomer on the spot, outside
    // the lock.
    subscription.unsubscribe();
  }

  pub fn teardown_size(&self) -> usize { self.inner.lock().unwrap().teardown.len() }
}

impl Subscription for CompositeSubscription {
  fn unsubscribe(&mut self) {
    let drained = {
      let mut inner = self.inner.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for mut subscription in drained {
      subscription.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().unwrap().closed }
}

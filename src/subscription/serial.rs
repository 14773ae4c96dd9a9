use std::sync::{Arc, Mutex};

use super::Subscription;

/// A replaceable disposal slot holding at most one current subscription.
///
/// Storing a new subscription releases the previous occupant. Once the slot
/// itself is released it stays terminally closed: anything stored afterwards
/// is released instead of kept.
#[derive(Clone, Default)]
pub struct SerialSubscription {
  inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
  closed: bool,
  current: Option<Box<dyn Subscription + Send>>,
}

impl SerialSubscription {
  pub fn new() -> Self { Self::default() }

  /// Replace the current occupant, releasing it.
  pub fn set(&self, subscription: impl Subscription + Send + 'static) {
    let mut incoming: Box<dyn Subscription + Send> = Box::new(subscription);
    let mut inner = self.inner.lock().unwrap();
    if inner.closed {
      drop(inner);
      incoming.unsubscribe();
    } else {
      let previous = inner.current.replace(incoming);
      drop(inner);
      if let Some(mut previous) = previous {
        previous.unsubscribe();
      }
    }
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(&mut self) {
    let current = {
      let mut inner = self.inner.lock().unwrap();
      inner.closed = true;
      inner.current.take()
    };
    if let Some(mut current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.inner.lock().unwrap().closed }
}

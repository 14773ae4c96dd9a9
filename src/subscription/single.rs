use std::sync::{Arc, Mutex};

use super::Subscription;

type Teardown = Box<dyn FnOnce() + Send>;

/// Single-shot disposal guard around one teardown action.
///
/// The action is taken out of the shared slot before it runs, so it executes
/// exactly once even when clones of the handle race to unsubscribe.
#[derive(Clone)]
pub struct SingleSubscription {
  action: Arc<Mutex<Option<Teardown>>>,
}

impl SingleSubscription {
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    SingleSubscription { action: Arc::new(Mutex::new(Some(Box::new(teardown)))) }
  }

  /// An already-released handle; unsubscribing it does nothing.
  pub fn closed() -> Self { SingleSubscription { action: Arc::new(Mutex::new(None)) } }
}

impl Subscription for SingleSubscription {
  fn unsubscribe(&mut self) {
    let action = self.action.lock().unwrap().take();
    if let Some(action) = action {
      action();
    }
  }

  fn is_closed(&self) -> bool { self.action.lock().unwrap().is_none() }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::thread;

  #[test]
  fn releases_exactly_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    let mut sub = SingleSubscription::new(move || {
      c_count.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!sub.is_closed());
    sub.unsubscribe();
    sub.unsubscribe();
    sub.unsubscribe();
    assert!(sub.is_closed());
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn releases_exactly_once_across_threads() {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    let sub = SingleSubscription::new(move || {
      c_count.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let mut sub = sub.clone();
        thread::spawn(move || sub.unsubscribe())
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn closed_handle_is_inert() {
    let mut sub = SingleSubscription::closed();
    assert!(sub.is_closed());
    sub.unsubscribe();
  }
}

use std::sync::{Arc, Mutex};

use crate::observer::Observer;

/// A subscribed observer as the subject stores it. Each observer carries its
/// own lock so racing producers serialize per observer, and the surrounding
/// list can stay an immutable snapshot.
pub(crate) type SharedObserver<Item, Err> = Arc<Mutex<Box<dyn Observer<Item, Err> + Send>>>;

pub(crate) fn share_observer<Item, Err, O>(observer: O) -> SharedObserver<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
{
  Arc::new(Mutex::new(Box::new(observer)))
}

/// An immutable snapshot of a subject's audience.
///
/// `add`/`remove` never mutate in place: they allocate a fresh backing array
/// and return it, so a snapshot handed to a broadcast keeps its membership no
/// matter what subscribe/unsubscribe calls land concurrently; those only
/// shape the *next* snapshot.
pub(crate) struct Subscribers<Item, Err> {
  list: Arc<[SharedObserver<Item, Err>]>,
}

impl<Item, Err> Clone for Subscribers<Item, Err> {
  fn clone(&self) -> Self { Subscribers { list: self.list.clone() } }
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self::empty() }
}

impl<Item, Err> Subscribers<Item, Err> {
  pub fn empty() -> Self { Subscribers { list: Arc::new([]) } }

  pub fn add(&self, observer: SharedObserver<Item, Err>) -> Self {
    let mut list = Vec::with_capacity(self.list.len() + 1);
    list.extend(self.list.iter().cloned());
    list.push(observer);
    Subscribers { list: list.into() }
  }

  /// Remove by identity. Unknown observers leave the snapshot unchanged.
  pub fn remove(&self, observer: &SharedObserver<Item, Err>) -> Self {
    let list: Vec<_> = self
      .list
      .iter()
      .filter(|o| !Arc::ptr_eq(o, observer))
      .cloned()
      .collect();
    Subscribers { list: list.into() }
  }

  pub fn len(&self) -> usize { self.list.len() }

  pub fn is_empty(&self) -> bool { self.list.is_empty() }

  /// Deliver a value to every observer in this snapshot. The last observer
  /// receives the moved value, the rest receive clones.
  pub fn broadcast_value(&self, value: Item)
  where
    Item: Clone,
  {
    let mut iter = self.list.iter().peekable();
    while let Some(observer) = iter.next() {
      let mut observer = observer.lock().unwrap();
      if iter.peek().is_some() {
        observer.next(value.clone());
      } else {
        observer.next(value);
        break;
      }
    }
  }

  pub fn broadcast_error(&self, err: Err)
  where
    Err: Clone,
  {
    let mut iter = self.list.iter().peekable();
    while let Some(observer) = iter.next() {
      let mut observer = observer.lock().unwrap();
      if iter.peek().is_some() {
        observer.error(err.clone());
      } else {
        observer.error(err);
        break;
      }
    }
  }

  pub fn broadcast_complete(&self) {
    for observer in self.list.iter() {
      observer.lock().unwrap().complete();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observer::FnObserver;
  use std::sync::{Arc, Mutex};

  fn recording(into: &Arc<Mutex<Vec<i32>>>) -> SharedObserver<i32, ()> {
    let into = into.clone();
    share_observer(FnObserver::new(move |v| into.lock().unwrap().push(v)))
  }

  #[test]
  fn add_and_remove_produce_fresh_snapshots() {
    let a_seen = Arc::new(Mutex::new(vec![]));
    let b_seen = Arc::new(Mutex::new(vec![]));
    let a = recording(&a_seen);
    let b = recording(&b_seen);

    let empty = Subscribers::empty();
    let one = empty.add(a.clone());
    let two = one.add(b.clone());
    assert_eq!(empty.len(), 0);
    assert_eq!(one.len(), 1);
    assert_eq!(two.len(), 2);

    let back_to_one = two.remove(&a);
    assert_eq!(back_to_one.len(), 1);
    assert_eq!(two.len(), 2);

    let back_to_empty = back_to_one.remove(&b);
    assert!(back_to_empty.is_empty());
  }

  #[test]
  fn broadcast_hits_every_member_in_order() {
    let a_seen = Arc::new(Mutex::new(vec![]));
    let b_seen = Arc::new(Mutex::new(vec![]));
    let list = Subscribers::empty()
      .add(recording(&a_seen))
      .add(recording(&b_seen));

    list.broadcast_value(1);
    list.broadcast_value(2);
    assert_eq!(*a_seen.lock().unwrap(), vec![1, 2]);
    assert_eq!(*b_seen.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn snapshot_in_flight_ignores_later_membership_changes() {
    let a_seen = Arc::new(Mutex::new(vec![]));
    let a = recording(&a_seen);
    let snapshot = Subscribers::empty().add(a.clone());

    // Removing from the container produces a new snapshot; the old one still
    // reaches the removed observer.
    let _next = snapshot.remove(&a);
    snapshot.broadcast_value(7);
    assert_eq!(*a_seen.lock().unwrap(), vec![7]);
  }

  #[test]
  fn removing_unknown_observer_is_a_no_op() {
    let seen = Arc::new(Mutex::new(vec![]));
    let member = recording(&seen);
    let stranger = recording(&seen);
    let list = Subscribers::empty().add(member);
    assert_eq!(list.remove(&stranger).len(), 1);
  }
}

//! Hot multicast streams.
//!
//! A subject is both an [`Observer`] (the producer feeds it) and an
//! observable (consumers subscribe to it). Four variants share one state
//! machine:
//!
//! - [`PublishSubject`]: plain multicast, no replay.
//! - [`BehaviorSubject`]: replays the latest value to new subscribers.
//! - [`ReplaySubject`]: replays a bounded history.
//! - [`AsyncSubject`]: holds the final value until completion.
//!
//! The machine is `Active → Terminated` (first `error`/`complete` wins,
//! repeats are no-ops) with an independent, idempotent transition to
//! `Disposed` from either phase. Once terminated, a late subscriber
//! synchronously receives the stored terminal notification; once disposed,
//! every operation panics.
//!
//! Feeding a subject from inside one of its own callbacks (re-entrant
//! emission) is not supported; route feedback loops through a scheduler hop
//! (`observe_on`) instead.
//!
//! [`Observer`]: crate::observer::Observer

mod async_subject;
mod behavior_subject;
mod publish_subject;
mod replay_subject;
pub(crate) mod subscribers;

pub use async_subject::{AsyncSubject, ResultFuture};
pub use behavior_subject::BehaviorSubject;
pub use publish_subject::PublishSubject;
pub use replay_subject::ReplaySubject;

use subscribers::{SharedObserver, Subscribers};

/// The phase of a subject, fused with its audience.
///
/// Folding the audience into the phase means one read of the state answers
/// both "may I emit?" and "to whom?". This is the enum rendition of the original
/// design's terminal/disposed sentinel list values.
pub(crate) enum SubjectState<Item, Err> {
  /// Accepting values; holds the current audience snapshot.
  Active(Subscribers<Item, Err>),
  /// Saw `complete` (None) or `error` (Some). Frozen.
  Terminated(Option<Err>),
  /// Explicitly shut down; any further use is a caller bug.
  Disposed,
}

impl<Item, Err> Default for SubjectState<Item, Err> {
  fn default() -> Self { SubjectState::Active(Subscribers::empty()) }
}

impl<Item, Err> SubjectState<Item, Err> {
  /// Audience snapshot for a value dispatch. `None` once terminated.
  ///
  /// # Panics
  ///
  /// Panics when the subject was disposed.
  pub fn dispatch_snapshot(&self) -> Option<Subscribers<Item, Err>> {
    match self {
      SubjectState::Active(subscribers) => Some(subscribers.clone()),
      SubjectState::Terminated(_) => None,
      SubjectState::Disposed => panic!("subject used after dispose"),
    }
  }

  /// Move to `Terminated`, returning the pre-transition audience exactly
  /// once. Losers of a terminal race get `None`.
  ///
  /// # Panics
  ///
  /// Panics when the subject was disposed.
  pub fn terminate(&mut self, err: Option<Err>) -> Option<Subscribers<Item, Err>> {
    match self {
      SubjectState::Active(_) => {
        let previous = std::mem::replace(self, SubjectState::Terminated(err));
        match previous {
          SubjectState::Active(subscribers) => Some(subscribers),
          _ => unreachable!(),
        }
      }
      SubjectState::Terminated(_) => None,
      SubjectState::Disposed => panic!("subject used after dispose"),
    }
  }

  /// Idempotent shutdown; drops the audience or the stored terminal error.
  pub fn dispose(&mut self) { *self = SubjectState::Disposed; }

  pub fn is_active(&self) -> bool { matches!(self, SubjectState::Active(_)) }

  pub fn audience_len(&self) -> usize {
    match self {
      SubjectState::Active(subscribers) => subscribers.len(),
      _ => 0,
    }
  }

  /// Swap in a grown audience snapshot.
  ///
  /// Callers match on the state first; this helper is only valid while
  /// active.
  pub fn insert_observer(&mut self, observer: SharedObserver<Item, Err>) {
    match self {
      SubjectState::Active(subscribers) => {
        *subscribers = subscribers.add(observer);
      }
      _ => panic!("insert on a non-active subject"),
    }
  }

  /// Swap in a shrunk audience snapshot. A no-op once terminated or
  /// disposed; removal must never panic, it backs unsubscribe.
  pub fn remove_observer(&mut self, observer: &SharedObserver<Item, Err>) {
    if let SubjectState::Active(subscribers) = self {
      *subscribers = subscribers.remove(observer);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::observer::FnObserver;
  use subscribers::share_observer;

  #[test]
  fn terminate_yields_the_audience_exactly_once() {
    let mut state = SubjectState::<i32, ()>::default();
    state.insert_observer(share_observer(FnObserver::new(|_: i32| {})));

    let first = state.terminate(None);
    assert!(first.is_some());
    assert_eq!(first.unwrap().len(), 1);

    let second = state.terminate(None);
    assert!(second.is_none());
  }

  #[test]
  #[should_panic(expected = "after dispose")]
  fn dispatch_after_dispose_panics() {
    let mut state = SubjectState::<i32, ()>::default();
    state.dispose();
    state.dispatch_snapshot();
  }

  #[test]
  fn removal_after_termination_is_silent() {
    let observer = share_observer(FnObserver::new(|_: i32| {}));
    let mut state = SubjectState::<i32, ()>::default();
    state.insert_observer(observer.clone());
    state.terminate(None);
    state.remove_observer(&observer);
  }
}

//! The observable contract and subscribe conveniences.

mod create;
mod defer;

pub use create::{create, create_safe, CreateObservable};
pub use defer::{defer, DeferObservable};

use crate::observer::{FnObserver, Observer, ObserverAll, ObserverErr};
use crate::ops::{
  catch::CatchOp, finalize::FinalizeOp, observe_on::ObserveOnOp, subscribe_on::SubscribeOnOp,
};
use crate::scheduler::Scheduler;
use crate::subscription::Subscription;

/// Anything that can be subscribed to.
///
/// `actual_subscribe` wires a full observer up to the source and returns the
/// disposal handle for that subscription. Most callers use the closure-based
/// wrappers from [`ObservableExt`] instead.
pub trait Observable<Item, Err> {
  type Unsub: Subscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static;
}

/// Closure-based subscription and the primitive combinators.
pub trait ObservableExt<Item, Err>: Observable<Item, Err> + Sized {
  /// Subscribe with a value handler. An error notification reaching this
  /// subscription panics; use [`subscribe_err`] when the source can fail.
  ///
  /// [`subscribe_err`]: ObservableExt::subscribe_err
  fn subscribe<N>(self, next: N) -> Self::Unsub
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.actual_subscribe(FnObserver::new(next))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> Self::Unsub
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
  {
    self.actual_subscribe(ObserverErr::new(next, error))
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> Self::Unsub
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.actual_subscribe(ObserverAll::new(next, error, complete))
  }

  /// Re-route every notification through `scheduler` before it reaches the
  /// downstream observer, preserving per-subscription order.
  fn observe_on<SD>(self, scheduler: SD) -> ObserveOnOp<Self, SD>
  where
    SD: Scheduler + Clone + Send + 'static,
  {
    ObserveOnOp::new(self, scheduler)
  }

  /// Perform the act of subscribing on `scheduler` instead of the calling
  /// thread.
  fn subscribe_on<SD>(self, scheduler: SD) -> SubscribeOnOp<Self, SD>
  where
    SD: Scheduler + Send + 'static,
  {
    SubscribeOnOp::new(self, scheduler)
  }

  /// On upstream error, subscribe the fallback observable produced by
  /// `handler`; values and completion pass through untouched.
  fn catch<F, R>(self, handler: F) -> CatchOp<Self, F, R>
  where
    F: FnOnce(Err) -> R + Send + 'static,
    R: Observable<Item, Err>,
  {
    CatchOp::new(self, handler)
  }

  /// Run `f` exactly once when the stream terminates or the subscription is
  /// released, whichever happens first.
  fn finalize<F>(self, f: F) -> FinalizeOp<Self, F>
  where
    F: FnOnce() + Send + 'static,
  {
    FinalizeOp::new(self, f)
  }
}

impl<Item, Err, T> ObservableExt<Item, Err> for T where T: Observable<Item, Err> {}

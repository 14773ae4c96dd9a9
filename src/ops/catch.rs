use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{CompositeSubscription, SerialSubscription};

/// Swap to a fallback observable when the upstream errors.
///
/// Values and completion pass through untouched. On the first upstream
/// error, the handler produces the fallback and the downstream observer is
/// handed over to it; the fallback's teardown lands in a serial slot inside
/// the returned composite.
pub struct CatchOp<S, F, R> {
  source: S,
  handler: F,
  _marker: PhantomData<fn() -> R>,
}

impl<S, F, R> CatchOp<S, F, R> {
  pub(crate) fn new(source: S, handler: F) -> Self {
    CatchOp { source, handler, _marker: PhantomData }
  }
}

impl<S, F, R, Item, Err> Observable<Item, Err> for CatchOp<S, F, R>
where
  S: Observable<Item, Err>,
  S::Unsub: Send + 'static,
  F: FnOnce(Err) -> R + Send + 'static,
  R: Observable<Item, Err> + 'static,
  R::Unsub: Send + 'static,
{
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = CompositeSubscription::new();
    let slot = SerialSubscription::new();
    let catching = CatchObserver {
      observer: Some(observer),
      handler: Some(self.handler),
      slot: slot.clone(),
      _marker: PhantomData,
    };
    let upstream = self.source.actual_subscribe(catching);
    subscription.add(upstream);
    subscription.add(slot);
    subscription
  }
}

pub struct CatchObserver<O, F, R> {
  observer: Option<O>,
  handler: Option<F>,
  slot: SerialSubscription,
  _marker: PhantomData<fn() -> R>,
}

impl<O, F, R, Item, Err> Observer<Item, Err> for CatchObserver<O, F, R>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnOnce(Err) -> R + Send + 'static,
  R: Observable<Item, Err> + 'static,
  R::Unsub: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = &mut self.observer {
      observer.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let (Some(observer), Some(handler)) = (self.observer.take(), self.handler.take()) {
      let fallback = handler(err);
      let unsub = fallback.actual_subscribe(observer);
      self.slot.set(unsub);
    }
  }

  fn complete(&mut self) {
    if let Some(observer) = &mut self.observer {
      observer.complete();
    }
    self.observer = None;
  }

  fn is_closed(&self) -> bool {
    self
      .observer
      .as_ref()
      .map_or(true, |observer| observer.is_closed())
  }
}

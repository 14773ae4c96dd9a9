use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::Observer;

/// Create an observable lazily, once per subscription.
///
/// The factory runs at subscribe time, so each subscriber gets a fresh
/// underlying observable and no work happens before anyone listens.
pub fn defer<F, R, Item, Err>(factory: F) -> DeferObservable<F, R>
where
  F: FnOnce() -> R,
  R: Observable<Item, Err>,
{
  DeferObservable { factory, _marker: PhantomData }
}

pub struct DeferObservable<F, R> {
  factory: F,
  _marker: PhantomData<fn() -> R>,
}

impl<F, R, Item, Err> Observable<Item, Err> for DeferObservable<F, R>
where
  F: FnOnce() -> R,
  R: Observable<Item, Err>,
{
  type Unsub = R::Unsub;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    (self.factory)().actual_subscribe(observer)
  }
}

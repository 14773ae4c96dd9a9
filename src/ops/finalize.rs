use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{CompositeSubscription, SingleSubscription, Subscription};

/// Run an action exactly once when the stream ends, however it ends.
///
/// The action fires after the terminal notification was forwarded, or when
/// the subscription is released early, whichever happens first. The
/// single-shot guard makes "both" impossible.
pub struct FinalizeOp<S, F> {
  source: S,
  action: F,
}

impl<S, F> FinalizeOp<S, F> {
  pub(crate) fn new(source: S, action: F) -> Self { FinalizeOp { source, action } }
}

impl<S, F, Item, Err> Observable<Item, Err> for FinalizeOp<S, F>
where
  S: Observable<Item, Err>,
  S::Unsub: Send + 'static,
  F: FnOnce() + Send + 'static,
{
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let action = SingleSubscription::new(self.action);
    let subscription = CompositeSubscription::new();
    let finalizing = FinalizeObserver { observer, action: action.clone() };
    let upstream = self.source.actual_subscribe(finalizing);
    subscription.add(upstream);
    subscription.add(action);
    subscription
  }
}

pub struct FinalizeObserver<O> {
  observer: O,
  action: SingleSubscription,
}

impl<O, Item, Err> Observer<Item, Err> for FinalizeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.observer.next(value); }

  fn error(&mut self, err: Err) {
    self.observer.error(err);
    self.action.unsubscribe();
  }

  fn complete(&mut self) {
    self.observer.complete();
    self.action.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

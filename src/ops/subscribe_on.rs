use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::Scheduler;
use crate::subscription::{CompositeSubscription, SerialSubscription};

/// Perform the act of subscribing on a scheduler instead of the calling
/// thread.
///
/// The real teardown lands in a serial slot once the deferred subscription
/// ran; unsubscribing beforehand cancels the pending subscription, and the
/// slot then swallows the teardown of a subscription that raced past the
/// cancellation.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> SubscribeOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { SubscribeOnOp { source, scheduler } }
}

impl<S, SD, Item, Err> Observable<Item, Err> for SubscribeOnOp<S, SD>
where
  S: Observable<Item, Err> + Send + 'static,
  S::Unsub: Send + 'static,
  SD: Scheduler + Send + 'static,
{
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = CompositeSubscription::new();
    let slot = SerialSubscription::new();
    let source = self.source;

    let task_slot = slot.clone();
    let handle = self.scheduler.schedule(Box::new(move || {
      let unsub = source.actual_subscribe(observer);
      task_slot.set(unsub);
    }));

    subscription.add(handle);
    subscription.add(slot);
    subscription
  }
}

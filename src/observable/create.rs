use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{CurrentThreadScheduler, Scheduler};
use crate::subscription::{SerialSubscription, Subscription};

/// Build an observable from a factory that drives an observer directly.
///
/// The factory receives an emitter facade over the downstream observer and
/// returns the subscription that tears its resources down. The emitter goes
/// quiet after the first terminal notification, so a sloppy factory cannot
/// double-terminate the downstream.
///
/// A panic thrown by the downstream observer unwinds back through the
/// factory (the producer sees it). Use [`create_safe`] to auto-unsubscribe
/// the throwing observer instead.
///
/// Subscribing honours the current-thread contract: when no trampoline is
/// active on the calling thread the subscription itself is routed through
/// [`CurrentThreadScheduler`] (it still completes before `subscribe`
/// returns); inside a running trampoline it runs directly. This keeps
/// factories that recursively subscribe from growing the call stack.
pub fn create<F, U, Item, Err>(factory: F) -> CreateObservable<F, Item, Err>
where
  F: FnOnce(&mut dyn Observer<Item, Err>) -> U,
  U: Subscription,
{
  CreateObservable { factory, safe: false, _marker: PhantomData }
}

/// Like [`create`], but a panic from the downstream observer unsubscribes
/// that observer and is swallowed; the factory keeps running against a
/// closed emitter.
pub fn create_safe<F, U, Item, Err>(factory: F) -> CreateObservable<F, Item, Err>
where
  F: FnOnce(&mut dyn Observer<Item, Err>) -> U,
  U: Subscription,
{
  CreateObservable { factory, safe: true, _marker: PhantomData }
}

pub struct CreateObservable<F, Item, Err> {
  factory: F,
  safe: bool,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

/// Facade the factory emits through. Forwards to the downstream observer
/// until a terminal notification, then goes quiet.
struct CreateEmitter<O> {
  observer: Option<O>,
  safe: bool,
}

impl<O> CreateEmitter<O> {
  fn guard(&mut self, notify: impl FnOnce(&mut O)) {
    let Some(observer) = &mut self.observer else { return };
    if self.safe {
      if catch_unwind(AssertUnwindSafe(|| notify(observer))).is_err() {
        log::trace!("downstream observer panicked; auto-unsubscribing it");
        self.observer = None;
      }
    } else {
      notify(observer);
    }
  }
}

impl<Item, Err, O> Observer<Item, Err> for CreateEmitter<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.guard(|observer| observer.next(value)); }

  fn error(&mut self, err: Err) {
    self.guard(|observer| observer.error(err));
    self.observer = None;
  }

  fn complete(&mut self) {
    self.guard(|observer| observer.complete());
    self.observer = None;
  }

  fn is_closed(&self) -> bool {
    self
      .observer
      .as_ref()
      .map_or(true, |observer| observer.is_closed())
  }
}

impl<F, U, Item, Err> Observable<Item, Err> for CreateObservable<F, Item, Err>
where
  F: FnOnce(&mut dyn Observer<Item, Err>) -> U + Send + 'static,
  U: Subscription + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SerialSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let slot = SerialSubscription::new();
    let CreateObservable { factory, safe, .. } = self;
    let run = {
      let slot = slot.clone();
      move || {
        let mut emitter = CreateEmitter { observer: Some(observer), safe };
        let teardown = factory(&mut emitter);
        slot.set(teardown);
      }
    };

    if CurrentThreadScheduler::is_schedule_required() {
      CurrentThreadScheduler.schedule(Box::new(run));
    } else {
      run();
    }
    slot
  }
}

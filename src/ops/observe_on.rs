use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::Scheduler;
use crate::spark::Spark;
use crate::subscription::{CompositeSubscription, SingleSubscription};

/// Re-route notifications through a scheduler before they reach the
/// downstream observer.
///
/// Every notification is materialized as a [`Spark`] and queued; a pump
/// schedules exactly one spark per hop and only schedules the next one after
/// the current downstream delivery returned. Delivery is therefore in-order
/// and non-overlapping even when the scheduler runs work on arbitrary pool
/// threads. Unsubscribing cancels pending hops, clears the queue and closes
/// it to new work.
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> ObserveOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { ObserveOnOp { source, scheduler } }
}

struct DrainCore<O, Item, Err> {
  queue: VecDeque<Spark<Item, Err>>,
  /// Taken out while a spark is being delivered, put back afterwards.
  observer: Option<O>,
  /// A pump hop is scheduled or running.
  draining: bool,
  closed: bool,
}

impl<S, SD, Item, Err> Observable<Item, Err> for ObserveOnOp<S, SD>
where
  S: Observable<Item, Err>,
  SD: Scheduler + Clone + Send + 'static,
  S::Unsub: Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = CompositeSubscription::new();
    let core = Arc::new(Mutex::new(DrainCore {
      queue: VecDeque::new(),
      observer: Some(observer),
      draining: false,
      closed: false,
    }));

    // Closing the queue rides in the same composite as the upstream
    // teardown, so one unsubscribe stops both ends.
    {
      let core = core.clone();
      subscription.add(SingleSubscription::new(move || {
        let mut core = core.lock().unwrap();
        core.closed = true;
        core.queue.clear();
      }));
    }

    let hop = ObserveOnObserver {
      core,
      scheduler: self.scheduler,
      subscription: subscription.clone(),
    };
    let upstream = self.source.actual_subscribe(hop);
    subscription.add(upstream);
    subscription
  }
}

pub struct ObserveOnObserver<O, SD, Item, Err> {
  core: Arc<Mutex<DrainCore<O, Item, Err>>>,
  scheduler: SD,
  subscription: CompositeSubscription,
}

impl<O, SD, Item, Err> ObserveOnObserver<O, SD, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler + Clone + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn push(&self, spark: Spark<Item, Err>) {
    let start_pump = {
      let mut core = self.core.lock().unwrap();
      if core.closed {
        log::trace!("notification dropped after the scheduler hop was closed");
        false
      } else {
        core.queue.push_back(spark);
        !std::mem::replace(&mut core.draining, true)
      }
    };
    if start_pump {
      schedule_pump(&self.core, &self.scheduler, &self.subscription);
    }
  }
}

fn schedule_pump<O, SD, Item, Err>(
  core: &Arc<Mutex<DrainCore<O, Item, Err>>>, scheduler: &SD, subscription: &CompositeSubscription,
) where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler + Clone + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let task_core = core.clone();
  let task_scheduler = scheduler.clone();
  let task_subscription = subscription.clone();
  let handle = scheduler.schedule(Box::new(move || {
    pump(task_core, task_scheduler, task_subscription);
  }));
  subscription.add(handle);
}

/// Deliver one queued spark, then reschedule when more are waiting.
fn pump<O, SD, Item, Err>(
  core: Arc<Mutex<DrainCore<O, Item, Err>>>, scheduler: SD, subscription: CompositeSubscription,
) where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler + Clone + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let (spark, mut observer) = {
    let mut guard = core.lock().unwrap();
    if guard.closed {
      guard.draining = false;
      return;
    }
    let Some(spark) = guard.queue.pop_front() else {
      guard.draining = false;
      return;
    };
    let Some(observer) = guard.observer.take() else {
      guard.draining = false;
      return;
    };
    (spark, observer)
  };

  // Delivery happens outside the lock so producers never block on a slow
  // downstream.
  let terminal = spark.is_terminal();
  spark.dispatch(&mut observer);

  let mut guard = core.lock().unwrap();
  if terminal {
    guard.closed = true;
    guard.queue.clear();
    guard.draining = false;
    return;
  }
  guard.observer = Some(observer);
  if guard.queue.is_empty() || guard.closed {
    guard.draining = false;
  } else {
    drop(guard);
    schedule_pump(&core, &scheduler, &subscription);
  }
}

impl<O, SD, Item, Err> Observer<Item, Err> for ObserveOnObserver<O, SD, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler + Clone + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.push(Spark::Next(value)); }

  fn error(&mut self, err: Err) { self.push(Spark::Err(err)); }

  fn complete(&mut self) { self.push(Spark::Complete); }

  fn is_closed(&self) -> bool { self.core.lock().unwrap().closed }
}

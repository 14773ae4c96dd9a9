//! Convenience re-exports of the public surface.

pub use crate::observable::{create, create_safe, defer, Observable, ObservableExt};
pub use crate::observer::{FnObserver, Observer, ObserverAll, ObserverErr};
pub use crate::ops::{
  catch::CatchOp, finalize::FinalizeOp, observe_on::ObserveOnOp, subscribe_on::SubscribeOnOp,
};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TaskPoolScheduler;
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
pub use crate::scheduler::{
  CurrentThreadScheduler, ImmediateScheduler, Scheduler, Task, TaskHandle, VirtualTimeScheduler,
};
pub use crate::spark::Spark;
pub use crate::subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};
pub use crate::subscription::{
  CancelToken, CompositeSubscription, SerialSubscription, SingleSubscription, Subscription,
  SubscriptionGuard, TokenSubscription,
};

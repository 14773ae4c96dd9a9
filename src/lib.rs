//! # hotspark: push-based hot observable streams
//!
//! Producers emit values, errors and completion to zero-or-more subscribed
//! consumers. Subjects multicast over immutable observer-list snapshots,
//! subscriptions are cancellable disposal handles, and every time-based or
//! thread-hopping piece of the library talks to a pluggable [`Scheduler`].
//!
//! ## Quick start
//!
//! ```rust
//! use hotspark::prelude::*;
//!
//! let subject = PublishSubject::<i32, ()>::new();
//! let sub = subject.clone().subscribe(|v| println!("got {v}"));
//!
//! let mut producer = subject.clone();
//! producer.next(1);
//! producer.next(2);
//! producer.complete();
//! drop(sub);
//! ```
//!
//! ## Key types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observer`] | Consumes `next`, `error` and `complete` notifications |
//! | [`PublishSubject`] / [`BehaviorSubject`] / [`ReplaySubject`] / [`AsyncSubject`] | Hot multicast streams |
//! | [`Subscription`] | Handle used to cancel an active subscription |
//! | [`Scheduler`] | "Run this action, now / after a delay / at a time" |
//! | [`VirtualTimeScheduler`] | Manually advanced clock for deterministic tests |
//!
//! [`Observer`]: observer::Observer
//! [`PublishSubject`]: subject::PublishSubject
//! [`BehaviorSubject`]: subject::BehaviorSubject
//! [`ReplaySubject`]: subject::ReplaySubject
//! [`AsyncSubject`]: subject::AsyncSubject
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`VirtualTimeScheduler`]: scheduler::VirtualTimeScheduler

pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod spark;
pub mod subject;
pub mod subscription;

pub use prelude::*;

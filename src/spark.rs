//! Materialized notifications.
//!
//! A [`Spark`] is one notification reified as a value so it can be queued,
//! inspected and compared. Operators that defer delivery through a scheduler
//! (see `ops::observe_on`) queue sparks instead of chaining one virtual call
//! per notification kind; dynamic dispatch happens only at the public
//! observer boundary.

use crate::observer::Observer;

/// A single notification: a value, the terminal error, or completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Spark<Item, Err> {
  Next(Item),
  Err(Err),
  Complete,
}

impl<Item, Err> Spark<Item, Err> {
  /// Feed this notification into an observer.
  pub fn dispatch<O>(self, observer: &mut O)
  where
    O: Observer<Item, Err>,
  {
    match self {
      Spark::Next(value) => observer.next(value),
      Spark::Err(err) => observer.error(err),
      Spark::Complete => observer.complete(),
    }
  }

  /// Whether this notification ends the stream.
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Spark::Next(_)) }
}

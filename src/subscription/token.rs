use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use super::Subscription;

/// A shared cancellation flag.
///
/// Scheduled work holds one side and checks it immediately before running;
/// the disposal side raises it. Raising the flag cannot interrupt work that
/// already started.
#[derive(Clone, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn cancel(&self) { self.flag.store(true, Ordering::SeqCst) }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.flag.load(Ordering::SeqCst) }
}

/// Disposal handle backed by a [`CancelToken`].
#[derive(Clone, Default)]
pub struct TokenSubscription {
  token: CancelToken,
}

impl TokenSubscription {
  pub fn new(token: CancelToken) -> Self { TokenSubscription { token } }

  pub fn token(&self) -> &CancelToken { &self.token }
}

impl Subscription for TokenSubscription {
  #[inline]
  fn unsubscribe(&mut self) { self.token.cancel() }

  #[inline]
  fn is_closed(&self) -> bool { self.token.is_cancelled() }
}

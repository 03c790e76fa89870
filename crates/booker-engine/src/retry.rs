//! Bounded exponential backoff for store calls.

use std::{future::Future, time::Duration};

use booker_core::{Error, Result};
use tokio::time::sleep;

/// How often, and how patiently, a failed store call is repeated.
///
/// Only transient failures ([`booker_core::Error::is_transient`]) are
/// retried. Domain outcomes are returned on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Total attempts including the first one. Never less than 1.
  pub attempts:   usize,
  pub base_delay: Duration,
  pub max_delay:  Duration,
  /// Multiplier applied to the delay after every failed attempt.
  pub factor:     u32,
}

impl RetryPolicy {
  pub fn new(attempts: usize, base_delay: Duration) -> Self {
    Self {
      attempts: attempts.max(1),
      base_delay,
      max_delay: base_delay.max(Duration::from_secs(5)),
      factor: 2,
    }
  }

  /// Delay before retry number `retry` (zero-based).
  fn delay_for(&self, retry: usize) -> Duration {
    let exp = u32::try_from(retry).unwrap_or(u32::MAX);
    self
      .base_delay
      .saturating_mul(self.factor.saturating_pow(exp))
      .min(self.max_delay)
  }

  /// Run `op` until it succeeds, fails with a non-transient error, or the
  /// attempt budget is spent.
  pub async fn run<T, E, F, Fut>(&self, name: &'static str, mut op: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<Error>,
  {
    let mut attempt = 0;
    loop {
      let result: Result<T> = op().await.map_err(Into::into);
      match result {
        Ok(val) => return Ok(val),
        Err(err) if err.is_transient() && attempt + 1 < self.attempts => {
          let delay = self.delay_for(attempt);
          attempt += 1;
          tracing::warn!(
            op = name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "store call failed, retrying"
          );
          sleep(delay).await;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self { Self::new(3, Duration::from_millis(500)) }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use uuid::Uuid;

  use super::*;

  fn unavailable() -> Error {
    Error::Store(Box::new(std::io::Error::other("database is locked")))
  }

  #[test]
  fn delays_double_and_cap() {
    let policy = RetryPolicy {
      attempts:   6,
      base_delay: Duration::from_millis(500),
      max_delay:  Duration::from_secs(3),
      factor:     2,
    };
    let delays: Vec<_> = (0..5).map(|r| policy.delay_for(r)).collect();
    assert_eq!(delays[0], Duration::from_millis(500));
    assert_eq!(delays[1], Duration::from_millis(1000));
    assert_eq!(delays[2], Duration::from_millis(2000));
    assert_eq!(delays[3], Duration::from_secs(3));
    assert_eq!(delays[4], Duration::from_secs(3));
  }

  #[test]
  fn attempts_are_clamped() {
    assert_eq!(RetryPolicy::new(0, Duration::from_millis(1)).attempts, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn transient_errors_are_retried_until_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let result = RetryPolicy::default()
      .run("flaky", || {
        let calls = calls.clone();
        async move {
          if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(unavailable())
          } else {
            Ok("done")
          }
        }
      })
      .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_budget() {
    let calls = Arc::new(AtomicUsize::new(0));
    let result: Result<()> = RetryPolicy::default()
      .run("down", || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err(unavailable())
        }
      })
      .await;

    assert!(result.unwrap_err().is_transient());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn domain_errors_are_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let result: Result<()> = RetryPolicy::default()
      .run("full", || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err(Error::NoAvailableSpots(Uuid::nil()))
        }
      })
      .await;

    assert!(matches!(result, Err(Error::NoAvailableSpots(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}

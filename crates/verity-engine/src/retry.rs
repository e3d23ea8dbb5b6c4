//! Bounded retry with exponential backoff.

use std::{future::Future, time::Duration};

use serde::Deserialize;

/// How many times to attempt an operation and how long to wait between
/// attempts. The delay doubles after each failure, capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
  pub max_attempts:     u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms:     u64,
}

impl RetryPolicy {
  /// Policy for a single model or embedding request.
  pub fn provider_default() -> Self {
    Self {
      max_attempts:     3,
      initial_delay_ms: 2000,
      max_delay_ms:     10_000,
    }
  }

  /// Policy for re-running a whole article or cluster unit of work.
  pub fn unit_default() -> Self {
    Self {
      max_attempts:     3,
      initial_delay_ms: 1000,
      max_delay_ms:     10_000,
    }
  }

  /// Same attempt count with zero delay.
  pub fn immediate(max_attempts: u32) -> Self {
    Self {
      max_attempts,
      initial_delay_ms: 0,
      max_delay_ms: 0,
    }
  }

  /// Whether another attempt may follow failed attempt number `attempt`
  /// (1-based).
  pub fn allows_retry(&self, attempt: u32) -> bool { attempt < self.max_attempts }

  /// Wait before the attempt following failed attempt number `attempt`.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(32);
    let ms = self
      .initial_delay_ms
      .saturating_mul(1_u64 << shift)
      .min(self.max_delay_ms);
    Duration::from_millis(ms)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self { Self::unit_default() }
}

/// Run `op` until it succeeds, `should_retry` rejects the error, or the
/// policy runs out of attempts. The closure receives the 1-based attempt
/// number.
pub async fn retry<T, E, F, Fut>(
  policy: &RetryPolicy,
  operation: &str,
  should_retry: impl Fn(&E) -> bool,
  mut op: F,
) -> Result<T, E>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: std::fmt::Display,
{
  let mut attempt = 1;
  loop {
    match op(attempt).await {
      Ok(value) => return Ok(value),
      Err(e) if policy.allows_retry(attempt) && should_retry(&e) => {
        let delay = policy.delay_after(attempt);
        tracing::warn!(
          operation,
          attempt,
          max_attempts = policy.max_attempts,
          delay_ms = delay.as_millis() as u64,
          error = %e,
          "attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  #[test]
  fn delay_doubles_until_capped() {
    let p = RetryPolicy::provider_default();
    assert_eq!(p.delay_after(1), Duration::from_millis(2000));
    assert_eq!(p.delay_after(2), Duration::from_millis(4000));
    assert_eq!(p.delay_after(3), Duration::from_millis(8000));
    assert_eq!(p.delay_after(4), Duration::from_millis(10_000));
    assert_eq!(p.delay_after(60), Duration::from_millis(10_000));
  }

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let out: Result<u32, String> = retry(&RetryPolicy::immediate(3), "flaky", |_| true, |n| {
      calls.fetch_add(1, Ordering::SeqCst);
      async move { if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) } }
    })
    .await;

    assert_eq!(out, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let out: Result<(), String> = retry(&RetryPolicy::immediate(2), "down", |_| true, |_| {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err("still down".to_string()) }
    })
    .await;

    assert_eq!(out, Err("still down".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn rejected_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let out: Result<(), String> = retry(&RetryPolicy::immediate(5), "fatal", |_| false, |_| {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err("fatal".to_string()) }
    })
    .await;

    assert!(out.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}

//! Periodic expiry sweep.

use std::{sync::Arc, time::Duration};

use booker_core::{Error, Result, notify::Notifier, store::{CapacityStore, Catalog}};
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{error, info, warn};

use crate::lifecycle::BookingEngine;

/// Calls [`BookingEngine::cancel_expired`] once per `interval`.
pub struct Sweeper<S, N> {
  engine:   Arc<BookingEngine<S, N>>,
  interval: Duration,
}

impl<S, N> Sweeper<S, N>
where
  S: Catalog + CapacityStore + 'static,
  N: Notifier + 'static,
{
  pub fn new(engine: Arc<BookingEngine<S, N>>, interval: Duration) -> Result<Self> {
    if interval.is_zero() {
      return Err(Error::validation("sweep interval must be greater than zero"));
    }
    Ok(Self { engine, interval })
  }

  /// Start the sweep loop on its own task. The first tick fires one
  /// interval from now.
  pub fn spawn(self) -> SweeperHandle {
    let (shutdown, rx) = watch::channel(false);
    let join = tokio::spawn(self.run(rx));
    SweeperHandle { shutdown, join }
  }

  async fn run(self, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_ms = self.interval.as_millis() as u64, "sweeper started");

    loop {
      tokio::select! {
        _ = shutdown.changed() => break,
        _ = ticker.tick() => {
          let now = self.engine.clock().now();
          tokio::select! {
            _ = shutdown.changed() => {
              warn!("sweeper stopped mid-tick, in-flight sweep left to finish detached");
              break;
            }
            result = self.engine.cancel_expired(now) => match result {
              Ok(cancelled) => {
                for booking in &cancelled {
                  info!(
                    booking_id = %booking.booking_id,
                    event_id = %booking.event_id,
                    user_id = %booking.user_id,
                    "booking expired"
                  );
                }
              }
              Err(error) => error!(%error, "expiry sweep failed"),
            },
          }
        }
      }
    }

    info!("sweeper stopped");
  }
}

/// Owner of a running sweeper. Dropping it also stops the loop.
pub struct SweeperHandle {
  shutdown: watch::Sender<bool>,
  join:     JoinHandle<()>,
}

impl SweeperHandle {
  /// Signal the loop and wait for it to exit.
  pub async fn stop(self) {
    let _ = self.shutdown.send(true);
    if let Err(error) = self.join.await {
      error!(%error, "sweeper task ended abnormally");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use booker_core::{booking::BookingStatus, notify::Notice};
  use chrono::TimeDelta;

  use super::*;
  use crate::testing::harness;

  #[tokio::test]
  async fn zero_interval_is_rejected() {
    let h = harness().await;
    let err = Sweeper::new(h.engine.clone(), Duration::ZERO).err().unwrap();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn ticks_cancel_expired_bookings() {
    let mut h = harness().await;
    let event = h.event(1, true, 10).await;
    let alice = h.user("alice").await;
    h.engine.book(event.event_id, alice.user_id).await.unwrap();
    h.next_notice().await;

    let handle = Sweeper::new(h.engine.clone(), Duration::from_millis(20))
      .unwrap()
      .spawn();

    h.clock.advance(TimeDelta::minutes(11));
    let sent = h.next_notice().await;
    assert_eq!(sent.notice, Notice::Cancelled);
    assert_eq!(sent.user_id, alice.user_id);

    handle.stop().await;

    let mine = h.engine.bookings_for_user(alice.user_id).await.unwrap();
    assert_eq!(mine[0].status, BookingStatus::Cancelled);
  }

  #[tokio::test]
  async fn stop_does_not_wait_for_next_tick() {
    let h = harness().await;
    let handle = Sweeper::new(h.engine.clone(), Duration::from_secs(3600))
      .unwrap()
      .spawn();

    tokio::time::timeout(Duration::from_secs(1), handle.stop())
      .await
      .expect("sweeper did not stop");
  }

  #[tokio::test]
  async fn failed_tick_does_not_stop_later_ticks() {
    let mut h = harness().await;
    let event = h.event(1, true, 10).await;
    let alice = h.user("alice").await;
    h.engine.book(event.event_id, alice.user_id).await.unwrap();
    h.next_notice().await;

    h.clock.advance(TimeDelta::minutes(11));
    // enough failures to exhaust the retry budget of the first tick
    h.store().fail_next_sweeps(3);

    let handle = Sweeper::new(h.engine.clone(), Duration::from_millis(20))
      .unwrap()
      .spawn();

    let sent = h.next_notice().await;
    assert_eq!(sent.notice, Notice::Cancelled);
    assert_eq!(sent.user_id, alice.user_id);
    assert_eq!(h.store().pending_sweep_failures(), 0);

    handle.stop().await;
  }

  #[tokio::test]
  async fn stopping_mid_tick_still_delivers_notices() {
    let mut h = harness().await;
    let event = h.event(1, true, 10).await;
    let alice = h.user("alice").await;
    h.engine.book(event.event_id, alice.user_id).await.unwrap();
    h.next_notice().await;

    h.clock.advance(TimeDelta::minutes(11));
    h.store().slow_sweeps(Duration::from_millis(300));

    let handle = Sweeper::new(h.engine.clone(), Duration::from_millis(20))
      .unwrap()
      .spawn();
    tokio::time::sleep(Duration::from_millis(80)).await;
    handle.stop().await;

    let sent = h.next_notice().await;
    assert_eq!(sent.notice, Notice::Cancelled);
    let mine = h.engine.bookings_for_user(alice.user_id).await.unwrap();
    assert_eq!(mine[0].status, BookingStatus::Cancelled);
  }
}

//! Notification sink interface.
//!
//! Delivery is best-effort: a notifier has no way to report failure back to
//! the lifecycle engine, and a lifecycle transition is never undone because
//! its notice could not be sent.

use std::{future::Future, time::Duration};

use crate::{event::Event, user::User};

/// The lifecycle transition a user is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
  /// A pending booking was created and awaits confirmation.
  Created,
  Confirmed,
  /// A pending booking outlived its confirmation window.
  Cancelled,
}

impl Notice {
  /// Human-readable message body for this notice.
  pub fn render(self, event: &Event) -> String {
    let date = event.event_date.format("%d.%m.%Y %H:%M");
    match self {
      Self::Created => format!(
        "*Spot reserved!*\n\nEvent: {}\nDate (UTC): {date}\nConfirm your booking within {}, otherwise it will be cancelled.",
        event.title,
        format_ttl(event.effective_ttl()),
      ),
      Self::Confirmed => format!(
        "*Booking confirmed!*\n\nEvent: {}\nDate (UTC): {date}",
        event.title,
      ),
      Self::Cancelled => format!(
        "*Booking cancelled (payment window elapsed)*\n\nEvent: {}\nDate (UTC): {date}",
        event.title,
      ),
    }
  }
}

/// Something that can tell a user about a booking transition.
///
/// Implementations decide how (and whether) to reach the user; the lifecycle
/// engine awaits the returned future on a detached task and ignores it.
pub trait Notifier: Send + Sync {
  fn notify(
    &self,
    notice: Notice,
    user: &User,
    event: &Event,
  ) -> impl Future<Output = ()> + Send;
}

/// `1h30m`, `20m`, `45s`.
fn format_ttl(ttl: Duration) -> String {
  let secs = ttl.as_secs();
  let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
  let mut out = String::new();
  if h > 0 {
    out.push_str(&format!("{h}h"));
  }
  if m > 0 {
    out.push_str(&format!("{m}m"));
  }
  if s > 0 || out.is_empty() {
    out.push_str(&format!("{s}s"));
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;

  fn event(ttl: Duration) -> Event {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap();
    Event {
      event_id:         Uuid::new_v4(),
      title:            "Concert".into(),
      description:      String::new(),
      event_date:       at,
      total_spots:      1,
      requires_payment: true,
      booking_ttl:      ttl,
      created_at:       at,
      updated_at:       at,
    }
  }

  #[test]
  fn ttl_formatting() {
    assert_eq!(format_ttl(Duration::from_secs(20 * 60)), "20m");
    assert_eq!(format_ttl(Duration::from_secs(5400)), "1h30m");
    assert_eq!(format_ttl(Duration::from_secs(45)), "45s");
  }

  #[test]
  fn created_notice_mentions_window_and_date() {
    let text = Notice::Created.render(&event(Duration::from_secs(600)));
    assert!(text.contains("Concert"));
    assert!(text.contains("01.06.2025 18:30"));
    assert!(text.contains("10m"));
  }

  #[test]
  fn cancelled_notice_explains_why() {
    let text = Notice::Cancelled.render(&event(Duration::from_secs(600)));
    assert!(text.contains("payment window elapsed"));
  }
}

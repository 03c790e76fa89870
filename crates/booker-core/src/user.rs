//! Users: the parties that hold bookings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:          Uuid,
  /// Unique across all users.
  pub username:         String,
  /// Where notifications go; users without one are not notified.
  pub telegram_chat_id: Option<i64>,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::Catalog::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:         String,
  pub telegram_chat_id: Option<i64>,
}

impl NewUser {
  pub fn build(self, now: DateTime<Utc>) -> Result<User> {
    let username = self.username.trim().to_owned();
    if username.is_empty() {
      return Err(Error::validation("username is required"));
    }
    Ok(User {
      user_id: Uuid::new_v4(),
      username,
      telegram_chat_id: self.telegram_chat_id,
      created_at: now,
    })
  }
}

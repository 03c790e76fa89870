//! The notifier shipped with the server.

use booker_core::{
  event::Event,
  notify::{Notice, Notifier},
  user::User,
};

/// Writes every notice to the log instead of a chat transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn notify(&self, notice: Notice, user: &User, event: &Event) {
    let Some(chat_id) = user.telegram_chat_id else {
      tracing::debug!(
        user_id = %user.user_id,
        ?notice,
        "user has no chat id, notice dropped"
      );
      return;
    };
    tracing::info!(
      user_id = %user.user_id,
      event_id = %event.event_id,
      chat_id,
      ?notice,
      message = %notice.render(event),
      "notice sent"
    );
  }
}

//! Detached execution of committed transitions and their notices.

use std::{future::Future, sync::Arc};

use booker_core::{
  Error, Result,
  event::Event,
  notify::{Notice, Notifier},
  user::User,
};

/// Hand `notice` to the notifier on its own task.
///
/// The spawned task owns everything it needs, so dropping the caller's future
/// (a disconnected HTTP client, say) does not cancel the delivery.
pub(crate) fn spawn_notice<N>(notifier: &Arc<N>, notice: Notice, user: User, event: Event)
where
  N: Notifier + 'static,
{
  let notifier = Arc::clone(notifier);
  tokio::spawn(async move {
    notifier.notify(notice, &user, &event).await;
  });
}

/// Run `work` to completion on its own task and wait for its result.
///
/// Dropping the returned future detaches from `work` without cancelling it.
/// A panic inside `work` is resumed on the caller.
pub(crate) async fn detached<T, F>(work: F) -> Result<T>
where
  F: Future<Output = Result<T>> + Send + 'static,
  T: Send + 'static,
{
  match tokio::spawn(work).await {
    Ok(result) => result,
    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
    Err(e) => Err(Error::Store(Box::new(e))),
  }
}

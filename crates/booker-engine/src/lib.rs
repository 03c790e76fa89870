//! Booking lifecycle engine for the event booker.
//!
//! [`BookingEngine`] drives bookings through `pending → confirmed` and
//! `pending → cancelled` on top of any [`booker_core::store`] backend.
//! [`Sweeper`] calls its expiry sweep on a fixed interval. Each transition
//! commits and dispatches its notice on a detached task, and the caller only
//! waits for the result: a caller going away never suppresses a notice for a
//! transition that has been committed.

mod dispatch;

pub mod lifecycle;
pub mod notify;
pub mod retry;
pub mod sweeper;

pub use lifecycle::BookingEngine;
pub use notify::LogNotifier;
pub use retry::RetryPolicy;
pub use sweeper::{Sweeper, SweeperHandle};

#[cfg(test)]
mod testing;

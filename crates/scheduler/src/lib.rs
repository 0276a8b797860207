//! In-memory reminder timers and the birthday sweep for Minder.
//!
//! This crate owns the time-driven half of the bot:
//!
//! - [`ReminderScheduler`]: one tokio timer per pending reminder, a fire
//!   path that retires the persisted row before anything is sent, and
//!   startup recovery that re-arms what survived a restart.
//! - [`BirthdayEngine`]: the once-a-day sweep that decides which birthday
//!   notices are owed this year.
//! - [`Notifier`]: the delivery seam toward the chat transport, which is
//!   not this crate's business beyond handing it text.
//!
//! Delivery is at-most-once everywhere: a reminder is consumed when its
//! timer fires whether or not the transport accepted the text, and a
//! birthday stage is recorded before its notice goes out. Nothing is ever
//! re-queued.

mod birthdays;
mod notifier;
mod timers;

pub use birthdays::BirthdayEngine;
pub use notifier::{Attachment, Delivery, Notifier, NotifyError};
pub use timers::ReminderScheduler;

use thiserror::Error;

/// Errors that can occur while scheduling or sweeping.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Storage error from the persistence layer.
    #[error("database error: {0}")]
    Database(#[from] database::DatabaseError),
}

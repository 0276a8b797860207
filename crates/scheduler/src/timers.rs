//! Per-reminder timers, the fire path, and startup recovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use database::{reminder, Database, DatabaseError, Reminder};

use crate::notifier::{Delivery, Notifier};
use crate::SchedulerError;

/// Sent when a reminder fires with an empty body.
const DEFAULT_TEXT: &str = "Time is over!";

/// Sent once per chat when recovery finds reminders that came due while the
/// process was down.
const MISSED_TEXT: &str = "Oops… looks like I missed some reminders while I was away. Sorry!";

struct TimerEntry {
    chat_id: i64,
    creator_id: i64,
    handle: JoinHandle<()>,
}

/// Armed timers correlated with persisted reminders.
///
/// Each pending reminder gets one tokio task that sleeps out the remaining
/// delay and then runs the fire path exactly once. A reminder either fires
/// or is cancelled, never both: the fire path pops the persisted row first,
/// and whoever loses that race backs off.
pub struct ReminderScheduler<N: Notifier> {
    db: Database,
    notifier: Arc<N>,
    timers: Mutex<HashMap<i64, TimerEntry>>,
}

impl<N: Notifier> ReminderScheduler<N> {
    /// Create a scheduler with no armed timers.
    pub fn new(db: Database, notifier: Arc<N>) -> Arc<Self> {
        Arc::new(Self {
            db,
            notifier,
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// Arm a timer for a persisted reminder.
    ///
    /// A reminder already due fires immediately. Scheduling the same id
    /// twice replaces the previous timer.
    pub async fn schedule(self: &Arc<Self>, reminder: &Reminder) {
        let delay = Duration::from_secs(reminder.due.saturating_sub(unix_now()).max(0) as u64);
        debug!(id = reminder.id, delay_secs = delay.as_secs(), "arming reminder timer");

        // The fire path locks the timer map before popping, so holding the
        // lock across spawn+insert keeps a zero-delay task from firing ahead
        // of its own registration.
        let mut timers = self.timers.lock().await;
        let handle = {
            let scheduler = Arc::clone(self);
            let id = reminder.id;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                scheduler.fire(id).await;
            })
        };
        if let Some(previous) = timers.insert(
            reminder.id,
            TimerEntry {
                chat_id: reminder.chat_id,
                creator_id: reminder.creator_id,
                handle,
            },
        ) {
            previous.handle.abort();
        }
    }

    /// Cancel the timer for one reminder id. Returns whether one was armed.
    pub async fn cancel(&self, id: i64) -> bool {
        match self.timers.lock().await.remove(&id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every armed timer for a creator in a chat, without firing.
    ///
    /// Callers clearing reminders delete the persisted rows first; a timer
    /// that slips through and fires concurrently finds its row gone and
    /// delivers nothing.
    pub async fn cancel_for(&self, chat_id: i64, creator_id: i64) -> usize {
        let mut timers = self.timers.lock().await;
        let ids: Vec<i64> = timers
            .iter()
            .filter(|(_, e)| e.chat_id == chat_id && e.creator_id == creator_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(entry) = timers.remove(id) {
                entry.handle.abort();
            }
        }
        ids.len()
    }

    /// Number of currently armed timers.
    pub async fn armed(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Reconcile persisted reminders with live timers after a restart.
    ///
    /// Future reminders are re-armed with their remaining delay. Reminders
    /// that came due while the process was down are deleted and answered
    /// with a single apology per chat, not one per reminder.
    pub async fn recover(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let now = unix_now();
        let mut rearmed = 0usize;
        let mut missed_chats: Vec<i64> = Vec::new();

        for pending in reminder::all(self.db.pool()).await? {
            if pending.due > now {
                self.schedule(&pending).await;
                rearmed += 1;
                continue;
            }

            match reminder::pop(self.db.pool(), pending.id).await {
                Ok(missed) => {
                    if !missed_chats.contains(&missed.chat_id) {
                        missed_chats.push(missed.chat_id);
                    }
                }
                Err(DatabaseError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(rearmed, missed_chats = missed_chats.len(), "reminder recovery complete");

        for chat_id in missed_chats {
            if let Err(e) = self.notifier.deliver(Delivery::text(chat_id, MISSED_TEXT)).await {
                warn!(chat_id, "failed to deliver missed-reminder apology: {e}");
            }
        }

        Ok(())
    }

    /// The fire path: retire the persisted row, then hand the text over.
    async fn fire(self: Arc<Self>, id: i64) {
        self.timers.lock().await.remove(&id);

        let fired = match reminder::pop(self.db.pool(), id).await {
            Ok(r) => r,
            Err(DatabaseError::NotFound { .. }) => {
                // Cleared between expiry and pop.
                debug!(id, "reminder gone before firing");
                return;
            }
            Err(e) => {
                error!(id, "could not pop reminder for firing: {e}");
                return;
            }
        };

        info!(id, chat_id = fired.chat_id, "reminder fired");
        let delivery = Delivery::for_reminder(&fired, DEFAULT_TEXT);
        if let Err(e) = self.notifier.deliver(delivery).await {
            // At-most-once: the reminder is consumed regardless.
            error!(id, chat_id = fired.chat_id, "reminder delivery failed, not retrying: {e}");
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

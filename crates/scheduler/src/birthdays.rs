//! The daily birthday sweep.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use database::{birthday, Birthday, Database, RemindStage};

use crate::notifier::{Delivery, Notifier};
use crate::SchedulerError;

/// Decides which birthday notices are owed on a given day.
///
/// Each entry can trigger two notices per yearly cycle: an advance warning
/// the day before and a notice on the day itself. Both are gated
/// independently on the stored (year, stage) pair, so running the sweep
/// twice on the same day sends nothing new. The stage is recorded before
/// the notice goes out; a crash in between drops that notice rather than
/// repeating it next run.
pub struct BirthdayEngine<N: Notifier> {
    db: Database,
    notifier: Arc<N>,
}

impl<N: Notifier> BirthdayEngine<N> {
    /// Create an engine over the given store and delivery seam.
    pub fn new(db: Database, notifier: Arc<N>) -> Self {
        Self { db, notifier }
    }

    /// Run the sweep for one calendar day. Returns how many notices went out.
    ///
    /// The daily trigger itself (a cron entry, an interval task in the
    /// embedding binary) is not this crate's concern.
    pub async fn sweep(&self, today: NaiveDate) -> Result<usize, SchedulerError> {
        let year = today.year() as i64;
        let mut sent = 0;

        for entry in birthday::by_date(self.db.pool(), today.month() as i64, today.day() as i64).await? {
            sent += self
                .notify_once(&entry, year, RemindStage::DayOf)
                .await? as usize;
        }

        if let Some(tomorrow) = today.succ_opt() {
            for entry in
                birthday::by_date(self.db.pool(), tomorrow.month() as i64, tomorrow.day() as i64).await?
            {
                sent += self
                    .notify_once(&entry, year, RemindStage::PreDay)
                    .await? as usize;
            }
        }

        info!(date = %today, sent, "birthday sweep complete");
        Ok(sent)
    }

    /// Send one stage for one entry unless it was already recorded this year.
    async fn notify_once(
        &self,
        entry: &Birthday,
        year: i64,
        stage: RemindStage,
    ) -> Result<bool, SchedulerError> {
        if birthday::has_stage(self.db.pool(), entry.id, year, stage).await? {
            return Ok(false);
        }

        // Record first so a crash-and-retry cannot resend this stage.
        birthday::set_stage(self.db.pool(), entry.id, year, stage).await?;

        let text = match stage {
            RemindStage::PreDay => format!("{} has a birthday tomorrow!", person_display(entry)),
            RemindStage::DayOf => format!("Today is {}'s birthday!", person_display(entry)),
        };
        // Birthday entries are personal, so the notice goes to the
        // creator's own chat.
        if let Err(e) = self
            .notifier
            .deliver(Delivery::text(entry.creator_id, text))
            .await
        {
            warn!(id = entry.id, "birthday notice delivery failed, not retrying: {e}");
        }

        Ok(true)
    }
}

fn person_display(entry: &Birthday) -> String {
    match (&entry.person_name, entry.person_id) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(person_id)) => format!("user {person_id}"),
        _ => "someone".to_string(),
    }
}

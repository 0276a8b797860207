//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A pending one-shot reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Chat the notification is delivered to.
    pub chat_id: i64,
    /// Due instant as unix seconds.
    pub due: i64,
    /// Reminder body text (may be empty).
    pub text: String,
    /// Message the notification should reply to, if any.
    pub reply_to: Option<i64>,
    /// User who created the reminder.
    pub creator_id: i64,
    /// Attachment kind (photo, document, ...), if any.
    pub attachment_type: Option<String>,
    /// Opaque transport identifier for the attachment.
    pub attachment_id: Option<String>,
}

/// An annually recurring birthday entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Birthday {
    /// Auto-incrementing ID.
    pub id: i64,
    /// User who created the entry.
    pub creator_id: i64,
    /// Month of the birthday (1-12).
    pub month: i64,
    /// Day of the birthday (1-31, not validated against month length).
    pub day: i64,
    /// Account identity of the celebrated person, if known.
    pub person_id: Option<i64>,
    /// Free-text name of the celebrated person.
    pub person_name: Option<String>,
    /// Last year a notification was recorded for this entry.
    pub year_reminded: Option<i64>,
    /// Stage recorded for `year_reminded`, as stored.
    pub remind_stage: Option<i64>,
}

impl Birthday {
    /// The recorded stage, decoded.
    pub fn stage(&self) -> Option<RemindStage> {
        self.remind_stage.and_then(RemindStage::from_i64)
    }
}

/// Yearly birthday notification checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemindStage {
    /// Advance warning the day before.
    PreDay,
    /// Notice on the day itself.
    DayOf,
}

impl RemindStage {
    /// Stored integer representation.
    pub fn as_i64(self) -> i64 {
        match self {
            RemindStage::PreDay => 0,
            RemindStage::DayOf => 1,
        }
    }

    /// Decode the stored integer representation.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(RemindStage::PreDay),
            1 => Some(RemindStage::DayOf),
            _ => None,
        }
    }
}

/// A user's preference for interpreting local times of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TimePreference {
    /// User the preference belongs to.
    pub user_id: i64,
    /// Offset from UTC in seconds.
    pub delta_seconds: i64,
    /// Optional named timezone the offset was derived from.
    pub timezone: Option<String>,
}

/// A per-user pending duration awaiting a follow-up confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeferredDelta {
    /// User the pending duration belongs to.
    pub user_id: i64,
    /// Pending duration in seconds.
    pub delta_seconds: i64,
}

//! The delivery seam toward the chat transport.

use async_trait::async_trait;
use thiserror::Error;

use database::Reminder;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport rejected or failed the delivery.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// An attachment reference carried along with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment kind (photo, document, ...).
    pub kind: String,
    /// Opaque transport identifier.
    pub file_id: String,
}

/// One outgoing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Chat the text goes to.
    pub chat_id: i64,
    /// Notification text.
    pub text: String,
    /// Message this notification replies to, if any.
    pub reply_to: Option<i64>,
    /// Attachment reference, if any.
    pub attachment: Option<Attachment>,
}

impl Delivery {
    /// A plain text notification with no reply target or attachment.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to: None,
            attachment: None,
        }
    }

    /// The notification for a fired reminder, falling back to a default
    /// text when the stored body is empty.
    pub fn for_reminder(reminder: &Reminder, default_text: &str) -> Self {
        let text = if reminder.text.is_empty() {
            default_text.to_string()
        } else {
            reminder.text.clone()
        };
        Self {
            chat_id: reminder.chat_id,
            text,
            reply_to: reminder.reply_to,
            attachment: match (&reminder.attachment_type, &reminder.attachment_id) {
                (Some(kind), Some(file_id)) => Some(Attachment {
                    kind: kind.clone(),
                    file_id: file_id.clone(),
                }),
                _ => None,
            },
        }
    }
}

/// Hands notification text to the chat transport.
///
/// Implementations live in the embedding transport layer; this crate only
/// calls [`deliver`](Notifier::deliver) and logs failures, it never retries.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver a single notification.
    async fn deliver(&self, delivery: Delivery) -> Result<(), NotifyError>;
}

//! Reminder CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Reminder;
use crate::quota::QuotaPolicy;

/// Reminders due closer than this are rejected as essentially now.
pub const MIN_LEAD_SECONDS: i64 = 5;

/// Fields of a reminder about to be created.
#[derive(Debug, Clone)]
pub struct NewReminder<'a> {
    /// Chat the notification is delivered to.
    pub chat_id: i64,
    /// User creating the reminder.
    pub creator_id: i64,
    /// Due instant as unix seconds.
    pub due: i64,
    /// Body text; stored trimmed, may be empty.
    pub text: &'a str,
    /// Message the notification should reply to, if any.
    pub reply_to: Option<i64>,
    /// Attachment kind, if any.
    pub attachment_type: Option<&'a str>,
    /// Opaque transport identifier for the attachment.
    pub attachment_id: Option<&'a str>,
}

/// Create a reminder, enforcing the quota and the minimum lead time.
///
/// The count half of the quota is enforced by a conditional insert, so two
/// concurrent calls for the same creator can never exceed the limit.
pub async fn add(
    pool: &SqlitePool,
    quota: &QuotaPolicy,
    new: &NewReminder<'_>,
    now: i64,
) -> Result<i64> {
    let text = new.text.trim();

    // Byte-size half of the quota up front; the count half goes through the
    // conditional insert below.
    if !quota.allows(0, text.len()) {
        return Err(DatabaseError::QuotaExceeded);
    }
    if new.due - now < MIN_LEAD_SECONDS {
        return Err(DatabaseError::TooSoon);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO reminders
            (chat_id, creator_id, due, text, reply_to, attachment_type, attachment_id)
        SELECT ?, ?, ?, ?, ?, ?, ?
        WHERE (SELECT COUNT(*) FROM reminders WHERE creator_id = ?) < ?
        "#,
    )
    .bind(new.chat_id)
    .bind(new.creator_id)
    .bind(new.due)
    .bind(text)
    .bind(new.reply_to)
    .bind(new.attachment_type)
    .bind(new.attachment_id)
    .bind(new.creator_id)
    .bind(quota.max_reminders)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::QuotaExceeded);
    }

    Ok(result.last_insert_rowid())
}

/// Get a creator's reminders in a chat, soonest first.
pub async fn list(pool: &SqlitePool, chat_id: i64, creator_id: i64) -> Result<Vec<Reminder>> {
    let reminders = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, due, text, reply_to, creator_id, attachment_type, attachment_id
        FROM reminders
        WHERE chat_id = ? AND creator_id = ?
        ORDER BY due ASC, id ASC
        "#,
    )
    .bind(chat_id)
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(reminders)
}

/// Get the nth (0-indexed, soonest first) of a creator's reminders in a chat.
pub async fn nth(pool: &SqlitePool, chat_id: i64, creator_id: i64, n: u32) -> Result<Reminder> {
    let reminder = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, due, text, reply_to, creator_id, attachment_type, attachment_id
        FROM reminders
        WHERE chat_id = ? AND creator_id = ?
        ORDER BY due ASC, id ASC
        LIMIT 1 OFFSET ?
        "#,
    )
    .bind(chat_id)
    .bind(creator_id)
    .bind(n)
    .fetch_optional(pool)
    .await?;

    reminder.ok_or(DatabaseError::NotFound {
        entity: "Reminder",
        id: n.to_string(),
    })
}

/// Remove and return the nth (0-indexed, soonest first) reminder.
pub async fn remove_nth(
    pool: &SqlitePool,
    chat_id: i64,
    creator_id: i64,
    n: u32,
) -> Result<Reminder> {
    let mut tx = pool.begin().await?;

    let reminder = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, due, text, reply_to, creator_id, attachment_type, attachment_id
        FROM reminders
        WHERE chat_id = ? AND creator_id = ?
        ORDER BY due ASC, id ASC
        LIMIT 1 OFFSET ?
        "#,
    )
    .bind(chat_id)
    .bind(creator_id)
    .bind(n)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DatabaseError::NotFound {
        entity: "Reminder",
        id: n.to_string(),
    })?;

    sqlx::query("DELETE FROM reminders WHERE id = ?")
        .bind(reminder.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(reminder)
}

/// Remove all of a creator's reminders in a chat, returning how many there were.
pub async fn clear_all(pool: &SqlitePool, chat_id: i64, creator_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM reminders
        WHERE chat_id = ? AND creator_id = ?
        "#,
    )
    .bind(chat_id)
    .bind(creator_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a reminder by id and return it in one step.
///
/// The fire path relies on this as its arbiter: whichever of firing and
/// clearing pops the row first wins, the other sees `NotFound`.
pub async fn pop(pool: &SqlitePool, id: i64) -> Result<Reminder> {
    let mut tx = pool.begin().await?;

    let reminder = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, due, text, reply_to, creator_id, attachment_type, attachment_id
        FROM reminders
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DatabaseError::NotFound {
        entity: "Reminder",
        id: id.to_string(),
    })?;

    sqlx::query("DELETE FROM reminders WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(reminder)
}

/// Get every persisted reminder, soonest first. Used by startup recovery.
pub async fn all(pool: &SqlitePool) -> Result<Vec<Reminder>> {
    let reminders = sqlx::query_as::<_, Reminder>(
        r#"
        SELECT id, chat_id, due, text, reply_to, creator_id, attachment_type, attachment_id
        FROM reminders
        ORDER BY due ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(reminders)
}

/// How many reminders a creator currently holds, across all chats.
pub async fn count(pool: &SqlitePool, creator_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM reminders
        WHERE creator_id = ?
        "#,
    )
    .bind(creator_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Distinct creators and total reminders currently stored.
pub async fn stats(pool: &SqlitePool) -> Result<(i64, i64)> {
    let creators = sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT creator_id) FROM reminders")
        .fetch_one(pool)
        .await?;
    let reminders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reminders")
        .fetch_one(pool)
        .await?;

    Ok((creators, reminders))
}

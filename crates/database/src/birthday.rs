//! Birthday CRUD and yearly stage tracking.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Birthday, RemindStage};

/// Free-text person names are capped at this many characters.
pub const MAX_PERSON_NAME_CHARS: usize = 16;

const NO_NAME: &str = "(no name)";

/// Create a birthday entry and return its id.
///
/// The person reference is either an account identity or a free-text name;
/// the name is truncated to [`MAX_PERSON_NAME_CHARS`] and defaults to a
/// placeholder when absent.
pub async fn add(
    pool: &SqlitePool,
    creator_id: i64,
    month: i64,
    day: i64,
    person_id: Option<i64>,
    person_name: Option<&str>,
) -> Result<i64> {
    let name: String = person_name
        .unwrap_or(NO_NAME)
        .chars()
        .take(MAX_PERSON_NAME_CHARS)
        .collect();

    let result = sqlx::query(
        r#"
        INSERT INTO birthdays (creator_id, month, day, person_id, person_name)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(creator_id)
    .bind(month)
    .bind(day)
    .bind(person_id)
    .bind(name)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a creator's birthday entries, ordered by calendar date.
pub async fn list(pool: &SqlitePool, creator_id: i64) -> Result<Vec<Birthday>> {
    let birthdays = sqlx::query_as::<_, Birthday>(
        r#"
        SELECT id, creator_id, month, day, person_id, person_name, year_reminded, remind_stage
        FROM birthdays
        WHERE creator_id = ?
        ORDER BY month ASC, day ASC, id ASC
        "#,
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(birthdays)
}

/// Get every birthday entry falling on the given calendar date.
pub async fn by_date(pool: &SqlitePool, month: i64, day: i64) -> Result<Vec<Birthday>> {
    let birthdays = sqlx::query_as::<_, Birthday>(
        r#"
        SELECT id, creator_id, month, day, person_id, person_name, year_reminded, remind_stage
        FROM birthdays
        WHERE month = ? AND day = ?
        ORDER BY id ASC
        "#,
    )
    .bind(month)
    .bind(day)
    .fetch_all(pool)
    .await?;

    Ok(birthdays)
}

/// Remove and return the nth (0-indexed, calendar order) of a creator's entries.
pub async fn remove_nth(pool: &SqlitePool, creator_id: i64, n: u32) -> Result<Birthday> {
    let mut tx = pool.begin().await?;

    let birthday = sqlx::query_as::<_, Birthday>(
        r#"
        SELECT id, creator_id, month, day, person_id, person_name, year_reminded, remind_stage
        FROM birthdays
        WHERE creator_id = ?
        ORDER BY month ASC, day ASC, id ASC
        LIMIT 1 OFFSET ?
        "#,
    )
    .bind(creator_id)
    .bind(n)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DatabaseError::NotFound {
        entity: "Birthday",
        id: n.to_string(),
    })?;

    sqlx::query("DELETE FROM birthdays WHERE id = ?")
        .bind(birthday.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(birthday)
}

/// How many birthday entries a creator holds.
pub async fn count(pool: &SqlitePool, creator_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM birthdays
        WHERE creator_id = ?
        "#,
    )
    .bind(creator_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Record that `stage` was notified for `year`.
///
/// Called before the notification is sent, so a crash between the write and
/// the send drops the notification rather than duplicating it.
pub async fn set_stage(pool: &SqlitePool, id: i64, year: i64, stage: RemindStage) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE birthdays
        SET year_reminded = ?, remind_stage = ?
        WHERE id = ?
        "#,
    )
    .bind(year)
    .bind(stage.as_i64())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Birthday",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Whether `stage` was already notified for `year`.
pub async fn has_stage(pool: &SqlitePool, id: i64, year: i64, stage: RemindStage) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT 1
        FROM birthdays
        WHERE id = ? AND year_reminded = ? AND remind_stage = ?
        "#,
    )
    .bind(id)
    .bind(year)
    .bind(stage.as_i64())
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

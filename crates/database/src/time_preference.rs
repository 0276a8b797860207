//! Per-user time preference storage (UTC offset plus optional zone name).

use sqlx::SqlitePool;

use crate::models::TimePreference;
use crate::Result;

/// Create or update a user's time preference. Last write wins.
pub async fn upsert(
    pool: &SqlitePool,
    user_id: i64,
    delta_seconds: i64,
    timezone: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO time_preferences (user_id, delta_seconds, timezone)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            delta_seconds = excluded.delta_seconds,
            timezone = excluded.timezone
        "#,
    )
    .bind(user_id)
    .bind(delta_seconds)
    .bind(timezone)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a user's time preference, if one was stored.
pub async fn get(pool: &SqlitePool, user_id: i64) -> Result<Option<TimePreference>> {
    let record = sqlx::query_as::<_, TimePreference>(
        r#"
        SELECT user_id, delta_seconds, timezone
        FROM time_preferences
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

//! Per-user deferred durations awaiting a follow-up confirmation.

use sqlx::SqlitePool;

use crate::Result;

/// Store a pending duration for a user, overwriting any previous one.
pub async fn set(pool: &SqlitePool, user_id: i64, delta_seconds: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO deferred_deltas (user_id, delta_seconds)
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            delta_seconds = excluded.delta_seconds
        "#,
    )
    .bind(user_id)
    .bind(delta_seconds)
    .execute(pool)
    .await?;

    Ok(())
}

/// Peek at a user's pending duration without consuming it.
pub async fn get(pool: &SqlitePool, user_id: i64) -> Result<Option<i64>> {
    let delta = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT delta_seconds
        FROM deferred_deltas
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(delta)
}

/// Consume a user's pending duration: delete it and return it, or `None` if
/// nothing was pending.
pub async fn take(pool: &SqlitePool, user_id: i64) -> Result<Option<i64>> {
    let mut tx = pool.begin().await?;

    let delta = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT delta_seconds
        FROM deferred_deltas
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if delta.is_some() {
        sqlx::query("DELETE FROM deferred_deltas WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let db = test_db().await;

        set(db.pool(), 7, 300).await.unwrap();
        set(db.pool(), 7, 900).await.unwrap();
        assert_eq!(get(db.pool(), 7).await.unwrap(), Some(900));
    }

    #[tokio::test]
    async fn test_take_is_one_shot() {
        let db = test_db().await;

        assert_eq!(take(db.pool(), 7).await.unwrap(), None);

        set(db.pool(), 7, 300).await.unwrap();
        assert_eq!(take(db.pool(), 7).await.unwrap(), Some(300));
        assert_eq!(take(db.pool(), 7).await.unwrap(), None);
    }
}

//! Forward-only, versioned schema migrations.
//!
//! The schema generation is a single integer stored in the `schema_version`
//! table. [`run`] reads it (0 for a fresh database) and applies every later
//! step in order. Each step's statements and the version bump commit in one
//! transaction, so a crash mid-chain resumes at the first unapplied step and
//! no step ever runs twice.

use sqlx::SqlitePool;

use crate::Result;

/// The schema generation this build writes and expects.
pub const SCHEMA_VERSION: i64 = 8;

struct Step {
    /// The generation the database is at after this step.
    version: i64,
    statements: &'static [&'static str],
}

/// Additive steps only; existing columns and tables are never rewritten.
const STEPS: &[Step] = &[
    Step {
        version: 1,
        statements: &[
            "CREATE TABLE schema_version (version INTEGER NOT NULL)",
            "INSERT INTO schema_version (version) VALUES (0)",
            "CREATE TABLE time_preferences (
                user_id        INTEGER PRIMARY KEY,
                delta_seconds  INTEGER NOT NULL
            )",
            "CREATE TABLE reminders (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id  INTEGER NOT NULL,
                due      INTEGER NOT NULL,
                text     TEXT NOT NULL
            )",
        ],
    },
    Step {
        version: 2,
        statements: &["ALTER TABLE reminders ADD COLUMN reply_to INTEGER"],
    },
    Step {
        version: 3,
        statements: &["ALTER TABLE reminders ADD COLUMN creator_id INTEGER NOT NULL DEFAULT 0"],
    },
    Step {
        version: 4,
        statements: &[
            "CREATE TABLE birthdays (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id   INTEGER NOT NULL,
                month        INTEGER NOT NULL,
                day          INTEGER NOT NULL,
                person_id    INTEGER,
                person_name  TEXT
            )",
        ],
    },
    Step {
        version: 5,
        statements: &[
            "ALTER TABLE reminders ADD COLUMN attachment_type TEXT",
            "ALTER TABLE reminders ADD COLUMN attachment_id TEXT",
        ],
    },
    Step {
        version: 6,
        statements: &[
            "ALTER TABLE birthdays ADD COLUMN year_reminded INTEGER",
            "ALTER TABLE birthdays ADD COLUMN remind_stage INTEGER",
        ],
    },
    Step {
        version: 7,
        statements: &["ALTER TABLE time_preferences ADD COLUMN timezone TEXT"],
    },
    Step {
        version: 8,
        statements: &[
            "CREATE TABLE deferred_deltas (
                user_id        INTEGER PRIMARY KEY,
                delta_seconds  INTEGER NOT NULL
            )",
        ],
    },
];

/// Bring the database up to [`SCHEMA_VERSION`].
pub async fn run(pool: &SqlitePool) -> Result<()> {
    run_to(pool, SCHEMA_VERSION).await
}

/// Apply every step after the stored version, up to and including `target`.
async fn run_to(pool: &SqlitePool, target: i64) -> Result<()> {
    let stored = stored_version(pool).await?;
    for step in STEPS.iter().filter(|s| s.version > stored && s.version <= target) {
        apply(pool, step).await?;
        tracing::debug!(version = step.version, "applied schema migration");
    }
    Ok(())
}

/// The stored schema generation, or 0 for a fresh database.
async fn stored_version(pool: &SqlitePool) -> Result<i64> {
    let table_count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM sqlite_master
        WHERE type = 'table' AND name = 'schema_version'
        "#,
    )
    .fetch_one(pool)
    .await?;

    if table_count == 0 {
        return Ok(0);
    }

    let version = sqlx::query_scalar::<_, i64>("SELECT version FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// One step, statements and version bump in a single transaction.
async fn apply(pool: &SqlitePool, step: &Step) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in step.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(step.version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
        sqlx::query_scalar::<_, String>(&format!("SELECT name FROM pragma_table_info('{table}')"))
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_reaches_current_version() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run(db.pool()).await.unwrap();
        assert_eq!(stored_version(db.pool()).await.unwrap(), SCHEMA_VERSION);

        let columns = column_names(db.pool(), "reminders").await;
        for expected in ["id", "chat_id", "due", "text", "reply_to", "creator_id", "attachment_type", "attachment_id"] {
            assert!(columns.iter().any(|c| c == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn test_migration_is_idempotent_once_current() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run(db.pool()).await.unwrap();
        run(db.pool()).await.unwrap();
        assert_eq!(stored_version(db.pool()).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_partial_chain_resumes_in_order() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        // A database left at generation 3: no birthdays table, no attachment
        // columns, no timezone column, no deferred table.
        run_to(db.pool(), 3).await.unwrap();
        assert_eq!(stored_version(db.pool()).await.unwrap(), 3);
        let columns = column_names(db.pool(), "reminders").await;
        assert!(columns.iter().any(|c| c == "creator_id"));
        assert!(!columns.iter().any(|c| c == "attachment_type"));

        // A normal startup applies every remaining step exactly once.
        run(db.pool()).await.unwrap();
        assert_eq!(stored_version(db.pool()).await.unwrap(), SCHEMA_VERSION);

        let columns = column_names(db.pool(), "reminders").await;
        assert!(columns.iter().any(|c| c == "attachment_type"));
        assert!(columns.iter().any(|c| c == "attachment_id"));
        let columns = column_names(db.pool(), "birthdays").await;
        assert!(columns.iter().any(|c| c == "year_reminded"));
        assert!(columns.iter().any(|c| c == "remind_stage"));
        let columns = column_names(db.pool(), "time_preferences").await;
        assert!(columns.iter().any(|c| c == "timezone"));
        assert!(!column_names(db.pool(), "deferred_deltas").await.is_empty());

        // Running the chain again must not re-apply anything; re-adding an
        // existing column would fail loudly.
        run(db.pool()).await.unwrap();
    }
}

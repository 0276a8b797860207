//! SQLite persistence layer for Minder.
//!
//! This crate provides async database operations for reminders, birthdays,
//! and per-user time preferences using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{quota::QuotaPolicy, reminder, reminder::NewReminder, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:minder.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a reminder due in an hour
//!     let now = 1_700_000_000;
//!     let new = NewReminder {
//!         chat_id: 100,
//!         creator_id: 7,
//!         due: now + 3_600,
//!         text: "water the plants",
//!         reply_to: None,
//!         attachment_type: None,
//!         attachment_id: None,
//!     };
//!     let id = reminder::add(db.pool(), &QuotaPolicy::default(), &new, now).await?;
//!     println!("created reminder {id}");
//!
//!     Ok(())
//! }
//! ```

pub mod birthday;
pub mod deferred;
pub mod error;
pub mod migrations;
pub mod models;
pub mod quota;
pub mod reminder;
pub mod time_preference;

pub use error::{DatabaseError, Result};
pub use models::{Birthday, DeferredDelta, Reminder, RemindStage, TimePreference};
pub use quota::QuotaPolicy;
pub use reminder::NewReminder;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Enough for concurrent command handling alongside the fire path.
    const DEFAULT_POOL_SIZE: u32 = 5;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/minder.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        migrations::run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
